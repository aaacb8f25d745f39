/// Bitstream reader over destuffed entropy-coded data. Bits are read most significant first.
///
/// Reading past the end yields zero bits instead of failing; callers that need to know
/// whether real data is left check [`Bitstream::is_exhausted`].
#[derive(Debug)]
pub struct Bitstream<'data> {
    data: &'data [u8],
    byte_cursor: usize,
    bit_cursor: u8,
}

impl<'data> Bitstream<'data> {
    /// Creates a new bitstream.
    pub fn new(data: &'data [u8]) -> Self {
        Self {
            data,
            byte_cursor: 0,
            bit_cursor: 0,
        }
    }

    /// Returns the current cursor position in the bitstream in terms of its "bit index"
    pub fn bit_position(&self) -> usize {
        self.byte_cursor * 8 + self.bit_cursor as usize
    }

    /// True once every bit of the underlying buffer has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.byte_cursor >= self.data.len()
    }

    /// Reads a single bit. Returns 0 past the end of the buffer.
    pub fn read_bit(&mut self) -> u8 {
        let Some(&current_byte) = self.data.get(self.byte_cursor) else {
            return 0;
        };
        let bit = 1u8 & (current_byte >> (7 - self.bit_cursor));

        self.bit_cursor += 1;
        if self.bit_cursor == 8 {
            self.byte_cursor += 1;
            self.bit_cursor = 0;
        }
        bit
    }

    /// Reads up to 16 bits and returns them as an unsigned value (RECEIVE in T.81 F.2.2.4).
    pub fn read_bits(&mut self, bits: u8) -> u16 {
        debug_assert!(bits <= 16);
        let mut value: u16 = 0;
        for _ in 0..bits {
            value = (value << 1) | self.read_bit() as u16;
        }
        value
    }

    /// Reads a `category`-bit magnitude and sign extends it (RECEIVE + EXTEND in
    /// T.81 F.2.2.1). If the MSB is 0 the value is negative, if it is 1 it is positive.
    pub fn read_signed_category(&mut self, category: u8) -> i32 {
        if category == 0 {
            return 0;
        }
        let raw = self.read_bits(category) as i32;
        if raw < (1 << (category - 1)) {
            raw - ((1 << category) - 1)
        } else {
            raw
        }
    }
}
