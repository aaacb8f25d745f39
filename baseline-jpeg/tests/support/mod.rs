//! Builders for small synthetic baseline streams.
#![allow(dead_code)]

/// DC table: category `c` has the 4-bit code `c`.
pub const DC_SYMBOLS: [u8; 12] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];

/// AC table: symbol at index `i` has the 4-bit code `i`. Codes 1110 and 1111 are unassigned.
pub const AC_SYMBOLS: [u8; 14] = [
    0x00, 0xF0, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x11, 0x21,
];

/// Number of magnitude bits of `value`.
pub fn category(value: i32) -> u8 {
    (32 - value.unsigned_abs().leading_zeros()) as u8
}

/// MSB-first bit writer that pads with ones and stuffs `FF` bytes on completion.
#[derive(Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    acc: u8,
    count: u8,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, value: u16, length: u8) {
        for i in (0..length).rev() {
            self.acc = (self.acc << 1) | ((value >> i) & 1) as u8;
            self.count += 1;
            if self.count == 8 {
                self.bytes.push(self.acc);
                self.acc = 0;
                self.count = 0;
            }
        }
    }

    /// Writes a string of '0' and '1', ignoring spaces.
    pub fn write_pattern(&mut self, pattern: &str) {
        for c in pattern.chars().filter(|c| !c.is_whitespace()) {
            self.write((c == '1') as u16, 1);
        }
    }

    /// Writes the magnitude bits of `value`.
    pub fn write_signed(&mut self, value: i32) {
        let category = category(value);
        if category > 0 {
            let bits = if value > 0 {
                value
            } else {
                value + (1 << category) - 1
            };
            self.write(bits as u16, category);
        }
    }

    fn write_ac_symbol(&mut self, symbol: u8) {
        let index = AC_SYMBOLS
            .iter()
            .position(|&s| s == symbol)
            .expect("symbol missing from the AC table");
        self.write(index as u16, 4);
    }

    /// Encodes one block: the DC difference, then `(run, value)` pairs, then EOB unless the last
    /// pair lands on index 63.
    pub fn write_block(&mut self, dc_diff: i32, ac: &[(u8, i32)]) {
        self.write(category(dc_diff) as u16, 4);
        self.write_signed(dc_diff);

        let mut k = 0;
        for &(run, value) in ac {
            self.write_ac_symbol(run << 4 | category(value));
            self.write_signed(value);
            k += run as usize + 1;
        }
        if k < 63 {
            self.write_ac_symbol(0x00);
        }
    }

    pub fn finish(mut self) -> Vec<u8> {
        while self.count != 0 {
            self.write(1, 1);
        }
        let mut stuffed = Vec::with_capacity(self.bytes.len());
        for byte in self.bytes {
            stuffed.push(byte);
            if byte == 0xFF {
                stuffed.push(0x00);
            }
        }
        stuffed
    }
}

pub fn segment(marker: u16, payload: &[u8]) -> Vec<u8> {
    let mut bytes = marker.to_be_bytes().to_vec();
    bytes.extend_from_slice(&(payload.len() as u16 + 2).to_be_bytes());
    bytes.extend_from_slice(payload);
    bytes
}

pub fn dqt(destination: u8, quantizer: u8) -> Vec<u8> {
    let mut payload = vec![destination];
    payload.extend_from_slice(&[quantizer; 64]);
    segment(0xFFDB, &payload)
}

pub fn dht(class_destination: u8, symbols: &[u8]) -> Vec<u8> {
    let mut payload = vec![class_destination];
    let mut counts = [0u8; 16];
    counts[3] = symbols.len() as u8;
    payload.extend_from_slice(&counts);
    payload.extend_from_slice(symbols);
    segment(0xFFC4, &payload)
}

/// Describes a three-component baseline stream with flat quantization tables.
pub struct StreamBuilder {
    pub width: u16,
    pub height: u16,
    pub sampling: [u8; 3],
    /// Flat quantizer for the luma and the chroma tables.
    pub quantizers: [u8; 2],
    /// Component identifiers in scan order. Frame identifiers are 1, 2 and 3.
    pub scan_selectors: [u8; 3],
}

impl StreamBuilder {
    pub fn new(width: u16, height: u16, sampling: [u8; 3]) -> Self {
        Self {
            width,
            height,
            sampling,
            quantizers: [8, 8],
            scan_selectors: [1, 2, 3],
        }
    }

    pub fn sof0(&self) -> Vec<u8> {
        let mut payload = vec![8];
        payload.extend_from_slice(&self.height.to_be_bytes());
        payload.extend_from_slice(&self.width.to_be_bytes());
        payload.push(3);
        for (i, &sampling) in self.sampling.iter().enumerate() {
            payload.extend_from_slice(&[i as u8 + 1, sampling, (i > 0) as u8]);
        }
        segment(0xFFC0, &payload)
    }

    pub fn sos(&self) -> Vec<u8> {
        let mut payload = vec![3];
        for selector in self.scan_selectors {
            // Luma uses tables 0, chroma tables 1.
            payload.extend_from_slice(&[selector, if selector == 1 { 0x00 } else { 0x11 }]);
        }
        payload.extend_from_slice(&[0, 63, 0]);
        segment(0xFFDA, &payload)
    }

    /// Every segment from SOI up to and including SOS.
    pub fn header(&self) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xD8];
        bytes.extend(segment(0xFFE0, b"JFIF\0\x01\x01\0\0\x01\0\x01\0\0"));
        bytes.extend(dqt(0, self.quantizers[0]));
        bytes.extend(dqt(1, self.quantizers[1]));
        bytes.extend(self.sof0());
        for destination in [0x00, 0x01] {
            bytes.extend(dht(destination, &DC_SYMBOLS));
            bytes.extend(dht(0x10 | destination, &AC_SYMBOLS));
        }
        bytes.extend(self.sos());
        bytes
    }

    /// A complete stream around an already stuffed entropy-coded segment.
    pub fn build(&self, scan: &[u8]) -> Vec<u8> {
        let mut bytes = self.header();
        bytes.extend_from_slice(scan);
        bytes.extend_from_slice(&[0xFF, 0xD9]);
        bytes
    }

    /// Number of MCUs across and down.
    pub fn mcu_dimensions(&self) -> (usize, usize) {
        let max_h = self.sampling.iter().map(|s| s >> 4).max().unwrap_or(1) as usize;
        let max_v = self.sampling.iter().map(|s| s & 0x0F).max().unwrap_or(1) as usize;
        (
            (self.width as usize).div_ceil(8 * max_h),
            (self.height as usize).div_ceil(8 * max_v),
        )
    }

    /// A scan where every block of every component is DC-only with no change in DC.
    pub fn flat_scan(&self) -> Vec<u8> {
        let (mcus_wide, mcus_high) = self.mcu_dimensions();
        let blocks_per_mcu: usize = self
            .sampling
            .iter()
            .map(|s| ((s >> 4) * (s & 0x0F)) as usize)
            .sum();
        let mut writer = BitWriter::new();
        for _ in 0..mcus_wide * mcus_high * blocks_per_mcu {
            writer.write_block(0, &[]);
        }
        writer.finish()
    }
}
