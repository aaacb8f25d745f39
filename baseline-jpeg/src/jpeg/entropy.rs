use crate::{
    bitstream::Bitstream,
    error::{Error, Result},
    jpeg::huffman::HuffmanTable,
};

/// Quantized DCT coefficients of one block, in zig-zag order.
pub type Coefficients = [i32; 64];

/// Decodes one block of baseline Huffman-coded coefficients.
///
/// `dc_predictor` is the previous DC value of the same component within the scan and is updated
/// to this block's DC value.
pub fn decode_block(
    bitstream: &mut Bitstream,
    dc_table: &HuffmanTable,
    ac_table: &HuffmanTable,
    dc_predictor: &mut i32,
) -> Result<Coefficients> {
    let mut coefficients = [0i32; 64];

    // Calculate DC coefficient
    // https://www.w3.org/Graphics/JPEG/itu-t81.pdf
    // F.2.2.1 Page 104
    let category = dc_table.decode_symbol(bitstream)?;
    if category > 11 {
        return Err(Error::MalformedBlock {
            reason: "DC magnitude category above 11",
            bit_position: bitstream.bit_position(),
        });
    }
    let diff = bitstream.read_signed_category(category);
    *dc_predictor = dc_predictor
        .checked_add(diff)
        .ok_or_else(|| Error::MalformedBlock {
            reason: "DC predictor overflow",
            bit_position: bitstream.bit_position(),
        })?;
    coefficients[0] = *dc_predictor;

    // Calculate AC coefficients
    // F.2.2.2 Page 105
    let mut k = 1;
    while k < 64 {
        let run_size = ac_table.decode_symbol(bitstream)?;
        if run_size == 0x00 {
            // End of block, the rest stays zero.
            break;
        }

        // 0xF0 (ZRL) is 15 zeros followed by a coded zero, no special case needed.
        let run_length = (run_size >> 4) as usize;
        let size = run_size & 0x0F;

        k += run_length;
        if k > 63 {
            return Err(Error::MalformedBlock {
                reason: "run of zero coefficients overruns the block",
                bit_position: bitstream.bit_position(),
            });
        }

        coefficients[k] = bitstream.read_signed_category(size);
        k += 1;
    }

    Ok(coefficients)
}

/// Entropy decoding state of one scan component for the duration of one scan.
pub struct ComponentDecoder<'table> {
    dc_table: &'table HuffmanTable,
    ac_table: &'table HuffmanTable,
    dc_predictor: i32,
}

impl<'table> ComponentDecoder<'table> {
    pub fn new(dc_table: &'table HuffmanTable, ac_table: &'table HuffmanTable) -> Self {
        Self {
            dc_table,
            ac_table,
            dc_predictor: 0,
        }
    }

    pub fn decode_block(&mut self, bitstream: &mut Bitstream) -> Result<Coefficients> {
        decode_block(
            bitstream,
            self.dc_table,
            self.ac_table,
            &mut self.dc_predictor,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ErrorKind, jpeg::huffman::HuffmanTableClass};
    use test_log::test;

    // Every symbol gets a 4-bit code equal to its index.
    fn four_bit_table(class: HuffmanTableClass, symbols: &[u8]) -> HuffmanTable {
        let mut counts = [0u8; 16];
        counts[3] = symbols.len() as u8;
        HuffmanTable::new(class, 0, counts, symbols.to_vec(), 0).unwrap()
    }

    fn dc_table() -> HuffmanTable {
        four_bit_table(HuffmanTableClass::Dc, &(0..12).collect::<Vec<_>>())
    }

    // Codes: 0000 EOB, 0001 ZRL, 0010 (0,1), 0011 (0,2), 0100 (1,1), 0101 (15,1), 0110 (14,2)
    fn ac_table() -> HuffmanTable {
        four_bit_table(
            HuffmanTableClass::Ac,
            &[0x00, 0xF0, 0x01, 0x02, 0x11, 0xF1, 0xE2],
        )
    }

    /// Packs a string of '0'/'1' (spaces ignored), padding with ones.
    fn bits(pattern: &str) -> Vec<u8> {
        let mut bytes = vec![];
        let mut acc = 0u8;
        let mut count = 0;
        for c in pattern.chars().filter(|c| !c.is_whitespace()) {
            acc = (acc << 1) | (c == '1') as u8;
            count += 1;
            if count == 8 {
                bytes.push(acc);
                acc = 0;
                count = 0;
            }
        }
        if count > 0 {
            bytes.push((acc << (8 - count)) | ((1u8 << (8 - count)) - 1));
        }
        bytes
    }

    #[test]
    fn end_of_block_zeroes_all_ac() {
        let (dc, ac) = (dc_table(), ac_table());
        // DC category 3, bits 110 (= 6), then EOB.
        let data = bits("0011 110 0000");
        let mut bitstream = Bitstream::new(&data);
        let mut predictor = 0;
        let block = decode_block(&mut bitstream, &dc, &ac, &mut predictor).unwrap();
        assert_eq!(block[0], 6);
        assert!(block[1..].iter().all(|&c| c == 0));
        assert_eq!(predictor, 6);
        assert_eq!(bitstream.bit_position(), 11);
    }

    #[test]
    fn dc_prediction_carries_across_blocks() {
        let (dc, ac) = (dc_table(), ac_table());
        // +6, -2 (category 2, bits 01), +0 (category 0), each followed by EOB.
        let data = bits("0011 110 0000  0010 01 0000  0000 0000");
        let mut bitstream = Bitstream::new(&data);
        let mut decoder = ComponentDecoder::new(&dc, &ac);
        let dcs: Vec<i32> = (0..3)
            .map(|_| decoder.decode_block(&mut bitstream).unwrap()[0])
            .collect();
        assert_eq!(dcs, vec![6, 4, 4]);
    }

    #[test]
    fn runs_and_zero_run_length() {
        let (dc, ac) = (dc_table(), ac_table());
        // DC 0; (0,1) -1 at k=1; (1,1) +1 at k=3; ZRL -> k=20; (0,2) -3 at k=20; EOB
        let data = bits("0000  0010 0  0100 1  0001  0011 00  0000");
        let mut bitstream = Bitstream::new(&data);
        let mut predictor = 0;
        let block = decode_block(&mut bitstream, &dc, &ac, &mut predictor).unwrap();

        let mut expected = [0i32; 64];
        expected[1] = -1;
        expected[3] = 1;
        expected[20] = -3;
        assert_eq!(block, expected);
    }

    #[test]
    fn ac_coefficients_fill_the_last_index() {
        let (dc, ac) = (dc_table(), ac_table());
        // Three runs of 15 zeros reach k=49, a run of 14 puts the last value at k=63 and no EOB
        // follows.
        let data = bits("0000  0101 1  0101 1  0101 1  0110 11");
        let mut bitstream = Bitstream::new(&data);
        let mut predictor = 0;
        let block = decode_block(&mut bitstream, &dc, &ac, &mut predictor).unwrap();
        for k in [16, 32, 48] {
            assert_eq!(block[k], 1, "k = {k}");
        }
        assert_eq!(block[63], 3);
        assert_eq!(block.iter().filter(|&&c| c != 0).count(), 4);
        assert_eq!(bitstream.bit_position(), 4 + 3 * 5 + 6);
    }

    #[test]
    fn overrunning_runs_are_malformed() {
        let (dc, ac) = (dc_table(), ac_table());
        // Three runs of 15 zeros reach k=49, a fourth one lands past index 63.
        let data = bits("0000  0101 1  0101 1  0101 1  0101 1");
        let mut bitstream = Bitstream::new(&data);
        let mut predictor = 0;
        let err = decode_block(&mut bitstream, &dc, &ac, &mut predictor).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedBlock);
    }

    #[test]
    fn dc_category_above_eleven_is_malformed() {
        let dc = four_bit_table(HuffmanTableClass::Dc, &[12]);
        let ac = ac_table();
        let data = bits("0000");
        let mut bitstream = Bitstream::new(&data);
        let err = decode_block(&mut bitstream, &dc, &ac, &mut 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedBlock);
    }
}
