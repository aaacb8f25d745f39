use byteorder::{BigEndian, ReadBytesExt};
use log::debug;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use std::io::Cursor;

use crate::error::{Error, Result};

#[allow(non_camel_case_types, clippy::upper_case_acronyms)]
#[repr(u16)]
#[derive(PartialEq, Eq, FromPrimitive, Debug, Clone, Copy)]
pub enum JPEGMarker {
    /// Any word that is not a marker this decoder knows about.
    Unrecognized = 0x0000,

    APP0 = 0xFFE0,
    APP1 = 0xFFE1,
    APP2 = 0xFFE2,
    APP3 = 0xFFE3,
    APP4 = 0xFFE4,
    APP5 = 0xFFE5,
    APP6 = 0xFFE6,
    APP7 = 0xFFE7,
    APP8 = 0xFFE8,
    APP9 = 0xFFE9,
    APP10 = 0xFFEA,
    APP11 = 0xFFEB,
    APP12 = 0xFFEC,
    APP13 = 0xFFED,
    APP14 = 0xFFEE,
    APP15 = 0xFFEF,

    SOF0 = 0xFFC0, // Baseline DCT, the only frame type decoded
    SOF1 = 0xFFC1,
    SOF2 = 0xFFC2,
    SOF3 = 0xFFC3,
    SOF5 = 0xFFC5,
    SOF6 = 0xFFC6,
    SOF7 = 0xFFC7,
    SOF9 = 0xFFC9,
    SOF10 = 0xFFCA,
    SOF11 = 0xFFCB,
    SOF13 = 0xFFCD,
    SOF14 = 0xFFCE,
    SOF15 = 0xFFCF,
    DAC = 0xFFCC,

    RST0 = 0xFFD0,
    RST1 = 0xFFD1,
    RST2 = 0xFFD2,
    RST3 = 0xFFD3,
    RST4 = 0xFFD4,
    RST5 = 0xFFD5,
    RST6 = 0xFFD6,
    RST7 = 0xFFD7,

    DNL = 0xFFDC,
    DRI = 0xFFDD,
    DHP = 0xFFDE,
    EXP = 0xFFDF,

    DHT = 0xFFC4,
    DQT = 0xFFDB,
    EOI = 0xFFD9,
    SOI = 0xFFD8,
    SOS = 0xFFDA,
    COM = 0xFFFE,
}

impl JPEGMarker {
    /// Maps a big-endian marker word to a marker. Never fails: unknown words become
    /// [`JPEGMarker::Unrecognized`].
    pub fn from_word(word: u16) -> Self {
        match Self::from_u16(word) {
            // 0x0000 is the placeholder discriminant, not a marker.
            Some(marker) if word != 0 => marker,
            _ => JPEGMarker::Unrecognized,
        }
    }

    /// True for the APPn application segments.
    pub fn is_app(self) -> bool {
        (JPEGMarker::APP0 as u16..=JPEGMarker::APP15 as u16).contains(&(self as u16))
    }
}

/// Big-endian byte reader over a JPEG stream or a slice of it.
///
/// Positions are always reported relative to the start of the whole stream, also for parsers
/// created over a segment payload by [`JPEGParser::parse_segment`].
pub struct JPEGParser<'data> {
    cursor: Cursor<&'data [u8]>,
    base: usize,
}

impl<'data> JPEGParser<'data> {
    pub fn new(data: &'data [u8]) -> Self {
        Self::with_base(data, 0)
    }

    fn with_base(data: &'data [u8], base: usize) -> Self {
        Self {
            cursor: Cursor::new(data),
            base,
        }
    }

    pub fn position(&self) -> usize {
        self.base + self.cursor.position() as usize
    }

    pub fn remaining(&self) -> usize {
        self.cursor.get_ref().len() - self.cursor.position() as usize
    }

    fn truncated(&self, expected: usize) -> Error {
        Error::Truncated {
            expected,
            available: self.remaining(),
            position: self.position(),
        }
    }

    fn ensure(&self, expected: usize) -> Result<()> {
        if self.remaining() < expected {
            return Err(self.truncated(expected));
        }
        Ok(())
    }

    pub fn read_next_word(&mut self) -> Result<u16> {
        self.ensure(2)?;
        self.cursor
            .read_u16::<BigEndian>()
            .map_err(|_| self.truncated(2))
    }

    pub fn read_next_byte(&mut self) -> Result<u8> {
        self.ensure(1)?;
        self.cursor.read_u8().map_err(|_| self.truncated(1))
    }

    /// Reads a byte and splits it into its high and low nibble.
    pub fn read_next_nibbles(&mut self) -> Result<(u8, u8)> {
        let byte = self.read_next_byte()?;
        Ok((byte >> 4, byte & 0x0F))
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'data [u8]> {
        self.ensure(count)?;
        let data: &'data [u8] = *self.cursor.get_ref();
        let start = self.cursor.position() as usize;
        self.cursor.set_position((start + count) as u64);
        Ok(&data[start..start + count])
    }

    /// Reads the next marker word. Returns the word alongside the marker so that callers can
    /// report the offending bytes of an unrecognized marker.
    pub fn read_next_marker(&mut self) -> Result<(JPEGMarker, u16)> {
        let word = self.read_next_word()?;
        Ok((JPEGMarker::from_word(word), word))
    }

    /// Reads the length field of the segment at the cursor and runs `parse` over its payload.
    ///
    /// `parse` must consume the payload exactly. Reading past it or leaving bytes behind is a
    /// [`Error::SegmentLengthMismatch`]; a payload that runs past the end of the stream is
    /// [`Error::Truncated`].
    pub fn parse_segment<T>(
        &mut self,
        segment: &'static str,
        parse: impl FnOnce(&mut JPEGParser<'data>) -> Result<T>,
    ) -> Result<T> {
        let length_position = self.position();
        let length = self.read_next_word()?;
        if length < 2 {
            return Err(Error::OutOfRange {
                field: "segment length",
                value: length as u32,
                position: length_position,
            });
        }

        let payload_position = self.position();
        let payload = self.read_bytes(length as usize - 2)?;
        debug!(
            "{} segment at {}, {} payload bytes",
            segment,
            payload_position,
            payload.len()
        );

        let mut segment_reader = JPEGParser::with_base(payload, payload_position);
        let value = parse(&mut segment_reader).map_err(|err| match err {
            Error::Truncated {
                expected, position, ..
            } => Error::SegmentLengthMismatch {
                segment,
                declared: payload.len(),
                consumed: position - payload_position + expected,
                position: payload_position,
            },
            other => other,
        })?;

        if segment_reader.remaining() != 0 {
            return Err(Error::SegmentLengthMismatch {
                segment,
                declared: payload.len(),
                consumed: payload.len() - segment_reader.remaining(),
                position: payload_position,
            });
        }
        Ok(value)
    }

    /// Skips a length-prefixed segment without looking at its contents.
    pub fn skip_segment(&mut self, segment: &'static str) -> Result<()> {
        self.parse_segment(segment, |payload| {
            payload.read_bytes(payload.remaining())?;
            Ok(())
        })
    }

    /// Collects the entropy-coded segment at the cursor, replacing stuffed `FF 00` pairs by
    /// `FF`. Stops in front of the next marker, which is left unread.
    pub fn read_entropy_coded_segment(&mut self) -> Vec<u8> {
        let data: &'data [u8] = *self.cursor.get_ref();
        let start = self.cursor.position() as usize;
        let mut huffman_data = Vec::with_capacity(data.len() - start);

        let mut i = start;
        while i < data.len() {
            if data[i] != 0xFF {
                huffman_data.push(data[i]);
                i += 1;
                continue;
            }
            match data.get(i + 1) {
                Some(0x00) => {
                    huffman_data.push(0xFF);
                    i += 2;
                }
                // Either a marker or a lone FF at the end of the stream.
                _ => break,
            }
        }

        self.cursor.set_position(i as u64);
        huffman_data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use test_log::test;

    #[rustfmt::skip]
    static TEST_HEADER: [u8; 28] = [
        0xFF, 0xD8, // Start of image
        0xFF, 0xC0, // Start of frame
        0, 17,          // Length
        8,              // Precision
        0, 128,         // Height
        0, 128,         // Width
        3,              // Component count
        0, 0, 0,
        0, 0, 0,
        0, 0, 0,        // Component data
        0xFF, 0xFE, // Commment
        0, 3,           // Length
        65,             // Content
        0xFF, 0xD8  // Start of image again
    ];

    #[test]
    fn read_words() {
        let mut reader = JPEGParser::new(&TEST_HEADER);
        assert_eq!(reader.read_next_byte().unwrap(), 0xFF);
        assert_eq!(reader.read_next_byte().unwrap(), 0xD8);

        assert_eq!(reader.read_next_word().unwrap(), 0xFFC0);
        assert_eq!(reader.position(), 4);
    }

    #[test]
    fn read_markers() {
        let mut reader = JPEGParser::new(&TEST_HEADER);
        assert_eq!(reader.read_next_marker().unwrap().0, JPEGMarker::SOI);
        assert_eq!(reader.read_next_marker().unwrap().0, JPEGMarker::SOF0);
        assert!(reader.skip_segment("SOF0").is_ok());
        assert_eq!(reader.read_next_marker().unwrap().0, JPEGMarker::COM);
        assert!(reader.skip_segment("COM").is_ok());
        assert_eq!(reader.read_next_marker().unwrap().0, JPEGMarker::SOI);
        assert!(reader.read_next_marker().is_err());
    }

    #[test]
    fn marker_mapping_is_total() {
        assert_eq!(JPEGMarker::from_word(0xFFD8), JPEGMarker::SOI);
        assert_eq!(JPEGMarker::from_word(0xFFE1), JPEGMarker::APP1);
        assert_eq!(JPEGMarker::from_word(0xFF01), JPEGMarker::Unrecognized);
        assert_eq!(JPEGMarker::from_word(0x0000), JPEGMarker::Unrecognized);
        assert_eq!(JPEGMarker::from_word(0x1234), JPEGMarker::Unrecognized);
        assert!(JPEGMarker::APP15.is_app());
        assert!(!JPEGMarker::COM.is_app());
    }

    #[test]
    fn truncated_reads_report_position() {
        let mut reader = JPEGParser::new(&[0xFF, 0xD8, 0x00]);
        reader.read_next_word().unwrap();
        let err = reader.read_next_word().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Truncated);
        assert_eq!(err.position(), Some(2));
    }

    #[test]
    fn segment_payload_must_be_consumed_exactly() {
        // Length 5 declares three payload bytes.
        let data = [0x00, 0x05, 1, 2, 3];

        let mut reader = JPEGParser::new(&data);
        let sum = reader
            .parse_segment("TEST", |payload| {
                Ok(payload.read_next_byte()? + payload.read_next_byte()? + payload.read_next_byte()?)
            })
            .unwrap();
        assert_eq!(sum, 6);
        assert_eq!(reader.remaining(), 0);

        let mut reader = JPEGParser::new(&data);
        let err = reader
            .parse_segment("TEST", |payload| payload.read_next_word())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SegmentLengthMismatch);

        let mut reader = JPEGParser::new(&data);
        let err = reader
            .parse_segment("TEST", |payload| {
                payload.read_next_word()?;
                payload.read_next_word()
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SegmentLengthMismatch);
        assert_eq!(err.position(), Some(2));
    }

    #[test]
    fn segment_longer_than_stream_is_truncated() {
        let mut reader = JPEGParser::new(&[0x00, 0x10, 1, 2]);
        let err = reader.skip_segment("APP0").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Truncated);

        let mut reader = JPEGParser::new(&[0x00, 0x01]);
        let err = reader.skip_segment("APP0").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfRange);
    }

    #[test]
    fn entropy_segment_is_destuffed_up_to_marker() {
        let data = [0x12, 0xFF, 0x00, 0x34, 0xFF, 0x00, 0xFF, 0xD9];
        let mut reader = JPEGParser::new(&data);
        assert_eq!(
            reader.read_entropy_coded_segment(),
            vec![0x12, 0xFF, 0x34, 0xFF]
        );
        assert_eq!(reader.position(), 6);
        assert_eq!(reader.read_next_marker().unwrap().0, JPEGMarker::EOI);
    }
}
