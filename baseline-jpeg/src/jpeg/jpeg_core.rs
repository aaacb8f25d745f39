use log::trace;

use crate::{
    error::{Error, Result},
    image::Bitmap,
    jpeg::{
        header::HeaderInfo,
        jpeg_reader::{JPEGMarker, JPEGParser},
        mcu,
    },
};

/// Drives one decode: headers, then the scan, then the end of image.
pub struct JPEGDecoder<'data> {
    reader: JPEGParser<'data>,
}

impl<'data> JPEGDecoder<'data> {
    pub fn new(data: &'data [u8]) -> Self {
        Self {
            reader: JPEGParser::new(data),
        }
    }

    pub fn parse(&mut self) -> Result<HeaderInfo> {
        HeaderInfo::read_header_info(&mut self.reader)
    }

    /// Decodes the scan that follows `header`. The scan must be followed by EOI; anything after
    /// the EOI marker is ignored.
    pub fn read_scan(&mut self, header: &HeaderInfo) -> Result<Bitmap> {
        let huffman_data = self.reader.read_entropy_coded_segment();
        trace!(
            "Entropy-coded segment of {} bytes after destuffing",
            huffman_data.len()
        );
        self.read_end_of_image()?;

        mcu::decode_scan(&huffman_data, header)
    }

    fn read_end_of_image(&mut self) -> Result<()> {
        let position = self.reader.position();
        match self.reader.read_next_marker()? {
            (JPEGMarker::EOI, _) => Ok(()),
            (_, marker) => Err(Error::UnexpectedMarker {
                marker,
                reason: "expected EOI after the scan",
                position,
            }),
        }
    }
}
