mod entropy;
mod header;
mod huffman;
mod jpeg_core;
mod jpeg_reader;
mod mcu;
mod transform;

pub use header::{
    FrameComponent, FrameInfo, HeaderInfo, MCUInfo, QuantizationTable, ScanComponent, ScanInfo,
};
pub use huffman::{HuffmanTable, HuffmanTableClass};
pub use transform::{fdct_2d, idct_2d};

use crate::{
    error::Result,
    image::{Bitmap, ImageDecoder},
};

/// Contains JPEG image data
pub struct JPEGDecoder<'data> {
    image_data: &'data [u8],
}

impl<'data> JPEGDecoder<'data> {
    /// Parses the markers up to and including the scan header without decoding the scan.
    pub fn read_header(&self) -> Result<HeaderInfo> {
        jpeg_core::JPEGDecoder::new(self.image_data).parse()
    }
}

impl<'data> ImageDecoder<'data> for JPEGDecoder<'data> {
    /// Initializes the JPEG decoder from a byte slice
    fn new(image_data: &'data [u8]) -> Self {
        Self { image_data }
    }

    fn decode(&self) -> Result<Bitmap> {
        let mut decoder = jpeg_core::JPEGDecoder::new(self.image_data);
        let header = decoder.parse()?;
        decoder.read_scan(&header)
    }
}

/// Decodes a complete baseline JPEG stream into a 3-channel RGB bitmap of the declared size.
pub fn decode(image_data: &[u8]) -> Result<Bitmap> {
    JPEGDecoder::new(image_data).decode()
}

/// Reads the frame and scan headers and the tables they reference.
pub fn read_header(image_data: &[u8]) -> Result<HeaderInfo> {
    JPEGDecoder::new(image_data).read_header()
}
