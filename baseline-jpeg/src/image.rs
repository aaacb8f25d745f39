use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use crate::error::Result;

/// Stores a single frame of image data in a simple bitmap form
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Bitmap {
    /// The number of color channels in the image. Ex. RGB = 3
    pub channels: u8,

    /// The size of the image as `(width, height)`
    pub size: (u16, u16),
    /// Interleaved samples, row-major from the top-left corner
    pub data: Vec<u8>,
}

impl Bitmap {
    /// Returns the first three channels of the pixel at `(x, y)`, or `None` outside the image.
    pub fn pixel(&self, x: u16, y: u16) -> Option<[u8; 3]> {
        if x >= self.size.0 || y >= self.size.1 || self.channels < 3 {
            return None;
        }
        let index = (y as usize * self.size.0 as usize + x as usize) * self.channels as usize;
        let mut pixel = [0u8; 3];
        pixel.copy_from_slice(self.data.get(index..index + 3)?);
        Some(pixel)
    }
}

/// Used to decode an image. This trait can be implemented for any image format to decode.
pub trait ImageDecoder<'data> {
    /// Supplies the decoder with the image data
    fn new(image_data: &'data [u8]) -> Self;
    /// Decodes the image
    fn decode(&self) -> Result<Bitmap>;
}

/// Used to encode an image. This trait can be implemented for any image format to encode.
pub trait ImageEncoder<'bitmap> {
    /// Supplies the encoder with a raw bitmap to encode.
    fn new(bitmap: &'bitmap Bitmap) -> Self;
    /// Encodes the bitmap into `writer`.
    fn encode<W: Write>(&self, writer: W) -> Result<()>;

    /// Encodes the bitmap and saves the result to a file at the given path.
    fn encode_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.encode(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
