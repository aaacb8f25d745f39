use std::io::Write;

use crate::{
    error::{Error, Result},
    image::{Bitmap, ImageEncoder},
};

/// Binary (P6) PPM encoder for 3-channel bitmaps
pub struct PPMEncoder<'bitmap> {
    bitmap: &'bitmap Bitmap,
}

impl<'bitmap> ImageEncoder<'bitmap> for PPMEncoder<'bitmap> {
    fn new(bitmap: &'bitmap Bitmap) -> Self {
        Self { bitmap }
    }

    fn encode<W: Write>(&self, mut writer: W) -> Result<()> {
        let bitmap = self.bitmap;
        if bitmap.channels != 3 {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("PPM needs 3 channels, bitmap has {}", bitmap.channels),
            )));
        }

        write!(writer, "P6\n{} {}\n255\n", bitmap.size.0, bitmap.size.1)?;
        writer.write_all(&bitmap.data)?;
        Ok(())
    }
}
