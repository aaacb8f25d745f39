#![warn(missing_docs)]

//! A baseline JPEG decoder producing RGB bitmaps, with a PPM encoder for writing them out.
mod bitstream;
/// Error type shared by the decoder and the encoder
pub mod error;
/// Defines types for decoding and encoding images
pub mod image;
/// Decoder for baseline JPEG images
pub mod jpeg;
/// Encoder for PPM images
pub mod ppm;
