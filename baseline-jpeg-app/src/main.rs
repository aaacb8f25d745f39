use std::{fs, path::PathBuf};

use baseline_jpeg::{image::ImageEncoder, jpeg, ppm::PPMEncoder};
use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use log::info;

/// Decodes a baseline JPEG and writes it out as a binary PPM.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// The JPEG file to decode
    input: PathBuf,
    /// Where to write the PPM result
    #[arg(default_value = "output.ppm")]
    output: PathBuf,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    env_logger::init();

    let args = Args::parse();

    let buffer = fs::read(&args.input)
        .wrap_err_with(|| format!("failed to read {}", args.input.display()))?;
    let bitmap = jpeg::decode(&buffer)
        .wrap_err_with(|| format!("failed to decode {}", args.input.display()))?;
    info!(
        "Decoded {}x{} image from {}",
        bitmap.size.0,
        bitmap.size.1,
        args.input.display()
    );

    PPMEncoder::new(&bitmap)
        .encode_to_file(&args.output)
        .wrap_err_with(|| format!("failed to write {}", args.output.display()))?;
    info!("Wrote {}", args.output.display());
    Ok(())
}
