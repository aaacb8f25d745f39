use log::trace;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::{
    bitstream::Bitstream,
    error::{Error, Result},
    image::Bitmap,
    jpeg::{
        entropy::{Coefficients, ComponentDecoder},
        header::HeaderInfo,
        transform::transform_block,
    },
};

/// Runs `f` on each `chunk_len`-sized chunk of `data` with the chunk's index, on the rayon pool
/// when the `parallel` feature is enabled.
fn for_each_chunk<T, F>(data: &mut [T], chunk_len: usize, f: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Send + Sync,
{
    #[cfg(feature = "parallel")]
    data.par_chunks_mut(chunk_len)
        .enumerate()
        .for_each(|(i, chunk)| f(i, chunk));
    #[cfg(not(feature = "parallel"))]
    data.chunks_mut(chunk_len)
        .enumerate()
        .for_each(|(i, chunk)| f(i, chunk));
}

/// Fewest entropy-coded bits a block can take: a DC code and an AC code.
const MIN_BLOCK_BITS: usize = 2;

/// Row-major samples of one component.
#[derive(Debug, Clone)]
pub struct Plane {
    pub width: usize,
    pub height: usize,
    pub data: Vec<i16>,
}

/// Entropy-decoded blocks of one component, laid out as its block grid.
struct CoefficientGrid {
    blocks_wide: usize,
    blocks_high: usize,
    blocks: Vec<Coefficients>,
}

/// Nearest-neighbour upsampling: output `(i, j)` is input `(i / kv, j / kh)`.
pub fn upsample<T: Copy + Send + Sync>(
    samples: &[T],
    width: usize,
    height: usize,
    kv: usize,
    kh: usize,
) -> Vec<T> {
    debug_assert_eq!(samples.len(), width * height);
    if kv == 1 && kh == 1 {
        return samples.to_vec();
    }

    let out_width = width * kh;
    let Some(&first) = samples.first() else {
        return vec![];
    };
    let mut output = vec![first; out_width * height * kv];
    for_each_chunk(&mut output, out_width, |i, row| {
        let source = &samples[(i / kv) * width..(i / kv + 1) * width];
        for (j, value) in row.iter_mut().enumerate() {
            *value = source[j / kh];
        }
    });
    output
}

/// YCbCr to RGB as in JFIF, rounded and clamped.
pub fn ycbcr_to_rgb(y: i16, cb: i16, cr: i16) -> [u8; 3] {
    let lum = y as f64;
    let cb = cb as f64 - 128.0;
    let cr = cr as f64 - 128.0;

    let red = lum + 1.402 * cr;
    let green = lum - 0.344136 * cb - 0.714136 * cr;
    let blue = lum + 1.772 * cb;

    [red, green, blue].map(|channel| channel.round().clamp(0.0, 255.0) as u8)
}

/// First pass: entropy-decodes every block of the scan in MCU order. Sequential, since each
/// block's DC value depends on the previous block of the same component.
fn decode_coefficients(huffman_data: &[u8], header: &HeaderInfo) -> Result<Vec<CoefficientGrid>> {
    let frame = &header.frame_info;
    let (mcus_wide, mcus_high) = (
        header.mcu_info.mcu_dimensions.0 as usize,
        header.mcu_info.mcu_dimensions.1 as usize,
    );

    // Every block takes at least one DC and one AC code bit, so a frame can't hold more blocks
    // than that. Checked before the grids are sized from the header.
    let blocks_per_mcu: usize = frame
        .components
        .iter()
        .map(|component| {
            component.xy_sampling_factor.0 as usize * component.xy_sampling_factor.1 as usize
        })
        .sum();
    let block_count = mcus_wide * mcus_high * blocks_per_mcu;
    if block_count.saturating_mul(MIN_BLOCK_BITS) > huffman_data.len().saturating_mul(8) {
        return Err(Error::MalformedBlock {
            reason: "entropy-coded segment too short for the frame size",
            bit_position: huffman_data.len() * 8,
        });
    }

    let mut grids: Vec<CoefficientGrid> = frame
        .components
        .iter()
        .map(|component| {
            let blocks_wide = mcus_wide * component.xy_sampling_factor.0 as usize;
            let blocks_high = mcus_high * component.xy_sampling_factor.1 as usize;
            CoefficientGrid {
                blocks_wide,
                blocks_high,
                blocks: vec![[0; 64]; blocks_wide * blocks_high],
            }
        })
        .collect();

    let mut decoders = header
        .scan_info
        .components
        .iter()
        .map(|component| {
            let (dc_table, ac_table) = header.huffman_tables(component)?;
            Ok(ComponentDecoder::new(dc_table, ac_table))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut bitstream = Bitstream::new(huffman_data);
    for mcu_y in 0..mcus_high {
        for mcu_x in 0..mcus_wide {
            for (component, decoder) in header.scan_info.components.iter().zip(&mut decoders) {
                let (h, v) = frame.components[component.frame_index].xy_sampling_factor;
                let grid = &mut grids[component.frame_index];
                for block_row in 0..v as usize {
                    for block_col in 0..h as usize {
                        let by = mcu_y * v as usize + block_row;
                        let bx = mcu_x * h as usize + block_col;
                        grid.blocks[by * grid.blocks_wide + bx] =
                            decoder.decode_block(&mut bitstream)?;
                    }
                }
            }
        }
    }

    trace!(
        "Decoded {} MCUs from {} of {} entropy-coded bits",
        mcus_wide * mcus_high,
        bitstream.bit_position(),
        huffman_data.len() * 8
    );
    Ok(grids)
}

/// Second pass, per component: dequantize and inverse transform every block into a plane at the
/// component's own resolution.
fn reconstruct_plane(
    grid: &CoefficientGrid,
    header: &HeaderInfo,
    frame_index: usize,
) -> Result<Plane> {
    let qtable = header.quant_table(frame_index)?;

    let width = grid.blocks_wide * 8;
    let height = grid.blocks_high * 8;
    let mut data = vec![0i16; width * height];

    // One chunk per row of blocks.
    for_each_chunk(&mut data, width * 8, |block_y, rows| {
        for block_x in 0..grid.blocks_wide {
            let block = &grid.blocks[block_y * grid.blocks_wide + block_x];
            let samples = transform_block(block, qtable);
            for y in 0..8 {
                let start = y * width + block_x * 8;
                rows[start..start + 8].copy_from_slice(&samples[y * 8..y * 8 + 8]);
            }
        }
    });

    Ok(Plane {
        width,
        height,
        data,
    })
}

/// Decodes the entropy-coded segment of a baseline scan into an RGB bitmap of the declared size.
pub fn decode_scan(huffman_data: &[u8], header: &HeaderInfo) -> Result<Bitmap> {
    let mcu_info = &header.mcu_info;
    trace!(
        "MCU {}x{} pixels, {}x{} MCUs",
        mcu_info.mcu_size.0,
        mcu_info.mcu_size.1,
        mcu_info.mcu_dimensions.0,
        mcu_info.mcu_dimensions.1
    );

    let grids = decode_coefficients(huffman_data, header)?;

    let (max_h, max_v) = (
        mcu_info.max_xy_sampling_factor.0 as usize,
        mcu_info.max_xy_sampling_factor.1 as usize,
    );
    let planes = grids
        .iter()
        .enumerate()
        .map(|(frame_index, grid)| {
            let plane = reconstruct_plane(grid, header, frame_index)?;
            let (h, v) = header.frame_info.components[frame_index].xy_sampling_factor;
            let (kh, kv) = (max_h / h as usize, max_v / v as usize);
            Ok(Plane {
                width: plane.width * kh,
                height: plane.height * kv,
                data: upsample(&plane.data, plane.width, plane.height, kv, kh),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(compose_rgb(&planes, header.frame_info.image_size))
}

/// Crops the full-resolution luma, blue and red chroma planes to `size` and converts them to
/// interleaved RGB.
fn compose_rgb(planes: &[Plane], size: (u16, u16)) -> Bitmap {
    let channels = 3u8;
    let (width, height) = (size.0 as usize, size.1 as usize);
    let mut data = vec![0u8; width * height * channels as usize];

    let (luma, cb, cr) = (&planes[0], &planes[1], &planes[2]);
    for_each_chunk(&mut data, width * channels as usize, |y, row| {
        for (x, pixel) in row.chunks_exact_mut(channels as usize).enumerate() {
            let rgb = ycbcr_to_rgb(
                luma.data[y * luma.width + x],
                cb.data[y * cb.width + x],
                cr.data[y * cr.width + x],
            );
            pixel.copy_from_slice(&rgb);
        }
    });

    Bitmap {
        channels,
        size,
        data,
    }
}
