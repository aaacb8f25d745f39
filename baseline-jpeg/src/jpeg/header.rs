use std::{cmp::max, collections::HashMap};

use log::debug;

use crate::{
    error::{Error, Result},
    jpeg::{
        huffman::{HuffmanTable, HuffmanTableClass},
        jpeg_reader::*,
    },
};

/// A quantization table, kept in the zig-zag order it is transmitted in.
#[derive(Debug, Clone)]
pub struct QuantizationTable {
    /// `Tq`, 0 to 3.
    pub destination_id: u8,
    /// The 64 quantizer values in zig-zag order.
    pub table: [u8; 64],
}

/// Per-component parameters from the frame header.
#[derive(Debug, Default, Clone)]
pub struct FrameComponent {
    /// Component identifier `C`.
    pub identifier: u8,
    /// Horizontal and vertical sampling factors `(H, V)`.
    pub xy_sampling_factor: (u8, u8),
    /// Quantization table destination `Tq`.
    pub qtable_id: u8,
}

/// One entry of the scan header.
#[derive(Debug, Default, Clone)]
pub struct ScanComponent {
    /// Component selector `Cs`.
    pub selector: u8,
    /// Index of the selected component in [`FrameInfo::components`].
    pub frame_index: usize,
    /// DC Huffman table destination `Td`.
    pub dc_table: u8,
    /// AC Huffman table destination `Ta`.
    pub ac_table: u8,
}

/// Contents of the scan header.
#[derive(Debug, Default)]
pub struct ScanInfo {
    /// Scan components in bitstream order.
    pub components: Vec<ScanComponent>,
    /// `(Ss, Se)`, always `(0, 63)` for baseline.
    pub spectral_selection: (u8, u8),
    /// `(Ah, Al)`, always `(0, 0)` for baseline.
    pub successive_approximation: (u8, u8),
}

/// Contents of the baseline frame header.
#[derive(Debug, Default)]
pub struct FrameInfo {
    /// Sample precision `P`, always 8.
    pub precision: u8,
    /// `(X, Y)` as declared.
    pub image_size: (u16, u16),
    /// Image size rounded up to whole MCUs.
    pub padded_size: (u32, u32),
    /// Frame components in bitstream order: luma, blue chroma, red chroma.
    pub components: Vec<FrameComponent>,
}

/// Geometry of the minimum coded units of a frame.
#[derive(Debug, Default)]
pub struct MCUInfo {
    /// `(Hmax, Vmax)`.
    pub max_xy_sampling_factor: (u8, u8),
    /// MCU width and height in pixels.
    pub mcu_size: (u16, u16),
    /// Number of MCUs across and down the padded frame.
    pub mcu_dimensions: (u16, u16),
}

/// Everything read before the entropy-coded segment: frame and scan headers and the tables
/// they reference.
#[derive(Debug, Default)]
pub struct HeaderInfo {
    /// The frame header.
    pub frame_info: FrameInfo,
    /// The scan header.
    pub scan_info: ScanInfo,
    /// AC Huffman tables by destination.
    pub ac_huff_tables: HashMap<u8, HuffmanTable>,
    /// DC Huffman tables by destination.
    pub dc_huff_tables: HashMap<u8, HuffmanTable>,
    /// Quantization tables by destination.
    pub quant_tables: HashMap<u8, QuantizationTable>,
    /// Offset of the first entropy-coded byte.
    pub header_length: usize,
    /// MCU geometry derived from the frame header.
    pub mcu_info: MCUInfo,
}

fn out_of_range(field: &'static str, value: impl Into<u32>, position: usize) -> Error {
    Error::OutOfRange {
        field,
        value: value.into(),
        position,
    }
}

fn unexpected(marker: u16, reason: &'static str, position: usize) -> Error {
    Error::UnexpectedMarker {
        marker,
        reason,
        position,
    }
}

impl HeaderInfo {
    fn read_start_of_frame(reader: &mut JPEGParser) -> Result<FrameInfo> {
        reader.parse_segment("SOF0", |segment| {
            let position = segment.position();
            let precision = segment.read_next_byte()?;
            if precision != 8 {
                return Err(out_of_range("sample precision", precision, position));
            }

            let position = segment.position();
            let height = segment.read_next_word()?;
            if height == 0 {
                return Err(out_of_range("image height", height, position));
            }
            let position = segment.position();
            let width = segment.read_next_word()?;
            if width == 0 {
                return Err(out_of_range("image width", width, position));
            }

            let position = segment.position();
            let component_count = segment.read_next_byte()?;
            if component_count != 3 {
                return Err(out_of_range("frame component count", component_count, position));
            }

            let mut components: Vec<FrameComponent> = Vec::with_capacity(3);
            for _ in 0..component_count {
                let position = segment.position();
                let identifier = segment.read_next_byte()?;
                if components.iter().any(|c| c.identifier == identifier) {
                    return Err(out_of_range(
                        "frame component identifier (duplicate)",
                        identifier,
                        position,
                    ));
                }

                let position = segment.position();
                let xy_sampling_factor = segment.read_next_nibbles()?;
                for factor in [xy_sampling_factor.0, xy_sampling_factor.1] {
                    if !matches!(factor, 1 | 2 | 4) {
                        return Err(out_of_range("sampling factor", factor, position));
                    }
                }

                let position = segment.position();
                let qtable_id = segment.read_next_byte()?;
                if qtable_id > 3 {
                    return Err(out_of_range("quantization table destination", qtable_id, position));
                }

                components.push(FrameComponent {
                    identifier,
                    xy_sampling_factor,
                    qtable_id,
                })
            }

            debug!(
                "Frame {}x{}, components {:?}",
                width, height, components
            );

            Ok(FrameInfo {
                precision,
                image_size: (width, height),
                padded_size: (0, 0), // Filled in once the MCU size is known
                components,
            })
        })
    }

    fn read_quantization_tables(reader: &mut JPEGParser) -> Result<Vec<QuantizationTable>> {
        reader.parse_segment("DQT", |segment| {
            let mut quant_tables = vec![];

            while segment.remaining() != 0 {
                let position = segment.position();
                let (precision, destination_id) = segment.read_next_nibbles()?;
                if precision != 0 {
                    return Err(out_of_range("quantization table precision", precision, position));
                }
                if destination_id > 3 {
                    return Err(out_of_range(
                        "quantization table destination",
                        destination_id,
                        position,
                    ));
                }

                let mut table = [0u8; 64];
                table.copy_from_slice(segment.read_bytes(64)?);
                debug!("Quantization table {}", destination_id);

                quant_tables.push(QuantizationTable {
                    destination_id,
                    table,
                });
            }

            Ok(quant_tables)
        })
    }

    fn read_huffman_tables(reader: &mut JPEGParser) -> Result<Vec<HuffmanTable>> {
        reader.parse_segment("DHT", |segment| {
            let mut tables = vec![];

            while segment.remaining() != 0 {
                let position = segment.position();
                let (table_class, destination_id) = segment.read_next_nibbles()?;
                let class = match table_class {
                    0 => HuffmanTableClass::Dc,
                    1 => HuffmanTableClass::Ac,
                    _ => return Err(out_of_range("Huffman table class", table_class, position)),
                };
                if destination_id > 1 {
                    return Err(out_of_range(
                        "Huffman table destination",
                        destination_id,
                        position,
                    ));
                }

                let mut bitcode_counts = [0u8; 16];
                bitcode_counts.copy_from_slice(segment.read_bytes(16)?);

                let size: usize = bitcode_counts
                    .iter()
                    .fold(0, |total, elem| total + *elem as usize);
                if size > 256 {
                    return Err(out_of_range("Huffman symbol count", size as u32, position));
                }

                let symbols = segment.read_bytes(size)?.to_vec();
                debug!(
                    "Huffman table {:?} {} with {} symbols",
                    class, destination_id, size
                );

                tables.push(HuffmanTable::new(
                    class,
                    destination_id,
                    bitcode_counts,
                    symbols,
                    position,
                )?);
            }

            Ok(tables)
        })
    }

    /// Reads the scan header. Every selector must name a distinct component of `frame`.
    fn read_start_of_scan(reader: &mut JPEGParser, frame: &FrameInfo) -> Result<ScanInfo> {
        reader.parse_segment("SOS", |segment| {
            let position = segment.position();
            let component_count = segment.read_next_byte()?;
            if component_count as usize != frame.components.len() {
                return Err(out_of_range("scan component count", component_count, position));
            }

            let mut components: Vec<ScanComponent> = Vec::with_capacity(component_count as usize);
            for _ in 0..component_count {
                let position = segment.position();
                let selector = segment.read_next_byte()?;
                let frame_index = frame
                    .components
                    .iter()
                    .position(|c| c.identifier == selector)
                    .ok_or_else(|| out_of_range("scan component selector", selector, position))?;
                if components.iter().any(|c| c.selector == selector) {
                    return Err(out_of_range(
                        "scan component selector (duplicate)",
                        selector,
                        position,
                    ));
                }

                let position = segment.position();
                let (dc_table, ac_table) = segment.read_next_nibbles()?;
                if dc_table > 1 {
                    return Err(out_of_range("DC table destination", dc_table, position));
                }
                if ac_table > 1 {
                    return Err(out_of_range("AC table destination", ac_table, position));
                }

                components.push(ScanComponent {
                    selector,
                    frame_index,
                    dc_table,
                    ac_table,
                });
            }

            let position = segment.position();
            let spectral_selection_start = segment.read_next_byte()?;
            if spectral_selection_start != 0 {
                return Err(out_of_range(
                    "spectral selection start",
                    spectral_selection_start,
                    position,
                ));
            }
            let position = segment.position();
            let spectral_selection_end = segment.read_next_byte()?;
            if spectral_selection_end != 63 {
                return Err(out_of_range(
                    "spectral selection end",
                    spectral_selection_end,
                    position,
                ));
            }

            let position = segment.position();
            let successive_approximation = segment.read_next_nibbles()?;
            if successive_approximation != (0, 0) {
                return Err(out_of_range(
                    "successive approximation",
                    (successive_approximation.0 << 4) | successive_approximation.1,
                    position,
                ));
            }

            Ok(ScanInfo {
                components,
                spectral_selection: (spectral_selection_start, spectral_selection_end),
                successive_approximation,
            })
        })
    }

    /// Returns the quantization table of the frame component at `frame_index`.
    pub fn quant_table(&self, frame_index: usize) -> Result<&QuantizationTable> {
        let qtable_id = self.frame_info.components[frame_index].qtable_id;
        self.quant_tables.get(&qtable_id).ok_or_else(|| {
            out_of_range(
                "quantization table destination (undefined)",
                qtable_id,
                self.header_length,
            )
        })
    }

    /// Returns the DC and AC Huffman tables of a scan component.
    pub fn huffman_tables(
        &self,
        component: &ScanComponent,
    ) -> Result<(&HuffmanTable, &HuffmanTable)> {
        let dc_table = self.dc_huff_tables.get(&component.dc_table).ok_or_else(|| {
            out_of_range(
                "DC table destination (undefined)",
                component.dc_table,
                self.header_length,
            )
        })?;
        let ac_table = self.ac_huff_tables.get(&component.ac_table).ok_or_else(|| {
            out_of_range(
                "AC table destination (undefined)",
                component.ac_table,
                self.header_length,
            )
        })?;
        Ok((dc_table, ac_table))
    }

    /// Checks that every table the frame and scan reference has been defined.
    fn check_table_references(&self) -> Result<()> {
        for frame_index in 0..self.frame_info.components.len() {
            self.quant_table(frame_index)?;
        }
        for component in &self.scan_info.components {
            self.huffman_tables(component)?;
        }
        Ok(())
    }

    fn compute_mcu_info(&mut self) {
        self.mcu_info.max_xy_sampling_factor = self.frame_info.components.iter().fold(
            (0, 0),
            |(max_h_fac, max_v_fac), component| {
                (
                    max(component.xy_sampling_factor.0, max_h_fac),
                    max(component.xy_sampling_factor.1, max_v_fac),
                )
            },
        );

        self.mcu_info.mcu_size = (
            8 * self.mcu_info.max_xy_sampling_factor.0 as u16,
            8 * self.mcu_info.max_xy_sampling_factor.1 as u16,
        );

        self.frame_info.padded_size = pad(self.frame_info.image_size, self.mcu_info.mcu_size);

        self.mcu_info.mcu_dimensions = (
            (self.frame_info.padded_size.0 / self.mcu_info.mcu_size.0 as u32) as u16,
            (self.frame_info.padded_size.1 / self.mcu_info.mcu_size.1 as u32) as u16,
        );
    }

    /// Reads header info from a given JPEGParser. The JPEGParser is expected to be at position 0
    /// in a JPEG data stream. It returns when it find the start of scan marker, reads its header,
    /// and leaves the cursor at the scan stream.
    pub fn read_header_info(reader: &mut JPEGParser) -> Result<Self> {
        {
            let position = reader.position();
            let (marker, word) = reader.read_next_marker()?;

            if marker != JPEGMarker::SOI {
                return Err(unexpected(
                    word,
                    "this JPEG image does not start with an SOI marker",
                    position,
                ));
            }
        }

        let mut result: Self = Default::default();
        let mut frame_seen = false;

        loop {
            let position = reader.position();
            let (marker, word) = reader.read_next_marker()?;

            match marker {
                JPEGMarker::SOI => {
                    return Err(unexpected(word, "repeated SOI marker", position));
                }
                JPEGMarker::EOI => {
                    return Err(unexpected(word, "EOI before the frame and scan", position));
                }
                JPEGMarker::COM => reader.skip_segment("COM")?,
                marker if marker.is_app() => reader.skip_segment("APPn")?,
                JPEGMarker::SOF0 => {
                    if frame_seen {
                        return Err(unexpected(word, "second frame header", position));
                    }
                    result.frame_info = Self::read_start_of_frame(reader)?;
                    frame_seen = true;
                }
                JPEGMarker::DHT => {
                    for table in Self::read_huffman_tables(reader)? {
                        match table.class {
                            HuffmanTableClass::Ac => {
                                result.ac_huff_tables.insert(table.destination_id, table)
                            }
                            HuffmanTableClass::Dc => {
                                result.dc_huff_tables.insert(table.destination_id, table)
                            }
                        };
                    }
                }
                JPEGMarker::DQT => {
                    for table in Self::read_quantization_tables(reader)? {
                        result.quant_tables.insert(table.destination_id, table);
                    }
                }
                JPEGMarker::SOS => {
                    if !frame_seen {
                        return Err(unexpected(word, "SOS before SOF0", position));
                    }
                    result.scan_info = Self::read_start_of_scan(reader, &result.frame_info)?;
                    result.header_length = reader.position();
                    result.check_table_references()?;
                    result.compute_mcu_info();

                    debug!(
                        "Scan of {} components, entropy-coded data at {}",
                        result.scan_info.components.len(),
                        result.header_length
                    );
                    return Ok(result);
                }
                JPEGMarker::Unrecognized => {
                    return Err(unexpected(word, "unknown marker", position));
                }
                _ => {
                    return Err(unexpected(
                        word,
                        "marker not supported by a baseline decoder",
                        position,
                    ));
                }
            }
        }
    }
}

/// Rounds `unpadded` up to a multiple of `block_size`. Wider than the input since a 65535 pixel
/// wide frame pads past `u16::MAX`.
fn pad(unpadded: (u16, u16), block_size: (u16, u16)) -> (u32, u32) {
    let round_up =
        |length: u16, block: u16| -> u32 { (length as u32).div_ceil(block as u32) * block as u32 };

    (
        round_up(unpadded.0, block_size.0),
        round_up(unpadded.1, block_size.1),
    )
}
