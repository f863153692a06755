#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::io::{self, Read};

//===========================================================================//

// Size limits for source images:
const MIN_WIDTH: u32 = 1;
const MIN_HEIGHT: u32 = 1;
const MAX_PALETTE_LEN: usize = 256;

//===========================================================================//

/// A color with 16 bits per channel, alpha-premultiplied.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct Rgba16 {
    /// Red channel, premultiplied by alpha.
    pub red: u16,
    /// Green channel, premultiplied by alpha.
    pub green: u16,
    /// Blue channel, premultiplied by alpha.
    pub blue: u16,
    /// Alpha channel; `u16::MAX` is fully opaque.
    pub alpha: u16,
}

impl Rgba16 {
    /// Creates a color from already-premultiplied channels.
    pub const fn new(red: u16, green: u16, blue: u16, alpha: u16) -> Rgba16 {
        Rgba16 { red, green, blue, alpha }
    }

    /// Creates a fully opaque color from 8-bit channels.
    pub const fn opaque8(red: u8, green: u8, blue: u8) -> Rgba16 {
        Rgba16::new(
            red as u16 * 0x101,
            green as u16 * 0x101,
            blue as u16 * 0x101,
            u16::MAX,
        )
    }

    /// Creates a color from non-premultiplied 16-bit channels.
    pub fn from_straight(
        red: u16,
        green: u16,
        blue: u16,
        alpha: u16,
    ) -> Rgba16 {
        let scale = |channel: u16| -> u16 {
            ((channel as u32 * alpha as u32) / 0xffff) as u16
        };
        Rgba16::new(scale(red), scale(green), scale(blue), alpha)
    }

    /// Returns true if the color is fully opaque.
    pub fn is_opaque(&self) -> bool {
        self.alpha == u16::MAX
    }
}

//===========================================================================//

#[derive(Clone, Debug)]
enum Pixels {
    Indexed { palette: Vec<Rgba16>, indices: Vec<u8> },
    Direct(Vec<Rgba16>),
}

/// A decoded source image: either indexed with a palette of at most 256
/// colors, or direct-color.  Pixels are stored in row-major order from top
/// to bottom.
#[derive(Clone, Debug)]
pub struct RasterImage {
    width: u32,
    height: u32,
    pixels: Pixels,
}

impl RasterImage {
    /// Creates a direct-color image.  Panics if either dimension is zero or
    /// if `pixels` doesn't have exactly `width * height` entries.
    pub fn from_rgba16(
        width: u32,
        height: u32,
        pixels: Vec<Rgba16>,
    ) -> RasterImage {
        RasterImage::check_dimensions(width, height, pixels.len());
        RasterImage { width, height, pixels: Pixels::Direct(pixels) }
    }

    /// Creates an indexed image.  Panics if either dimension is zero, if
    /// `indices` doesn't have exactly `width * height` entries, if the
    /// palette has more than 256 colors, or if any index is outside the
    /// palette.
    pub fn from_indexed(
        width: u32,
        height: u32,
        palette: Vec<Rgba16>,
        indices: Vec<u8>,
    ) -> RasterImage {
        RasterImage::check_dimensions(width, height, indices.len());
        if palette.len() > MAX_PALETTE_LEN {
            panic!(
                "Invalid palette length (was {}, but max is {})",
                palette.len(),
                MAX_PALETTE_LEN
            );
        }
        if let Some(&index) =
            indices.iter().find(|&&index| index as usize >= palette.len())
        {
            panic!(
                "Color index {} is out of range for a {}-color palette",
                index,
                palette.len()
            );
        }
        RasterImage {
            width,
            height,
            pixels: Pixels::Indexed { palette, indices },
        }
    }

    fn check_dimensions(width: u32, height: u32, num_pixels: usize) {
        if width < MIN_WIDTH {
            panic!(
                "Invalid width (was {}, but must be at least {})",
                width, MIN_WIDTH
            );
        }
        if height < MIN_HEIGHT {
            panic!(
                "Invalid height (was {}, but must be at least {})",
                height, MIN_HEIGHT
            );
        }
        let expected = (width as u64) * (height as u64);
        if (num_pixels as u64) != expected {
            panic!(
                "Invalid pixel count (was {}, but must be {} for {}x{} image)",
                num_pixels, expected, width, height
            );
        }
    }

    /// Returns the width of the image, in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height of the image, in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the palette, or `None` for a direct-color image.
    pub fn palette(&self) -> Option<&[Rgba16]> {
        match self.pixels {
            Pixels::Indexed { ref palette, .. } => Some(palette),
            Pixels::Direct(_) => None,
        }
    }

    /// Returns the palette index of the pixel at (`x`, `y`), or `None` for a
    /// direct-color image.  Panics if the coordinates are out of bounds.
    pub fn color_index(&self, x: u32, y: u32) -> Option<u8> {
        let offset = self.offset(x, y);
        match self.pixels {
            Pixels::Indexed { ref indices, .. } => Some(indices[offset]),
            Pixels::Direct(_) => None,
        }
    }

    /// Returns the color of the pixel at (`x`, `y`).  Panics if the
    /// coordinates are out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Rgba16 {
        let offset = self.offset(x, y);
        match self.pixels {
            Pixels::Indexed { ref palette, ref indices } => {
                palette[indices[offset] as usize]
            }
            Pixels::Direct(ref pixels) => pixels[offset],
        }
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        if x >= self.width || y >= self.height {
            panic!(
                "Pixel ({}, {}) is outside of {}x{} image",
                x, y, self.width, self.height
            );
        }
        (y as usize) * (self.width as usize) + (x as usize)
    }

    /// Decodes an image from a PNG file.  Indexed PNGs keep their palette;
    /// everything else becomes a direct-color image.  Returns an error if the
    /// PNG data is malformed.
    pub fn read_png<R: Read>(reader: R) -> io::Result<RasterImage> {
        let mut decoder = png::Decoder::new(reader);
        decoder.set_transformations(png::Transformations::IDENTITY);
        let mut png_reader = match decoder.read_info() {
            Ok(png_reader) => png_reader,
            Err(error) => invalid_data!("Malformed PNG data: {}", error),
        };
        let mut buffer = vec![0u8; png_reader.output_buffer_size()];
        let frame = match png_reader.next_frame(&mut buffer) {
            Ok(frame) => frame,
            Err(error) => invalid_data!("Malformed PNG data: {}", error),
        };
        if frame.width < MIN_WIDTH || frame.height < MIN_HEIGHT {
            invalid_data!(
                "Invalid PNG dimensions ({}x{})",
                frame.width,
                frame.height
            );
        }
        let info = png_reader.info();
        let samples = SampleReader {
            buffer: &buffer,
            line_size: frame.line_size,
            bits: frame.bit_depth as u8,
        };
        let width = frame.width;
        let height = frame.height;
        let trns = info.trns.as_deref();
        let image = match frame.color_type {
            png::ColorType::Indexed => {
                let plte = match info.palette.as_deref() {
                    Some(plte) => plte,
                    None => invalid_data!("Indexed PNG has no PLTE chunk"),
                };
                let mut palette: Vec<Rgba16> = plte
                    .chunks_exact(3)
                    .enumerate()
                    .map(|(index, rgb)| {
                        let alpha = trns
                            .and_then(|trns| trns.get(index).copied())
                            .unwrap_or(u8::MAX);
                        Rgba16::from_straight(
                            rgb[0] as u16 * 0x101,
                            rgb[1] as u16 * 0x101,
                            rgb[2] as u16 * 0x101,
                            alpha as u16 * 0x101,
                        )
                    })
                    .collect();
                let mut indices =
                    Vec::with_capacity((width as usize) * (height as usize));
                for y in 0..height {
                    for x in 0..width {
                        indices.push(samples.get(y, x as usize) as u8);
                    }
                }
                // Pixels may refer past the end of PLTE; those entries are
                // treated as opaque black.
                let max_index =
                    indices.iter().copied().max().unwrap_or(0) as usize;
                while palette.len() <= max_index {
                    palette.push(Rgba16::opaque8(0, 0, 0));
                }
                if palette.len() > MAX_PALETTE_LEN {
                    invalid_data!(
                        "PNG palette has {} entries (max is {})",
                        palette.len(),
                        MAX_PALETTE_LEN
                    );
                }
                RasterImage::from_indexed(width, height, palette, indices)
            }
            color_type => {
                let mut pixels =
                    Vec::with_capacity((width as usize) * (height as usize));
                for y in 0..height {
                    for x in 0..width as usize {
                        pixels.push(samples.direct_pixel(
                            color_type, trns, y, x,
                        ));
                    }
                }
                RasterImage::from_rgba16(width, height, pixels)
            }
        };
        log::debug!(
            "Decoded {}x{} {:?} PNG at {} bits per sample",
            width,
            height,
            frame.color_type,
            samples.bits
        );
        Ok(image)
    }
}

//===========================================================================//

/// Reads raw (possibly sub-byte or 16-bit big-endian) samples out of a
/// decoded PNG frame.
struct SampleReader<'a> {
    buffer: &'a [u8],
    line_size: usize,
    bits: u8,
}

impl<'a> SampleReader<'a> {
    /// Returns the `index`th sample of row `y`, unscaled.
    fn get(&self, y: u32, index: usize) -> u16 {
        let row = &self.buffer[(y as usize) * self.line_size..];
        match self.bits {
            16 => u16::from_be_bytes([row[2 * index], row[2 * index + 1]]),
            8 => row[index] as u16,
            bits => {
                let bit_offset = index * bits as usize;
                let shift = 8 - bits as usize - bit_offset % 8;
                let mask = (1u16 << bits) - 1;
                ((row[bit_offset / 8] as u16) >> shift) & mask
            }
        }
    }

    /// Widens a sample to 16 bits.
    fn widen(&self, sample: u16) -> u16 {
        match self.bits {
            16 => sample,
            8 => sample * 0x101,
            bits => {
                let max = (1u32 << bits) - 1;
                ((sample as u32 * 0xffff) / max) as u16
            }
        }
    }

    /// Returns the `index`th color key sample of a tRNS chunk, if present.
    /// The decoder keeps one byte per sample below 16 bits per sample.
    fn trns_value(&self, trns: Option<&[u8]>, index: usize) -> Option<u16> {
        let trns = trns?;
        if self.bits < 16 {
            return trns.get(index).copied().map(u16::from);
        }
        let bytes = trns.get(2 * index..2 * index + 2)?;
        Some(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn direct_pixel(
        &self,
        color_type: png::ColorType,
        trns: Option<&[u8]>,
        y: u32,
        x: usize,
    ) -> Rgba16 {
        match color_type {
            png::ColorType::Grayscale => {
                let gray = self.get(y, x);
                if self.trns_value(trns, 0) == Some(gray) {
                    return Rgba16::default();
                }
                let gray = self.widen(gray);
                Rgba16::new(gray, gray, gray, u16::MAX)
            }
            png::ColorType::GrayscaleAlpha => {
                let gray = self.widen(self.get(y, 2 * x));
                let alpha = self.widen(self.get(y, 2 * x + 1));
                Rgba16::from_straight(gray, gray, gray, alpha)
            }
            png::ColorType::Rgb => {
                let red = self.get(y, 3 * x);
                let green = self.get(y, 3 * x + 1);
                let blue = self.get(y, 3 * x + 2);
                let key = (
                    self.trns_value(trns, 0),
                    self.trns_value(trns, 1),
                    self.trns_value(trns, 2),
                );
                if key == (Some(red), Some(green), Some(blue)) {
                    return Rgba16::default();
                }
                Rgba16::new(
                    self.widen(red),
                    self.widen(green),
                    self.widen(blue),
                    u16::MAX,
                )
            }
            png::ColorType::Indexed => {
                unreachable!("indexed PNGs are decoded with their palette")
            }
            png::ColorType::Rgba => {
                Rgba16::from_straight(
                    self.widen(self.get(y, 4 * x)),
                    self.widen(self.get(y, 4 * x + 1)),
                    self.widen(self.get(y, 4 * x + 2)),
                    self.widen(self.get(y, 4 * x + 3)),
                )
            }
        }
    }
}

//===========================================================================//


//===========================================================================//
