use crate::bmpdepth::{scanline_stride, BmpDepth};
use crate::image::{RasterImage, Rgba16};
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{self, Write};

//===========================================================================//

// The size of a BITMAPINFOHEADER struct, in bytes.
pub(crate) const BMP_HEADER_LEN: u32 = 40;

// 72 DPI, expressed in pixels per meter.
const PIXELS_PER_METER: i32 = 2835;

// A mask pixel is opaque once its red, green and blue channels sum to at least
// this much (out of a maximum of 3 * 0xffff).
const MASK_THRESHOLD: u32 = 0x18000;

//===========================================================================//

/// An icon image encoded as a device-independent bitmap, exactly as it is
/// stored in an ICO file or an `RT_ICON` resource: a BITMAPINFOHEADER, the
/// color table, the color plane, and the 1-bit AND mask, with both planes
/// stored bottom row first.
#[derive(Clone, Debug)]
pub struct Dib {
    width: u32,
    height: u32,
    depth: BmpDepth,
    num_colors: usize,
    data: Vec<u8>,
}

impl Dib {
    /// Encodes `image` at `bits_per_pixel`, using `mask` for the AND mask.
    ///
    /// The color depth is not chosen by the caller; it is derived from the
    /// image (1, 4 or 8 bpp for a palette of at most 2, 16 or 256 colors;
    /// 32 bpp for a direct-color image with any transparency; 24 bpp
    /// otherwise, or 16 bpp if that is what was asked for).  Returns an error
    /// if that depth differs from `bits_per_pixel`, or if `mask` doesn't have
    /// the same dimensions as `image`.
    pub fn encode(
        image: &RasterImage,
        mask: &RasterImage,
        bits_per_pixel: u16,
    ) -> io::Result<Dib> {
        let requested = match BmpDepth::from_bits_per_pixel(bits_per_pixel) {
            Some(depth) => depth,
            None => {
                invalid_input!(
                    "Unsupported bits per pixel ({}); must be 1, 4, 8, 16, \
                     24 or 32",
                    bits_per_pixel
                );
            }
        };
        let depth = Dib::classify(image, requested);
        if depth != requested {
            invalid_input!(
                "Expected {} bits per pixel, but image classifies as {}",
                requested.bits_per_pixel(),
                depth.bits_per_pixel()
            );
        }
        if mask.width() != image.width() || mask.height() != image.height() {
            invalid_input!(
                "Mask dimensions ({}x{}) don't match image dimensions ({}x{})",
                mask.width(),
                mask.height(),
                image.width(),
                image.height()
            );
        }
        let num_colors = image.palette().map_or(0, |palette| palette.len());
        let data = Dib::write_data(image, mask, depth)?;
        Ok(Dib {
            width: image.width(),
            height: image.height(),
            depth,
            num_colors,
            data,
        })
    }

    /// Determines the color depth that `image` encodes at.  The requested
    /// depth matters only to allow 16 bpp in place of 24 bpp.
    fn classify(image: &RasterImage, requested: BmpDepth) -> BmpDepth {
        if let Some(palette) = image.palette() {
            let depth = BmpDepth::for_palette(palette.len());
            log::debug!(
                "{}-color palette classifies as {} bpp",
                palette.len(),
                depth.bits_per_pixel()
            );
            return depth;
        }
        let has_alpha = (0..image.height()).any(|y| {
            (0..image.width()).any(|x| !image.pixel(x, y).is_opaque())
        });
        let depth = if has_alpha {
            BmpDepth::ThirtyTwo
        } else if requested == BmpDepth::Sixteen {
            BmpDepth::Sixteen
        } else {
            BmpDepth::TwentyFour
        };
        log::debug!(
            "Direct-color image (alpha: {}) classifies as {} bpp",
            has_alpha,
            depth.bits_per_pixel()
        );
        depth
    }

    fn write_data(
        image: &RasterImage,
        mask: &RasterImage,
        depth: BmpDepth,
    ) -> io::Result<Vec<u8>> {
        let width = image.width();
        let height = image.height();
        let palette = image.palette().unwrap_or(&[]);
        let data_size = Dib::data_size(width, height, depth, palette.len());
        let mut data = Vec::<u8>::with_capacity(data_size);

        // Write the BITMAPINFOHEADER struct:
        data.write_u32::<LittleEndian>(BMP_HEADER_LEN)?;
        data.write_i32::<LittleEndian>(narrow!(width, i32, "DIB width"))?;
        // The height counts the rows of both the color plane and the mask.
        let doubled_height = (height as u64) * 2;
        data.write_i32::<LittleEndian>(narrow!(
            doubled_height,
            i32,
            "Doubled DIB height"
        ))?;
        data.write_u16::<LittleEndian>(1)?; // planes
        data.write_u16::<LittleEndian>(depth.bits_per_pixel())?;
        data.write_u32::<LittleEndian>(0)?; // compression (BI_RGB)
        data.write_u32::<LittleEndian>(0)?; // image size
        data.write_i32::<LittleEndian>(PIXELS_PER_METER)?;
        data.write_i32::<LittleEndian>(PIXELS_PER_METER)?;
        data.write_u32::<LittleEndian>(palette.len() as u32)?; // colors used
        data.write_u32::<LittleEndian>(palette.len() as u32)?; // important
        debug_assert_eq!(data.len(), BMP_HEADER_LEN as usize);

        // Write the color table, truncating each channel to 8 bits:
        for color in palette.iter() {
            data.write_u8((color.blue / 0x100) as u8)?;
            data.write_u8((color.green / 0x100) as u8)?;
            data.write_u8((color.red / 0x100) as u8)?;
            data.write_u8(0)?;
        }

        // Write the color plane, starting from the *bottom* row:
        let mut row = vec![0u8; depth.stride(width)];
        for y in (0..height).rev() {
            row.fill(0);
            // Indexed depths are only ever chosen for images with a palette.
            let index_at = |x: u32| image.color_index(x, y).unwrap_or(0);
            match depth {
                BmpDepth::One => {
                    pack_bits(&mut row, 1, (0..width).map(index_at))
                }
                BmpDepth::Four => {
                    pack_bits(&mut row, 4, (0..width).map(index_at))
                }
                BmpDepth::Eight => {
                    for (x, byte) in (0..width).zip(row.iter_mut()) {
                        *byte = index_at(x);
                    }
                }
                BmpDepth::Sixteen => {
                    for (x, chunk) in (0..width).zip(row.chunks_exact_mut(2)) {
                        let packed = rgb555(image.pixel(x, y));
                        chunk.copy_from_slice(&packed.to_le_bytes());
                    }
                }
                BmpDepth::TwentyFour => {
                    for (x, chunk) in (0..width).zip(row.chunks_exact_mut(3)) {
                        let color = image.pixel(x, y);
                        chunk[0] = (color.blue >> 8) as u8;
                        chunk[1] = (color.green >> 8) as u8;
                        chunk[2] = (color.red >> 8) as u8;
                    }
                }
                BmpDepth::ThirtyTwo => {
                    for (x, chunk) in (0..width).zip(row.chunks_exact_mut(4)) {
                        let color = image.pixel(x, y);
                        chunk[0] = (color.blue >> 8) as u8;
                        chunk[1] = (color.green >> 8) as u8;
                        chunk[2] = (color.red >> 8) as u8;
                        chunk[3] = (color.alpha >> 8) as u8;
                    }
                }
            }
            data.write_all(&row)?;
        }

        // Write the mask, again starting from the bottom row:
        let mut mask_row = vec![0u8; scanline_stride(width, 1)];
        for y in (0..height).rev() {
            mask_row.fill(0);
            pack_bits(
                &mut mask_row,
                1,
                (0..width).map(|x| mask_bit(mask.pixel(x, y))),
            );
            data.write_all(&mask_row)?;
        }

        debug_assert_eq!(data.len(), data_size);
        Ok(data)
    }

    fn data_size(
        width: u32,
        height: u32,
        depth: BmpDepth,
        num_colors: usize,
    ) -> usize {
        BMP_HEADER_LEN as usize
            + 4 * num_colors
            + depth.stride(width) * height as usize
            + scanline_stride(width, 1) * height as usize
    }

    /// Returns the width of the image, in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height of the image, in pixels (not doubled).
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the bits-per-pixel of the color plane.
    pub fn bits_per_pixel(&self) -> u16 {
        self.depth.bits_per_pixel()
    }

    /// Returns true if the color plane holds palette indices.
    pub fn is_indexed(&self) -> bool {
        self.depth.is_indexed()
    }

    /// Returns the number of entries in the color table (zero for
    /// direct-color images).
    pub fn num_colors(&self) -> usize {
        self.num_colors
    }

    /// Returns the total size of the encoded bitmap, in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Returns the encoded bitmap.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

//===========================================================================//

/// Packs `bits`-wide values into `row`, most significant bits first.  Bits
/// past the last value are left as they were.
fn pack_bits<I: Iterator<Item = u8>>(row: &mut [u8], bits: usize, values: I) {
    debug_assert!(bits == 1 || bits == 4);
    let value_mask = (1u8 << bits) - 1;
    for (index, value) in values.enumerate() {
        let bit_offset = index * bits;
        let shift = 8 - bits - bit_offset % 8;
        row[bit_offset / 8] |= (value & value_mask) << shift;
    }
}

/// Packs the top five bits of each channel as X1R5G5B5.
fn rgb555(color: Rgba16) -> u16 {
    ((color.red >> 11) << 10) | ((color.green >> 11) << 5) | (color.blue >> 11)
}

fn mask_bit(color: Rgba16) -> u8 {
    let sum = color.red as u32 + color.green as u32 + color.blue as u32;
    if sum >= MASK_THRESHOLD {
        1
    } else {
        0
    }
}

//===========================================================================//


//===========================================================================//
