//===========================================================================//

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum BmpDepth {
    One,
    Four,
    Eight,
    Sixteen,
    TwentyFour,
    ThirtyTwo,
}

impl BmpDepth {
    pub(crate) fn from_bits_per_pixel(
        bits_per_pixel: u16,
    ) -> Option<BmpDepth> {
        match bits_per_pixel {
            1 => Some(BmpDepth::One),
            4 => Some(BmpDepth::Four),
            8 => Some(BmpDepth::Eight),
            16 => Some(BmpDepth::Sixteen),
            24 => Some(BmpDepth::TwentyFour),
            32 => Some(BmpDepth::ThirtyTwo),
            _ => None,
        }
    }

    /// Picks the depth for a palette with `num_colors` entries.
    pub(crate) fn for_palette(num_colors: usize) -> BmpDepth {
        if num_colors <= 2 {
            BmpDepth::One
        } else if num_colors <= 16 {
            BmpDepth::Four
        } else {
            BmpDepth::Eight
        }
    }

    pub(crate) fn bits_per_pixel(&self) -> u16 {
        match *self {
            BmpDepth::One => 1,
            BmpDepth::Four => 4,
            BmpDepth::Eight => 8,
            BmpDepth::Sixteen => 16,
            BmpDepth::TwentyFour => 24,
            BmpDepth::ThirtyTwo => 32,
        }
    }

    pub(crate) fn is_indexed(&self) -> bool {
        matches!(*self, BmpDepth::One | BmpDepth::Four | BmpDepth::Eight)
    }

    /// Returns the number of bytes in one scanline of `width` pixels at this
    /// depth, including padding up to a 32-bit boundary.
    pub(crate) fn stride(&self, width: u32) -> usize {
        scanline_stride(width, self.bits_per_pixel())
    }
}

/// Rows of a DIB are padded to a multiple of four bytes.
pub(crate) fn scanline_stride(width: u32, bits_per_pixel: u16) -> usize {
    (((width as usize) * (bits_per_pixel as usize) + 31) & !31) / 8
}

//===========================================================================//


//===========================================================================//
