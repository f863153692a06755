use crate::dib::Dib;
use crate::dos::write_dos_header;
use crate::image::RasterImage;
use crate::ne::write_ne;
use crate::pe::{write_pe, PeKind};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

//===========================================================================//

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
/// The container format of a generated executable.
pub enum ExeFormat {
    /// 16-bit New Executable
    Ne16,
    /// 32-bit Portable Executable (i386)
    Pe32,
    /// 64-bit Portable Executable (AMD64)
    Pe32Plus,
}

impl ExeFormat {
    /// Returns the short lowercase name used in fixture file names.
    pub fn name(&self) -> &'static str {
        match *self {
            ExeFormat::Ne16 => "ne16",
            ExeFormat::Pe32 => "pe32",
            ExeFormat::Pe32Plus => "pe32plus",
        }
    }

    /// Parses a name as returned by `ExeFormat::name`.
    pub fn from_name(name: &str) -> Option<ExeFormat> {
        match name {
            "ne16" => Some(ExeFormat::Ne16),
            "pe32" => Some(ExeFormat::Pe32),
            "pe32plus" => Some(ExeFormat::Pe32Plus),
            _ => None,
        }
    }
}

//===========================================================================//

/// Writes an executable in `format` carrying `dib` as its only icon to `exe`,
/// and the equivalent ICO file to `ico`.  Every offset is computed up front,
/// so both writers only ever need to append.
pub fn write_exe<E: Write, I: Write>(
    mut exe: E,
    ico: I,
    dib: &Dib,
    format: ExeFormat,
) -> io::Result<()> {
    write_dos_header(&mut exe)?;
    match format {
        ExeFormat::Ne16 => write_ne(exe, ico, dib),
        ExeFormat::Pe32 => write_pe(exe, ico, dib, PeKind::Pe32),
        ExeFormat::Pe32Plus => write_pe(exe, ico, dib, PeKind::Pe32Plus),
    }
}

//===========================================================================//

/// One combination of source image, mask, container format and color depth.
#[derive(Clone, Copy, Debug)]
pub struct Fixture<'a> {
    /// The icon image.
    pub image: &'a RasterImage,
    /// The AND mask; must be the same size as `image`.
    pub mask: &'a RasterImage,
    /// The container format of the executable.
    pub format: ExeFormat,
    /// The color depth `image` is expected to encode at.
    pub bits_per_pixel: u16,
}

/// The files generated for a `Fixture`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EncodedFixture {
    /// The executable.
    pub exe: Vec<u8>,
    /// The standalone ICO file.
    pub ico: Vec<u8>,
}

impl<'a> Fixture<'a> {
    /// Encodes the executable and ICO file in memory.  Nothing is produced
    /// unless both encode successfully.
    pub fn encode(&self) -> io::Result<EncodedFixture> {
        let dib = Dib::encode(self.image, self.mask, self.bits_per_pixel)?;
        let mut exe = Vec::new();
        let mut ico = Vec::new();
        write_exe(&mut exe, &mut ico, &dib, self.format)?;
        log::debug!(
            "Encoded {} bytes of {} and {} bytes of ICO at {} bpp",
            exe.len(),
            self.format.name(),
            ico.len(),
            self.bits_per_pixel
        );
        Ok(EncodedFixture { exe, ico })
    }
}

//===========================================================================//


//===========================================================================//
