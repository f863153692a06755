//! A library for synthesizing minimal Windows executables that carry a single
//! icon resource, along with the matching standalone ICO file.
//!
//! The generated files are meant as fixtures for tools that extract icons
//! from executables.  Every historically relevant DIB color depth (1, 4, 8,
//! 16, 24 and 32 bits per pixel) can be embedded in any of three container
//! formats: 16-bit NE, 32-bit PE, and 64-bit PE32+.
//!
//! ```no_run
//! use mockexe::{Dib, ExeFormat, RasterImage};
//! use std::fs::File;
//!
//! let image = RasterImage::read_png(File::open("asset/24bpp.png")?)?;
//! let mask = RasterImage::read_png(File::open("asset/mask.png")?)?;
//! let dib = Dib::encode(&image, &mask, 24)?;
//! let mut exe = Vec::new();
//! let mut ico = Vec::new();
//! mockexe::write_exe(&mut exe, &mut ico, &dib, ExeFormat::Pe32)?;
//! # Ok::<(), std::io::Error>(())
//! ```

#![warn(missing_docs)]

#[macro_use]
mod macros;

mod bmpdepth;
mod dib;
mod dos;
mod exe;
mod icondir;
mod image;
mod ne;
mod pe;
mod restype;

pub use crate::dib::Dib;
pub use crate::exe::{write_exe, EncodedFixture, ExeFormat, Fixture};
pub use crate::icondir::{write_group_icon, write_ico, IconDirEntry};
pub use crate::image::{RasterImage, Rgba16};
pub use crate::restype::ResourceType;
