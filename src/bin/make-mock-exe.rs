//! Writes the fixed set of mock executables and ICO files.

use anyhow::{bail, Context};
use clap::{App, Arg};
use mockexe::{ExeFormat, Fixture, RasterImage};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

//===========================================================================//

struct FixtureEntry {
    image: &'static str,
    format: ExeFormat,
    bits_per_pixel: u16,
    write_ico: bool,
}

impl FixtureEntry {
    fn name(&self) -> String {
        format!("{}-{}bpp", self.format.name(), self.bits_per_pixel)
    }
}

const MASK: &str = "mask.png";

const FIXTURES: &[FixtureEntry] = &[
    FixtureEntry {
        image: "1bpp.png",
        format: ExeFormat::Ne16,
        bits_per_pixel: 1,
        write_ico: true,
    },
    FixtureEntry {
        image: "4bpp.png",
        format: ExeFormat::Ne16,
        bits_per_pixel: 4,
        write_ico: true,
    },
    FixtureEntry {
        image: "8bpp.png",
        format: ExeFormat::Ne16,
        bits_per_pixel: 8,
        write_ico: true,
    },
    FixtureEntry {
        image: "16bpp.png",
        format: ExeFormat::Pe32,
        bits_per_pixel: 16,
        write_ico: true,
    },
    FixtureEntry {
        image: "24bpp.png",
        format: ExeFormat::Pe32,
        bits_per_pixel: 24,
        write_ico: true,
    },
    FixtureEntry {
        image: "32bpp.png",
        format: ExeFormat::Pe32,
        bits_per_pixel: 32,
        write_ico: true,
    },
    // Same image as pe32-32bpp, so its ICO file would be a duplicate.
    FixtureEntry {
        image: "32bpp.png",
        format: ExeFormat::Pe32Plus,
        bits_per_pixel: 32,
        write_ico: false,
    },
];

//===========================================================================//

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let matches = App::new("make-mock-exe")
        .version("0.1")
        .about("Generates mock executables carrying a single icon resource")
        .arg(
            Arg::with_name("assets")
                .takes_value(true)
                .value_name("DIR")
                .short("a")
                .long("assets")
                .default_value("asset")
                .help("Sets the directory holding the source PNG files"),
        )
        .arg(
            Arg::with_name("output")
                .takes_value(true)
                .value_name("DIR")
                .short("o")
                .long("out")
                .default_value("out")
                .help("Sets the output directory"),
        )
        .arg(
            Arg::with_name("fixture")
                .multiple(true)
                .help("Generates only the named fixtures (e.g. pe32-24bpp)"),
        )
        .get_matches();
    let assets = PathBuf::from(matches.value_of("assets").unwrap_or("asset"));
    let out_dir = PathBuf::from(matches.value_of("output").unwrap_or("out"));

    let selected: Vec<&FixtureEntry> = match matches.values_of("fixture") {
        Some(names) => {
            let mut selected = Vec::new();
            for name in names {
                match FIXTURES.iter().find(|entry| entry.name() == name) {
                    Some(entry) => selected.push(entry),
                    None => bail!("Unknown fixture {:?}", name),
                }
            }
            selected
        }
        None => FIXTURES.iter().collect(),
    };

    fs::create_dir_all(&out_dir).with_context(|| {
        format!("creating output directory {:?}", out_dir)
    })?;
    let mask = load_png(&assets.join(MASK))?;
    for entry in selected {
        generate(entry, &assets, &mask, &out_dir)
            .with_context(|| format!("generating {}", entry.name()))?;
    }
    Ok(())
}

fn generate(
    entry: &FixtureEntry,
    assets: &Path,
    mask: &RasterImage,
    out_dir: &Path,
) -> anyhow::Result<()> {
    let image = load_png(&assets.join(entry.image))?;
    let fixture = Fixture {
        image: &image,
        mask,
        format: entry.format,
        bits_per_pixel: entry.bits_per_pixel,
    };
    let encoded = fixture.encode().context("encoding fixture")?;
    write_file(&out_dir.join(format!("{}.exe", entry.name())), &encoded.exe)?;
    if entry.write_ico {
        let ico_name = format!("{}bpp.ico", entry.bits_per_pixel);
        write_file(&out_dir.join(ico_name), &encoded.ico)?;
    }
    Ok(())
}

fn load_png(path: &Path) -> anyhow::Result<RasterImage> {
    let file = fs::File::open(path)
        .with_context(|| format!("opening {:?}", path))?;
    RasterImage::read_png(file)
        .with_context(|| format!("decoding {:?}", path))
}

/// Writes `data` to `path`, removing whatever was written if that fails.
fn write_file(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    if let Err(error) = fs::write(path, data) {
        match fs::remove_file(path) {
            Err(cleanup) if cleanup.kind() != io::ErrorKind::NotFound => {
                log::warn!("Could not remove partial {:?}: {}", path, cleanup);
            }
            _ => {}
        }
        return Err(error).with_context(|| format!("writing {:?}", path));
    }
    log::info!("Wrote {:?} ({} bytes)", path, data.len());
    Ok(())
}

//===========================================================================//


//===========================================================================//
