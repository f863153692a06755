use crate::dib::Dib;
use crate::restype::ResourceType;
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{self, Write};

//===========================================================================//

// The size of an ICONDIR/GRPICONDIR header, in bytes.
pub(crate) const ICON_DIR_LEN: u32 = 6;
// The size of a GRPICONDIRENTRY struct, in bytes.
pub(crate) const GROUP_ICON_DIR_ENTRY_LEN: u32 = 14;
// The size of an ICONDIRENTRY struct, in bytes.
pub(crate) const ICON_DIR_ENTRY_LEN: u32 = 16;

/// The size of an `RT_GROUP_ICON` payload holding a single entry.
pub(crate) const GROUP_ICON_LEN: u32 = ICON_DIR_LEN + GROUP_ICON_DIR_ENTRY_LEN;

/// The resource ID of the single `RT_ICON` (and `RT_GROUP_ICON`) resource.
pub(crate) const ICON_RESOURCE_ID: u16 = 1;

// In an ICO file with one entry, the image data starts right after the entry.
const ICO_IMAGE_OFFSET: u32 = ICON_DIR_LEN + ICON_DIR_ENTRY_LEN;

//===========================================================================//

/// The description of one icon image that appears both in a group icon
/// resource and in an ICO file directory.  Both representations are written
/// from the same entry, so they can't disagree about the image.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IconDirEntry {
    width: u8,
    height: u8,
    num_colors: u8,
    color_planes: u16,
    bits_per_pixel: u16,
    data_size: u32,
}

impl IconDirEntry {
    /// Describes an encoded DIB.  Returns an error if the DIB is too large to
    /// be described.
    pub fn from_dib(dib: &Dib) -> io::Result<IconDirEntry> {
        // A width/height/color-count byte of zero indicates 256 or more.
        let to_byte = |value: usize| if value > 255 { 0 } else { value as u8 };
        Ok(IconDirEntry {
            width: to_byte(dib.width() as usize),
            height: to_byte(dib.height() as usize),
            num_colors: to_byte(dib.num_colors()),
            color_planes: 1,
            bits_per_pixel: dib.bits_per_pixel(),
            data_size: narrow!(dib.size(), u32, "DIB size"),
        })
    }

    /// Returns the width byte (zero for images 256 pixels wide or more).
    pub fn width(&self) -> u8 {
        self.width
    }

    /// Returns the height byte (zero for images 256 pixels tall or more).
    pub fn height(&self) -> u8 {
        self.height
    }

    /// Returns the color count byte (zero for direct-color images and for
    /// 256-color palettes).
    pub fn num_colors(&self) -> u8 {
        self.num_colors
    }

    /// Returns the number of color planes, which is always 1.
    pub fn color_planes(&self) -> u16 {
        self.color_planes
    }

    /// Returns the bits-per-pixel of the image.
    pub fn bits_per_pixel(&self) -> u16 {
        self.bits_per_pixel
    }

    /// Returns the size of the image data, in bytes.
    pub fn data_size(&self) -> u32 {
        self.data_size
    }

    fn write_common<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u8(self.width)?;
        writer.write_u8(self.height)?;
        writer.write_u8(self.num_colors)?;
        writer.write_u8(0)?; // reserved
        writer.write_u16::<LittleEndian>(self.color_planes)?;
        writer.write_u16::<LittleEndian>(self.bits_per_pixel)?;
        writer.write_u32::<LittleEndian>(self.data_size)?;
        Ok(())
    }

    /// Writes a GRPICONDIRENTRY, which refers to its image by resource ID.
    fn write_group_entry<W: Write>(
        &self,
        mut writer: W,
        resource_id: u16,
    ) -> io::Result<()> {
        self.write_common(&mut writer)?;
        writer.write_u16::<LittleEndian>(resource_id)
    }

    /// Writes an ICONDIRENTRY, which refers to its image by file offset.
    fn write_file_entry<W: Write>(
        &self,
        mut writer: W,
        data_offset: u32,
    ) -> io::Result<()> {
        self.write_common(&mut writer)?;
        writer.write_u32::<LittleEndian>(data_offset)
    }
}

//===========================================================================//

/// Encodes the header shared by ICO files and group icon resources.
fn icon_dir_header() -> io::Result<Vec<u8>> {
    let mut header = Vec::with_capacity(ICON_DIR_LEN as usize);
    header.write_u16::<LittleEndian>(0)?; // reserved
    header.write_u16::<LittleEndian>(1)?; // type: icon
    header.write_u16::<LittleEndian>(1)?; // number of entries
    Ok(header)
}

/// Writes the payload of an `RT_GROUP_ICON` resource describing `dib`, whose
/// `RT_ICON` resource has ID 1.
pub fn write_group_icon<W: Write>(mut writer: W, dib: &Dib) -> io::Result<()> {
    let entry = IconDirEntry::from_dib(dib)?;
    writer.write_all(&icon_dir_header()?)?;
    entry.write_group_entry(&mut writer, ICON_RESOURCE_ID)
}

/// Writes a standalone ICO file containing just `dib`.
pub fn write_ico<W: Write>(mut writer: W, dib: &Dib) -> io::Result<()> {
    write_icon_payloads(io::sink(), &mut writer, dib)
}

/// Writes the group icon payload followed by the icon payload to `exe`, and
/// the corresponding ICO file to `ico`.  The header and the image data are
/// encoded once and copied to both writers.
pub(crate) fn write_icon_payloads<E: Write, I: Write>(
    mut exe: E,
    mut ico: I,
    dib: &Dib,
) -> io::Result<()> {
    let entry = IconDirEntry::from_dib(dib)?;
    log::debug!(
        "{:?} entry for {}x{} image: {:?}",
        ResourceType::GroupIcon,
        dib.width(),
        dib.height(),
        entry
    );
    let header = icon_dir_header()?;
    exe.write_all(&header)?;
    ico.write_all(&header)?;
    entry.write_group_entry(&mut exe, ICON_RESOURCE_ID)?;
    entry.write_file_entry(&mut ico, ICO_IMAGE_OFFSET)?;
    exe.write_all(dib.data())?;
    ico.write_all(dib.data())?;
    Ok(())
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{
        write_group_icon, write_icon_payloads, write_ico, IconDirEntry,
        GROUP_ICON_LEN,
    };
    use crate::dib::Dib;
    use crate::image::{RasterImage, Rgba16};

    fn two_color_dib(width: u32, height: u32) -> Dib {
        let palette =
            vec![Rgba16::opaque8(0, 0, 0), Rgba16::opaque8(0xff, 0xff, 0xff)];
        let num_pixels = (width * height) as usize;
        let indices = (0..num_pixels).map(|index| (index % 2) as u8).collect();
        let image = RasterImage::from_indexed(width, height, palette, indices);
        let mask = RasterImage::from_rgba16(
            width,
            height,
            vec![Rgba16::opaque8(0xff, 0xff, 0xff); num_pixels],
        );
        Dib::encode(&image, &mask, 1).unwrap()
    }

    #[test]
    fn entry_from_dib() {
        let dib = two_color_dib(16, 16);
        let entry = IconDirEntry::from_dib(&dib).unwrap();
        assert_eq!(entry.width(), 16);
        assert_eq!(entry.height(), 16);
        assert_eq!(entry.num_colors(), 2);
        assert_eq!(entry.color_planes(), 1);
        assert_eq!(entry.bits_per_pixel(), 1);
        assert_eq!(entry.data_size(), 176);
    }

    #[test]
    fn large_dimensions_are_written_as_zero() {
        let dib = two_color_dib(256, 1);
        let entry = IconDirEntry::from_dib(&dib).unwrap();
        assert_eq!(entry.width(), 0);
        assert_eq!(entry.height(), 1);
    }

    #[test]
    fn write_group_icon_payload() {
        let dib = two_color_dib(16, 16);
        let mut output = Vec::<u8>::new();
        write_group_icon(&mut output, &dib).unwrap();
        let expected: &[u8] = b"\
            \x00\x00\x01\x00\x01\x00\
            \x10\x10\x02\x00\x01\x00\x01\x00\xb0\x00\x00\x00\x01\x00";
        assert_eq!(output.as_slice(), expected);
        assert_eq!(output.len(), GROUP_ICON_LEN as usize);
    }

    #[test]
    fn write_ico_file() {
        let dib = two_color_dib(16, 16);
        let mut output = Vec::<u8>::new();
        write_ico(&mut output, &dib).unwrap();
        let expected: &[u8] = b"\
            \x00\x00\x01\x00\x01\x00\
            \x10\x10\x02\x00\x01\x00\x01\x00\
            \xb0\x00\x00\x00\x16\x00\x00\x00";
        assert_eq!(&output[..22], expected);
        assert_eq!(&output[22..], dib.data());
    }

    #[test]
    fn payloads_share_header_and_image() {
        let dib = two_color_dib(5, 3);
        let mut exe = Vec::<u8>::new();
        let mut ico = Vec::<u8>::new();
        write_icon_payloads(&mut exe, &mut ico, &dib).unwrap();
        assert_eq!(exe[..6], ico[..6]);
        // Everything but the trailing ID/offset field is the same.
        assert_eq!(exe[6..18], ico[6..18]);
        assert_eq!(&exe[20..], dib.data());
        assert_eq!(&ico[22..], dib.data());
        let mut group = Vec::<u8>::new();
        write_group_icon(&mut group, &dib).unwrap();
        assert_eq!(&exe[..20], group.as_slice());
    }
}

//===========================================================================//
