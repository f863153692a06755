use crate::dib::Dib;
use crate::dos::DOS_HEADER_LEN;
use crate::icondir::{write_icon_payloads, GROUP_ICON_LEN, ICON_RESOURCE_ID};
use crate::restype::ResourceType;
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{self, Write};

//===========================================================================//

const PE_SIGNATURE: &[u8; 4] = b"PE\0\0";

// Structure sizes, in bytes:
const FILE_HEADER_LEN: u32 = 20;
const SECTION_HEADER_LEN: u32 = 40;
const DATA_DIRECTORY_LEN: u32 = 8;
const RESOURCE_DIRECTORY_TABLE_LEN: u32 = 16;
const RESOURCE_DIRECTORY_ENTRY_LEN: u32 = 8;
const RESOURCE_DATA_ENTRY_LEN: u32 = 16;

const NUM_DATA_DIRECTORIES: u32 = 16;
const DIRECTORY_ENTRY_RESOURCE: usize = 2;

const MACHINE_I386: u16 = 0x014c;
const MACHINE_AMD64: u16 = 0x8664;
const PE32_MAGIC: u16 = 0x010b;
const PE32_PLUS_MAGIC: u16 = 0x020b;
const SUBSYSTEM_WINDOWS_GUI: u16 = 2;

const IMAGE_BASE: u64 = 0x40_0000;
const SECTION_ALIGNMENT: u32 = 0x1000;
const FILE_ALIGNMENT: u32 = 0x200;

// The headers are padded out to one file-alignment unit, and the `.rsrc`
// section is the first (and only) section.
const HEADERS_LEN: u32 = FILE_ALIGNMENT;
const RSRC_RVA: u32 = SECTION_ALIGNMENT;
const RSRC_NAME: &[u8; 8] = b".rsrc\0\0\0";
const RSRC_MIN_VIRTUAL_SIZE: u32 = 0x8000;

const SCN_CNT_INITIALIZED_DATA: u32 = 0x0000_0040;
const SCN_MEM_READ: u32 = 0x4000_0000;
const SCN_MEM_WRITE: u32 = 0x8000_0000;

// Set on a directory entry's offset when it points at another directory
// rather than at a data entry.
const SUBDIRECTORY_FLAG: u32 = 0x8000_0000;
const RESOURCE_DIRECTORY_MAJOR_VERSION: u16 = 4;
const LANG_EN_US: u32 = 1033;
const CODEPAGE_WINDOWS_1252: u32 = 1252;

// One directory with a single entry.
const SINGLE_DIRECTORY_LEN: u32 =
    RESOURCE_DIRECTORY_TABLE_LEN + RESOURCE_DIRECTORY_ENTRY_LEN;

// Per resource type: the ID directory, the language directory, and the data
// entry.
const TYPE_SUBTREE_LEN: u32 =
    2 * SINGLE_DIRECTORY_LEN + RESOURCE_DATA_ENTRY_LEN;

//===========================================================================//

/// The two flavors of PE file.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum PeKind {
    /// 32-bit PE for i386.
    Pe32,
    /// 64-bit PE32+ for AMD64.
    Pe32Plus,
}

impl PeKind {
    fn machine(&self) -> u16 {
        match *self {
            PeKind::Pe32 => MACHINE_I386,
            PeKind::Pe32Plus => MACHINE_AMD64,
        }
    }

    fn magic(&self) -> u16 {
        match *self {
            PeKind::Pe32 => PE32_MAGIC,
            PeKind::Pe32Plus => PE32_PLUS_MAGIC,
        }
    }

    /// Returns the size of the optional header, including data directories.
    fn optional_header_len(&self) -> u32 {
        let fixed_len = match *self {
            PeKind::Pe32 => 96,
            PeKind::Pe32Plus => 112,
        };
        fixed_len + NUM_DATA_DIRECTORIES * DATA_DIRECTORY_LEN
    }

    /// Writes a pointer-sized field.
    fn write_address<W: Write>(
        &self,
        mut writer: W,
        value: u64,
    ) -> io::Result<()> {
        match *self {
            PeKind::Pe32 => writer.write_u32::<LittleEndian>(value as u32),
            PeKind::Pe32Plus => writer.write_u64::<LittleEndian>(value),
        }
    }
}

//===========================================================================//

/// Where everything goes in the `.rsrc` section, as offsets from the start of
/// the section.  The fixed emission order is: root directory, icon subtree,
/// group icon subtree, group icon payload, icon payload.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct ResourceLayout {
    icon_id_dir: u32,
    icon_lang_dir: u32,
    icon_data_entry: u32,
    group_icon_id_dir: u32,
    group_icon_lang_dir: u32,
    group_icon_data_entry: u32,
    group_icon: u32,
    icon: u32,
    icon_len: u32,
    section_len: u32,
}

impl ResourceLayout {
    fn new(icon_len: u32) -> io::Result<ResourceLayout> {
        let root_len =
            RESOURCE_DIRECTORY_TABLE_LEN + 2 * RESOURCE_DIRECTORY_ENTRY_LEN;
        let icon_id_dir = root_len;
        let group_icon_id_dir = icon_id_dir + TYPE_SUBTREE_LEN;
        let group_icon = group_icon_id_dir + TYPE_SUBTREE_LEN;
        let icon = group_icon + GROUP_ICON_LEN;
        // SizeOfImage also counts the headers, so that has to fit too.
        let section_len = match icon_len.checked_add(HEADERS_LEN + icon) {
            Some(_) => icon + icon_len,
            None => invalid_input!(
                "Icon too large for a PE resource section (was {} bytes)",
                icon_len
            ),
        };
        Ok(ResourceLayout {
            icon_id_dir,
            icon_lang_dir: icon_id_dir + SINGLE_DIRECTORY_LEN,
            icon_data_entry: icon_id_dir + 2 * SINGLE_DIRECTORY_LEN,
            group_icon_id_dir,
            group_icon_lang_dir: group_icon_id_dir + SINGLE_DIRECTORY_LEN,
            group_icon_data_entry: group_icon_id_dir + 2 * SINGLE_DIRECTORY_LEN,
            group_icon,
            icon,
            icon_len,
            section_len,
        })
    }
}

//===========================================================================//

/// Writes the NT headers, the `.rsrc` section header, padding, and the
/// resource section.  The DOS header must already have been written to `exe`.
pub(crate) fn write_pe<E: Write, I: Write>(
    mut exe: E,
    ico: I,
    dib: &Dib,
    kind: PeKind,
) -> io::Result<()> {
    let icon_len = narrow!(dib.size(), u32, "PE icon resource length");
    let layout = ResourceLayout::new(icon_len)?;
    log::debug!("{:?} resource layout: {:?}", kind, layout);
    exe.write_all(&nt_headers(kind, &layout)?)?;
    exe.write_all(&resource_tree(&layout)?)?;
    write_icon_payloads(exe, ico, dib)
}

/// Encodes everything from the PE signature up to the start of the first
/// section, including the padding.
fn nt_headers(kind: PeKind, layout: &ResourceLayout) -> io::Result<Vec<u8>> {
    let mut headers =
        Vec::with_capacity((HEADERS_LEN - DOS_HEADER_LEN) as usize);
    headers.write_all(PE_SIGNATURE)?;

    // IMAGE_FILE_HEADER:
    headers.write_u16::<LittleEndian>(kind.machine())?;
    headers.write_u16::<LittleEndian>(1)?; // number of sections
    headers.write_u32::<LittleEndian>(0)?; // timestamp
    headers.write_u32::<LittleEndian>(0)?; // symbol table pointer
    headers.write_u32::<LittleEndian>(0)?; // number of symbols
    headers.write_u16::<LittleEndian>(kind.optional_header_len() as u16)?;
    headers.write_u16::<LittleEndian>(0)?; // characteristics
    debug_assert_eq!(headers.len(), (4 + FILE_HEADER_LEN) as usize);

    // IMAGE_OPTIONAL_HEADER32 / IMAGE_OPTIONAL_HEADER64:
    let optional_start = headers.len();
    headers.write_u16::<LittleEndian>(kind.magic())?;
    headers.write_u8(0)?; // major linker version
    headers.write_u8(0)?; // minor linker version
    headers.write_u32::<LittleEndian>(0)?; // size of code
    headers.write_u32::<LittleEndian>(0)?; // size of initialized data
    headers.write_u32::<LittleEndian>(0)?; // size of uninitialized data
    headers.write_u32::<LittleEndian>(0)?; // entry point
    headers.write_u32::<LittleEndian>(0)?; // base of code
    if kind == PeKind::Pe32 {
        headers.write_u32::<LittleEndian>(0)?; // base of data
    }
    kind.write_address(&mut headers, IMAGE_BASE)?;
    headers.write_u32::<LittleEndian>(SECTION_ALIGNMENT)?;
    headers.write_u32::<LittleEndian>(FILE_ALIGNMENT)?;
    headers.write_all(&[0u8; 12])?; // OS, image and subsystem versions
    headers.write_u32::<LittleEndian>(0)?; // Win32 version value
    headers.write_u32::<LittleEndian>(HEADERS_LEN + layout.section_len)?;
    headers.write_u32::<LittleEndian>(HEADERS_LEN)?;
    headers.write_u32::<LittleEndian>(0)?; // checksum
    headers.write_u16::<LittleEndian>(SUBSYSTEM_WINDOWS_GUI)?;
    headers.write_u16::<LittleEndian>(0)?; // DLL characteristics
    for _ in 0..4 {
        // stack reserve/commit, heap reserve/commit
        kind.write_address(&mut headers, 0)?;
    }
    headers.write_u32::<LittleEndian>(0)?; // loader flags
    headers.write_u32::<LittleEndian>(NUM_DATA_DIRECTORIES)?;
    for index in 0..(NUM_DATA_DIRECTORIES as usize) {
        if index == DIRECTORY_ENTRY_RESOURCE {
            headers.write_u32::<LittleEndian>(RSRC_RVA)?;
            headers.write_u32::<LittleEndian>(layout.section_len)?;
        } else {
            headers.write_u64::<LittleEndian>(0)?;
        }
    }
    debug_assert_eq!(
        headers.len() - optional_start,
        kind.optional_header_len() as usize
    );

    // IMAGE_SECTION_HEADER:
    let section_start = headers.len();
    headers.write_all(RSRC_NAME)?;
    headers.write_u32::<LittleEndian>(
        layout.section_len.max(RSRC_MIN_VIRTUAL_SIZE),
    )?;
    headers.write_u32::<LittleEndian>(RSRC_RVA)?;
    headers.write_u32::<LittleEndian>(layout.section_len)?;
    headers.write_u32::<LittleEndian>(HEADERS_LEN)?; // pointer to raw data
    headers.write_u32::<LittleEndian>(0)?; // pointer to relocations
    headers.write_u32::<LittleEndian>(0)?; // pointer to line numbers
    headers.write_u16::<LittleEndian>(0)?; // number of relocations
    headers.write_u16::<LittleEndian>(0)?; // number of line numbers
    headers.write_u32::<LittleEndian>(
        SCN_CNT_INITIALIZED_DATA | SCN_MEM_READ | SCN_MEM_WRITE,
    )?;
    debug_assert_eq!(
        headers.len() - section_start,
        SECTION_HEADER_LEN as usize
    );

    headers.resize((HEADERS_LEN - DOS_HEADER_LEN) as usize, 0);
    Ok(headers)
}

/// Encodes the resource directory tree: everything in the `.rsrc` section
/// before the payloads.
fn resource_tree(layout: &ResourceLayout) -> io::Result<Vec<u8>> {
    let mut tree = Vec::with_capacity(layout.group_icon as usize);

    // Root directory, one entry per resource type:
    write_directory_table(&mut tree, 2)?;
    write_directory_entry(
        &mut tree,
        ResourceType::Icon.number() as u32,
        SUBDIRECTORY_FLAG | layout.icon_id_dir,
    )?;
    write_directory_entry(
        &mut tree,
        ResourceType::GroupIcon.number() as u32,
        SUBDIRECTORY_FLAG | layout.group_icon_id_dir,
    )?;

    // Icon: ID directory, language directory, data entry.
    debug_assert_eq!(tree.len() as u32, layout.icon_id_dir);
    write_type_subtree(
        &mut tree,
        layout.icon_lang_dir,
        layout.icon_data_entry,
        RSRC_RVA + layout.icon,
        layout.icon_len,
    )?;

    // Group icon: ID directory, language directory, data entry.
    debug_assert_eq!(tree.len() as u32, layout.group_icon_id_dir);
    write_type_subtree(
        &mut tree,
        layout.group_icon_lang_dir,
        layout.group_icon_data_entry,
        RSRC_RVA + layout.group_icon,
        GROUP_ICON_LEN,
    )?;

    debug_assert_eq!(tree.len() as u32, layout.group_icon);
    Ok(tree)
}

fn write_type_subtree<W: Write>(
    mut writer: W,
    lang_dir: u32,
    data_entry: u32,
    data_rva: u32,
    data_len: u32,
) -> io::Result<()> {
    write_directory_table(&mut writer, 1)?;
    write_directory_entry(
        &mut writer,
        ICON_RESOURCE_ID as u32,
        SUBDIRECTORY_FLAG | lang_dir,
    )?;
    write_directory_table(&mut writer, 1)?;
    write_directory_entry(&mut writer, LANG_EN_US, data_entry)?;
    // IMAGE_RESOURCE_DATA_ENTRY:
    writer.write_u32::<LittleEndian>(data_rva)?;
    writer.write_u32::<LittleEndian>(data_len)?;
    writer.write_u32::<LittleEndian>(CODEPAGE_WINDOWS_1252)?;
    writer.write_u32::<LittleEndian>(0)?; // reserved
    Ok(())
}

/// Writes an IMAGE_RESOURCE_DIRECTORY with `num_id_entries` ID entries and no
/// named entries.
fn write_directory_table<W: Write>(
    mut writer: W,
    num_id_entries: u16,
) -> io::Result<()> {
    writer.write_u32::<LittleEndian>(0)?; // characteristics
    writer.write_u32::<LittleEndian>(0)?; // timestamp
    writer.write_u16::<LittleEndian>(RESOURCE_DIRECTORY_MAJOR_VERSION)?;
    writer.write_u16::<LittleEndian>(0)?; // minor version
    writer.write_u16::<LittleEndian>(0)?; // named entries
    writer.write_u16::<LittleEndian>(num_id_entries)?;
    Ok(())
}

fn write_directory_entry<W: Write>(
    mut writer: W,
    id: u32,
    offset: u32,
) -> io::Result<()> {
    writer.write_u32::<LittleEndian>(id)?;
    writer.write_u32::<LittleEndian>(offset)?;
    Ok(())
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{nt_headers, resource_tree, PeKind, ResourceLayout};
    use byteorder::{ByteOrder, LittleEndian};

    #[test]
    fn resource_layout_offsets() {
        let layout = ResourceLayout::new(176).unwrap();
        assert_eq!(layout.icon_id_dir, 32);
        assert_eq!(layout.icon_lang_dir, 56);
        assert_eq!(layout.icon_data_entry, 80);
        assert_eq!(layout.group_icon_id_dir, 96);
        assert_eq!(layout.group_icon_lang_dir, 120);
        assert_eq!(layout.group_icon_data_entry, 144);
        assert_eq!(layout.group_icon, 160);
        assert_eq!(layout.icon, 180);
        assert_eq!(layout.section_len, 356);
    }

    #[test]
    fn oversized_icon_is_rejected() {
        assert!(ResourceLayout::new(u32::MAX).is_err());
    }

    #[test]
    fn resource_tree_bytes() {
        let layout = ResourceLayout::new(176).unwrap();
        let tree = resource_tree(&layout).unwrap();
        let expected: &[u8] = b"\
            \x00\x00\x00\x00\x00\x00\x00\x00\x04\x00\x00\x00\x00\x00\x02\x00\
            \x03\x00\x00\x00\x20\x00\x00\x80\
            \x0e\x00\x00\x00\x60\x00\x00\x80\
            \
            \x00\x00\x00\x00\x00\x00\x00\x00\x04\x00\x00\x00\x00\x00\x01\x00\
            \x01\x00\x00\x00\x38\x00\x00\x80\
            \x00\x00\x00\x00\x00\x00\x00\x00\x04\x00\x00\x00\x00\x00\x01\x00\
            \x09\x04\x00\x00\x50\x00\x00\x00\
            \xb4\x10\x00\x00\xb0\x00\x00\x00\xe4\x04\x00\x00\x00\x00\x00\x00\
            \
            \x00\x00\x00\x00\x00\x00\x00\x00\x04\x00\x00\x00\x00\x00\x01\x00\
            \x01\x00\x00\x00\x78\x00\x00\x80\
            \x00\x00\x00\x00\x00\x00\x00\x00\x04\x00\x00\x00\x00\x00\x01\x00\
            \x09\x04\x00\x00\x90\x00\x00\x00\
            \xa0\x10\x00\x00\x14\x00\x00\x00\xe4\x04\x00\x00\x00\x00\x00\x00";
        assert_eq!(tree.as_slice(), expected);
    }

    #[test]
    fn pe32_headers() {
        let layout = ResourceLayout::new(176).unwrap();
        let headers = nt_headers(PeKind::Pe32, &layout).unwrap();
        // Offsets below are relative to the PE signature, which follows the
        // 64-byte DOS header.
        assert_eq!(headers.len(), 0x200 - 64);
        assert_eq!(&headers[..4], b"PE\0\0");
        assert_eq!(LittleEndian::read_u16(&headers[4..]), 0x014c);
        assert_eq!(LittleEndian::read_u16(&headers[6..]), 1);
        assert_eq!(LittleEndian::read_u16(&headers[20..]), 224);
        assert_eq!(LittleEndian::read_u16(&headers[24..]), 0x010b);
        assert_eq!(LittleEndian::read_u32(&headers[24 + 28..]), 0x40_0000);
        assert_eq!(LittleEndian::read_u32(&headers[24 + 32..]), 0x1000);
        assert_eq!(LittleEndian::read_u32(&headers[24 + 36..]), 0x200);
        assert_eq!(LittleEndian::read_u32(&headers[24 + 56..]), 0x200 + 356);
        assert_eq!(LittleEndian::read_u16(&headers[24 + 68..]), 2);
        // Resource data directory:
        assert_eq!(LittleEndian::read_u32(&headers[24 + 96 + 16..]), 0x1000);
        assert_eq!(LittleEndian::read_u32(&headers[24 + 96 + 20..]), 356);
        // Section header:
        let section = &headers[24 + 224..];
        assert_eq!(&section[..8], b".rsrc\0\0\0");
        assert_eq!(LittleEndian::read_u32(&section[8..]), 0x8000);
        assert_eq!(LittleEndian::read_u32(&section[12..]), 0x1000);
        assert_eq!(LittleEndian::read_u32(&section[16..]), 356);
        assert_eq!(LittleEndian::read_u32(&section[20..]), 0x200);
        assert_eq!(LittleEndian::read_u32(&section[36..]), 0xc000_0040);
        assert!(section[40..].iter().all(|&byte| byte == 0));
    }

    #[test]
    fn pe32_plus_headers() {
        let layout = ResourceLayout::new(0x9000).unwrap();
        let headers = nt_headers(PeKind::Pe32Plus, &layout).unwrap();
        assert_eq!(headers.len(), 0x200 - 64);
        assert_eq!(LittleEndian::read_u16(&headers[4..]), 0x8664);
        assert_eq!(LittleEndian::read_u16(&headers[20..]), 240);
        assert_eq!(LittleEndian::read_u16(&headers[24..]), 0x020b);
        assert_eq!(LittleEndian::read_u64(&headers[24 + 24..]), 0x40_0000);
        assert_eq!(LittleEndian::read_u16(&headers[24 + 68..]), 2);
        assert_eq!(LittleEndian::read_u32(&headers[24 + 108..]), 16);
        assert_eq!(
            LittleEndian::read_u32(&headers[24 + 112 + 16..]),
            0x1000
        );
        assert_eq!(
            LittleEndian::read_u32(&headers[24 + 112 + 20..]),
            180 + 0x9000
        );
        let section = &headers[24 + 240..];
        assert_eq!(&section[..8], b".rsrc\0\0\0");
        // Large sections get a virtual size that covers them.
        assert_eq!(LittleEndian::read_u32(&section[8..]), 180 + 0x9000);
    }
}

//===========================================================================//
