use crate::dib::Dib;
use crate::dos::DOS_HEADER_LEN;
use crate::icondir::{write_icon_payloads, GROUP_ICON_LEN, ICON_RESOURCE_ID};
use crate::restype::ResourceType;
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{self, Write};

//===========================================================================//

const NE_SIGNATURE: &[u8; 2] = b"NE";

// Structure sizes, in bytes:
const NE_HEADER_LEN: u32 = 64;
const NE_RESOURCE_TABLE_HEADER_LEN: u32 = 2;
const NE_TYPE_INFO_LEN: u32 = 8;
const NE_NAME_INFO_LEN: u32 = 12;
const NE_RESIDENT_NAME_TABLE_LEN: u32 = 4;

// Two TYPEINFO records (each followed by its one NAMEINFO record) plus the
// terminating TYPEINFO record.
const NE_RESOURCE_TABLE_LEN: u32 = NE_RESOURCE_TABLE_HEADER_LEN
    + 3 * NE_TYPE_INFO_LEN
    + 2 * NE_NAME_INFO_LEN;

// Resource data offsets are stored in units of 1 << NE_ALIGNMENT_SHIFT bytes.
const NE_ALIGNMENT_SHIFT: u16 = 1;

// Set on type and resource IDs that are integers rather than string offsets.
const NE_INTEGER_ID: u16 = 0x8000;

// Moveable, pure and discardable.
const NE_RESOURCE_FLAGS: u16 = 0x1c10;

// Target operating system: Windows.
const NE_TARGET_WINDOWS: u8 = 2;

//===========================================================================//

/// Where everything goes in an NE file.  The resource and resident-name table
/// offsets are relative to the NE header; the payload offsets are relative to
/// the start of the file.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct NeLayout {
    resource_table: u16,
    resident_name_table: u16,
    group_icon: u32,
    icon: u32,
}

impl NeLayout {
    const fn new() -> NeLayout {
        let headers_len = DOS_HEADER_LEN
            + NE_HEADER_LEN
            + NE_RESOURCE_TABLE_LEN
            + NE_RESIDENT_NAME_TABLE_LEN;
        NeLayout {
            resource_table: NE_HEADER_LEN as u16,
            resident_name_table: (NE_HEADER_LEN + NE_RESOURCE_TABLE_LEN)
                as u16,
            group_icon: headers_len,
            icon: headers_len + GROUP_ICON_LEN,
        }
    }
}

//===========================================================================//

/// Writes the NE header, resource table, resident-name table and both icon
/// payloads.  The DOS header must already have been written to `exe`.
pub(crate) fn write_ne<E: Write, I: Write>(
    mut exe: E,
    ico: I,
    dib: &Dib,
) -> io::Result<()> {
    let layout = NeLayout::new();
    log::debug!("NE16 layout: {:?}", layout);
    let icon_len = narrow!(dib.size(), u16, "NE icon resource length");
    exe.write_all(&ne_header(&layout)?)?;
    exe.write_all(&resource_table(&layout, icon_len)?)?;
    exe.write_all(&[0u8; NE_RESIDENT_NAME_TABLE_LEN as usize])?;
    write_icon_payloads(exe, ico, dib)
}

fn ne_header(layout: &NeLayout) -> io::Result<Vec<u8>> {
    let mut header = Vec::with_capacity(NE_HEADER_LEN as usize);
    header.write_all(NE_SIGNATURE)?;
    header.write_u8(0)?; // major linker version
    header.write_u8(0)?; // minor linker version
    header.write_u16::<LittleEndian>(0)?; // entry table offset
    header.write_u16::<LittleEndian>(0)?; // entry table length
    header.write_u32::<LittleEndian>(0)?; // file load CRC
    header.write_u16::<LittleEndian>(0)?; // flags
    header.write_u16::<LittleEndian>(0)?; // automatic data segment
    header.write_u16::<LittleEndian>(0)?; // initial heap
    header.write_u16::<LittleEndian>(0)?; // initial stack
    header.write_u32::<LittleEndian>(0)?; // CS:IP
    header.write_u32::<LittleEndian>(0)?; // SS:SP
    header.write_u16::<LittleEndian>(0)?; // segment count
    header.write_u16::<LittleEndian>(0)?; // module reference count
    header.write_u16::<LittleEndian>(0)?; // non-resident name table size
    header.write_u16::<LittleEndian>(0)?; // segment table offset
    header.write_u16::<LittleEndian>(layout.resource_table)?;
    header.write_u16::<LittleEndian>(layout.resident_name_table)?;
    header.write_u16::<LittleEndian>(0)?; // module reference table offset
    header.write_u16::<LittleEndian>(0)?; // imported names table offset
    header.write_u32::<LittleEndian>(0)?; // non-resident name table offset
    header.write_u16::<LittleEndian>(0)?; // movable entry count
    header.write_u16::<LittleEndian>(0)?; // segment alignment shift
    header.write_u16::<LittleEndian>(0)?; // resource segment count
    header.write_u8(NE_TARGET_WINDOWS)?;
    header.resize(NE_HEADER_LEN as usize, 0);
    Ok(header)
}

fn resource_table(layout: &NeLayout, icon_len: u16) -> io::Result<Vec<u8>> {
    let mut table = Vec::with_capacity(NE_RESOURCE_TABLE_LEN as usize);
    table.write_u16::<LittleEndian>(NE_ALIGNMENT_SHIFT)?;
    write_type_info(&mut table, ResourceType::Icon)?;
    write_name_info(&mut table, layout.icon, icon_len)?;
    write_type_info(&mut table, ResourceType::GroupIcon)?;
    write_name_info(&mut table, layout.group_icon, GROUP_ICON_LEN as u16)?;
    table.write_all(&[0u8; NE_TYPE_INFO_LEN as usize])?; // end of table
    debug_assert_eq!(table.len(), NE_RESOURCE_TABLE_LEN as usize);
    Ok(table)
}

fn write_type_info<W: Write>(
    mut writer: W,
    restype: ResourceType,
) -> io::Result<()> {
    writer.write_u16::<LittleEndian>(NE_INTEGER_ID | restype.number())?;
    writer.write_u16::<LittleEndian>(1)?; // resource count
    writer.write_u32::<LittleEndian>(0)?; // reserved
    Ok(())
}

fn write_name_info<W: Write>(
    mut writer: W,
    offset: u32,
    length: u16,
) -> io::Result<()> {
    debug_assert_eq!(offset % (1 << NE_ALIGNMENT_SHIFT), 0);
    let shifted = narrow!(offset >> NE_ALIGNMENT_SHIFT, u16, "NE data offset");
    writer.write_u16::<LittleEndian>(shifted)?;
    writer.write_u16::<LittleEndian>(length)?;
    writer.write_u16::<LittleEndian>(NE_RESOURCE_FLAGS)?;
    writer.write_u16::<LittleEndian>(NE_INTEGER_ID | ICON_RESOURCE_ID)?;
    writer.write_u32::<LittleEndian>(0)?; // reserved
    Ok(())
}

//===========================================================================//


//===========================================================================//
