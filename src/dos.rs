use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{self, Write};

//===========================================================================//

// The size of an IMAGE_DOS_HEADER struct, in bytes.
pub(crate) const DOS_HEADER_LEN: u32 = 64;

const MZ_SIGNATURE: &[u8; 2] = b"MZ";

// The offset of the e_lfanew field, which points at the NE or PE header.
const NEW_HEADER_ADDR_OFFSET: usize = 0x3c;

//===========================================================================//

/// Writes an MZ header with no DOS program.  The only meaningful field is the
/// address of the new-style header, which immediately follows.
pub(crate) fn write_dos_header<W: Write>(mut writer: W) -> io::Result<()> {
    let mut header = Vec::with_capacity(DOS_HEADER_LEN as usize);
    header.write_all(MZ_SIGNATURE)?;
    header.resize(NEW_HEADER_ADDR_OFFSET, 0);
    header.write_u32::<LittleEndian>(DOS_HEADER_LEN)?;
    debug_assert_eq!(header.len(), DOS_HEADER_LEN as usize);
    writer.write_all(&header)
}

//===========================================================================//


//===========================================================================//
