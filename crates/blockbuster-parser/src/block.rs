use crate::error::Result;
use crate::header::BlendFileHeader;
use std::io::Read;

/// Code of the block that terminates a .blend file
pub const END_BLOCK_CODE: [u8; 4] = *b"ENDB";
/// Code of the block holding the SDNA catalogue
pub const DNA_BLOCK_CODE: [u8; 4] = *b"DNA1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub code: [u8; 4],
    pub size: u64,
    pub old_address: u64,
    pub sdna_index: u32,
    pub count: u32,
}

#[derive(Debug, Clone)]
pub struct BlendFileBlock {
    /// Parsed header fields
    pub header: BlockHeader,
    /// Offset in the file where the block's raw data starts
    pub data_offset: u64,
    /// Offset in the file where this block header starts (for diagnostics)
    pub header_offset: u64,
}

impl BlockHeader {
    /// Read a block header in whichever layout the file header announces
    pub fn read<R: Read>(reader: &mut R, file_header: &BlendFileHeader) -> Result<Self> {
        let mut code = [0u8; 4];
        reader.read_exact(&mut code)?;
        let le = file_header.is_little_endian;

        if file_header.file_format_version == 1 {
            let sdna_index = read_u32(reader, le)?;
            let old_address = read_u64(reader, le)?;
            let size = read_u64(reader, le)?;
            let count = read_u64(reader, le)? as u32;

            Ok(BlockHeader {
                code,
                size,
                old_address,
                sdna_index,
                count,
            })
        } else {
            let size = read_u32(reader, le)? as u64;
            let old_address = if file_header.pointer_size == 4 {
                read_u32(reader, le)? as u64
            } else {
                read_u64(reader, le)?
            };
            let sdna_index = read_u32(reader, le)?;
            let count = read_u32(reader, le)?;

            Ok(BlockHeader {
                code,
                size,
                old_address,
                sdna_index,
                count,
            })
        }
    }

    pub fn is_end_block(&self) -> bool {
        self.code == END_BLOCK_CODE
    }

    pub fn is_dna_block(&self) -> bool {
        self.code == DNA_BLOCK_CODE
    }

    /// Two-letter ID codes are padded with NULs (`b"ME\0\0"`)
    pub fn is_id_code(&self) -> bool {
        self.code[2] == 0 && self.code[3] == 0 && self.code[0].is_ascii_uppercase()
    }
}

/// Render a block code without its NUL padding (`b"ME\0\0"` -> `"ME"`)
pub fn block_code_to_string(code: [u8; 4]) -> String {
    let end = code.iter().position(|&b| b == 0).unwrap_or(code.len());
    String::from_utf8_lossy(&code[..end]).into_owned()
}

fn read_u32<R: Read>(reader: &mut R, is_little_endian: bool) -> Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(if is_little_endian {
        u32::from_le_bytes(buf)
    } else {
        u32::from_be_bytes(buf)
    })
}

fn read_u64<R: Read>(reader: &mut R, is_little_endian: bool) -> Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(if is_little_endian {
        u64::from_le_bytes(buf)
    } else {
        u64::from_be_bytes(buf)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn legacy_header(pointer_size: u8) -> BlendFileHeader {
        BlendFileHeader {
            file_format_version: 0,
            pointer_size,
            is_little_endian: true,
            version: 279,
        }
    }

    #[test]
    fn test_read_64bit_legacy_block_header() {
        let mut bytes = b"ME\0\0".to_vec();
        bytes.extend_from_slice(&96u32.to_le_bytes());
        bytes.extend_from_slice(&0x1000u64.to_le_bytes());
        bytes.extend_from_slice(&12u32.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());

        let header = BlockHeader::read(&mut Cursor::new(bytes), &legacy_header(8)).unwrap();
        assert_eq!(header.code, *b"ME\0\0");
        assert_eq!(header.size, 96);
        assert_eq!(header.old_address, 0x1000);
        assert_eq!(header.sdna_index, 12);
        assert_eq!(header.count, 1);
        assert!(header.is_id_code());
    }

    #[test]
    fn test_read_32bit_legacy_block_header() {
        let mut bytes = b"DATA".to_vec();
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&0xBEEFu32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&2u32.to_le_bytes());

        let header = BlockHeader::read(&mut Cursor::new(bytes), &legacy_header(4)).unwrap();
        assert_eq!(header.old_address, 0xBEEF);
        assert_eq!(header.count, 2);
        assert!(!header.is_id_code());
    }

    #[test]
    fn test_block_code_to_string() {
        assert_eq!(block_code_to_string(*b"ME\0\0"), "ME");
        assert_eq!(block_code_to_string(*b"DNA1"), "DNA1");
    }
}
