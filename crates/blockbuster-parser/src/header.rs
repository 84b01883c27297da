use crate::error::{BlockbusterError, Result};
use std::io::{Read, Seek, SeekFrom};

/// File header of a .blend file
///
/// Two layouts exist:
/// - legacy 12 bytes: `BLENDER` + pointer size (`_`/`-`) + endianness (`v`/`V`) + 3-digit version
/// - 17 bytes (Blender 5.0+): `BLENDER17-01v` + 4-digit version, always 8-byte pointers and little endian
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlendFileHeader {
    pub file_format_version: u32,
    pub pointer_size: u8,
    pub is_little_endian: bool,
    pub version: u32,
}

impl BlendFileHeader {
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        reader.seek(SeekFrom::Start(0))?;

        let mut magic = [0u8; 7];
        reader.read_exact(&mut magic)?;
        if &magic != b"BLENDER" {
            return Err(BlockbusterError::blend_file(
                format!("Invalid magic bytes: {magic:?}"),
                crate::BlendFileErrorKind::InvalidMagic,
            ));
        }

        let byte_7 = read_byte(reader)?;
        if byte_7 == b'_' || byte_7 == b'-' {
            let pointer_size = if byte_7 == b'_' { 4 } else { 8 };
            let is_little_endian = match read_byte(reader)? {
                b'v' => true,
                b'V' => false,
                other => {
                    return Err(BlockbusterError::parser_invalid_header(format!(
                        "Invalid endian indicator: {}",
                        other as char
                    )));
                }
            };

            let mut version_bytes = [0u8; 3];
            reader.read_exact(&mut version_bytes)?;

            return Ok(BlendFileHeader {
                file_format_version: 0,
                pointer_size,
                is_little_endian,
                version: parse_digits(&version_bytes, "version")?,
            });
        }

        let byte_8 = read_byte(reader)?;
        let header_size = parse_digits(&[byte_7, byte_8], "header size")?;
        if header_size != 17 {
            return Err(BlockbusterError::parser_invalid_header(format!(
                "Unknown header size: {header_size}"
            )));
        }

        if read_byte(reader)? != b'-' {
            return Err(BlockbusterError::parser_invalid_header(
                "Expected '-' separator",
            ));
        }

        let mut format_bytes = [0u8; 2];
        reader.read_exact(&mut format_bytes)?;
        let file_format_version = parse_digits(&format_bytes, "file format version")?;
        if file_format_version != 1 {
            return Err(BlockbusterError::blend_file(
                format!("Unsupported file format version: {file_format_version}"),
                crate::BlendFileErrorKind::UnsupportedVersion,
            ));
        }

        if read_byte(reader)? != b'v' {
            return Err(BlockbusterError::parser_invalid_header(
                "Expected 'v' endian indicator",
            ));
        }

        let mut version_bytes = [0u8; 4];
        reader.read_exact(&mut version_bytes)?;

        Ok(BlendFileHeader {
            file_format_version,
            pointer_size: 8,
            is_little_endian: true,
            version: parse_digits(&version_bytes, "version")?,
        })
    }

    pub fn header_size(&self) -> usize {
        if self.file_format_version == 0 {
            12
        } else {
            17
        }
    }

    pub fn is_legacy(&self) -> bool {
        self.file_format_version == 0
    }
}

fn read_byte<R: Read>(reader: &mut R) -> Result<u8> {
    let mut byte = [0u8; 1];
    reader.read_exact(&mut byte)?;
    Ok(byte[0])
}

fn parse_digits(bytes: &[u8], what: &str) -> Result<u32> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .ok_or_else(|| BlockbusterError::parser_invalid_header(format!("Invalid {what}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_legacy_header() {
        let mut cursor = Cursor::new(b"BLENDER-v279REND".to_vec());
        let header = BlendFileHeader::read(&mut cursor).unwrap();
        assert_eq!(header.pointer_size, 8);
        assert!(header.is_little_endian);
        assert_eq!(header.version, 279);
        assert_eq!(header.header_size(), 12);
        assert!(header.is_legacy());
    }

    #[test]
    fn test_legacy_header_32bit_big_endian() {
        let mut cursor = Cursor::new(b"BLENDER_V249".to_vec());
        let header = BlendFileHeader::read(&mut cursor).unwrap();
        assert_eq!(header.pointer_size, 4);
        assert!(!header.is_little_endian);
        assert_eq!(header.version, 249);
    }

    #[test]
    fn test_v1_header() {
        let mut cursor = Cursor::new(b"BLENDER17-01v0500".to_vec());
        let header = BlendFileHeader::read(&mut cursor).unwrap();
        assert_eq!(header.file_format_version, 1);
        assert_eq!(header.pointer_size, 8);
        assert_eq!(header.version, 500);
        assert_eq!(header.header_size(), 17);
    }

    #[test]
    fn test_invalid_magic() {
        let mut cursor = Cursor::new(b"NOTBLEND-v300".to_vec());
        let err = BlendFileHeader::read(&mut cursor).unwrap_err();
        assert_eq!(
            err.blend_file_kind(),
            Some(&crate::BlendFileErrorKind::InvalidMagic)
        );
    }

    #[test]
    fn test_invalid_endian_indicator() {
        let mut cursor = Cursor::new(b"BLENDER-x300".to_vec());
        assert!(BlendFileHeader::read(&mut cursor).is_err());
    }
}
