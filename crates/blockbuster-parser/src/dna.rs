use crate::error::{BlockbusterError, Result};
use crate::header::BlendFileHeader;
use std::collections::HashMap;

/// A field name as written in SDNA, e.g. `*mat`, `**mat`, `name[66]`, `(*func)()`
#[derive(Debug, Clone)]
pub struct DnaName {
    pub name_full: String,
    pub name_only: String,
    pub is_pointer: bool,
    pub is_method_pointer: bool,
    pub array_size: usize,
}

#[derive(Debug, Clone)]
pub struct DnaField {
    pub type_name: String,
    pub name: DnaName,
    pub size: usize,
    pub offset: usize,
}

#[derive(Debug, Clone)]
pub struct DnaStruct {
    pub type_name: String,
    pub size: usize,
    pub fields: Vec<DnaField>,
    fields_by_name: HashMap<String, usize>,
}

/// The SDNA catalogue of a file: every struct layout the file was written with
#[derive(Debug)]
pub struct DnaCollection {
    pub structs: Vec<DnaStruct>,
    struct_index: HashMap<String, usize>,
    pub types: Vec<String>,
    pub names: Vec<DnaName>,
    pub type_sizes: Vec<u16>,
}

impl DnaName {
    pub(crate) fn new(name_full: String) -> Self {
        let bytes = name_full.as_bytes();
        let is_pointer = bytes.contains(&b'*');
        let is_method_pointer = name_full.contains("(*");

        let start = bytes
            .iter()
            .rposition(|&b| b == b'*')
            .map(|i| i + 1)
            .unwrap_or(0);

        let end = if is_method_pointer {
            bytes.iter().position(|&b| b == b')').unwrap_or(bytes.len())
        } else {
            bytes
                .iter()
                .position(|&b| b == b'[')
                .unwrap_or(bytes.len())
        };
        let end = if end < start { bytes.len() } else { end };
        let name_only = String::from_utf8_lossy(&bytes[start..end]).into_owned();

        DnaName {
            array_size: array_size(bytes),
            name_full,
            name_only,
            is_pointer,
            is_method_pointer,
        }
    }
}

/// Product of every `[N]` dimension, 1 for scalars
fn array_size(bytes: &[u8]) -> usize {
    let mut result = 1;
    let mut rest = bytes;
    while let Some(open) = rest.iter().position(|&b| b == b'[') {
        let after = &rest[open + 1..];
        let Some(close) = after.iter().position(|&b| b == b']') else {
            break;
        };
        if let Some(size) = std::str::from_utf8(&after[..close])
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
        {
            result *= size;
        }
        rest = &after[close + 1..];
    }
    result
}

impl DnaStruct {
    fn new(type_name: String, size: usize) -> Self {
        DnaStruct {
            type_name,
            size,
            fields: Vec::new(),
            fields_by_name: HashMap::new(),
        }
    }

    fn add_field(&mut self, field: DnaField) {
        let field_index = self.fields.len();
        self.fields_by_name
            .entry(field.name.name_only.clone())
            .or_insert(field_index);
        self.fields.push(field);
    }

    pub fn find_field(&self, name: &str) -> Option<&DnaField> {
        self.fields_by_name
            .get(name)
            .map(|&index| &self.fields[index])
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields_by_name.contains_key(name)
    }
}

impl DnaCollection {
    /// Parse the payload of a `DNA1` block.
    ///
    /// Sections after `NAME` start on 4-byte boundaries relative to the payload start.
    pub fn parse(data: &[u8], header: &BlendFileHeader) -> Result<Self> {
        let mut cursor = DnaCursor {
            data,
            pos: 0,
            little_endian: header.is_little_endian,
        };

        cursor.expect_marker(b"SDNA")?;
        cursor.expect_marker(b"NAME")?;
        let names_count = cursor.read_u32()? as usize;
        let mut names = Vec::with_capacity(names_count.min(data.len()));
        for _ in 0..names_count {
            names.push(DnaName::new(cursor.read_cstring()?));
        }

        cursor.align4();
        cursor.expect_marker(b"TYPE")?;
        let types_count = cursor.read_u32()? as usize;
        let mut types = Vec::with_capacity(types_count.min(data.len()));
        for _ in 0..types_count {
            types.push(cursor.read_cstring()?);
        }

        cursor.align4();
        cursor.expect_marker(b"TLEN")?;
        let mut type_sizes = Vec::with_capacity(types.len());
        for _ in 0..types.len() {
            type_sizes.push(cursor.read_u16()?);
        }

        cursor.align4();
        cursor.expect_marker(b"STRC")?;
        let struct_count = cursor.read_u32()? as usize;
        let mut structs = Vec::with_capacity(struct_count.min(data.len()));

        for _ in 0..struct_count {
            let struct_type_index = cursor.read_u16()? as usize;
            let field_count = cursor.read_u16()? as usize;

            let type_name = types.get(struct_type_index).cloned().ok_or_else(|| {
                BlockbusterError::parser_dna_error(format!(
                    "Invalid struct type index: {struct_type_index}"
                ))
            })?;
            let mut dna_struct = DnaStruct::new(type_name, type_sizes[struct_type_index] as usize);

            let mut field_offset = 0;
            for _ in 0..field_count {
                let field_type_index = cursor.read_u16()? as usize;
                let field_name_index = cursor.read_u16()? as usize;

                let field_type_name = types.get(field_type_index).cloned().ok_or_else(|| {
                    BlockbusterError::parser_dna_error(format!(
                        "Invalid field type index: {field_type_index}"
                    ))
                })?;
                let field_name = names.get(field_name_index).cloned().ok_or_else(|| {
                    BlockbusterError::parser_dna_error(format!(
                        "Invalid field name index: {field_name_index}"
                    ))
                })?;

                let field_size = if field_name.is_pointer {
                    header.pointer_size as usize * field_name.array_size
                } else {
                    type_sizes[field_type_index] as usize * field_name.array_size
                };

                dna_struct.add_field(DnaField {
                    type_name: field_type_name,
                    name: field_name,
                    size: field_size,
                    offset: field_offset,
                });
                field_offset += field_size;
            }

            structs.push(dna_struct);
        }

        let struct_index = structs
            .iter()
            .enumerate()
            .map(|(i, s)| (s.type_name.clone(), i))
            .collect();

        log::debug!(
            "Parsed SDNA: {} names, {} types, {} structs",
            names.len(),
            types.len(),
            structs.len()
        );

        Ok(DnaCollection {
            structs,
            struct_index,
            types,
            names,
            type_sizes,
        })
    }

    pub fn get_struct(&self, index: usize) -> Option<&DnaStruct> {
        self.structs.get(index)
    }

    pub fn find_struct(&self, name: &str) -> Option<&DnaStruct> {
        self.struct_index
            .get(name)
            .and_then(|&index| self.structs.get(index))
    }
}

struct DnaCursor<'a> {
    data: &'a [u8],
    pos: usize,
    little_endian: bool,
}

impl<'a> DnaCursor<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(len).filter(|&end| end <= self.data.len());
        let Some(end) = end else {
            return Err(BlockbusterError::parser_dna_error(format!(
                "SDNA truncated at offset {}",
                self.pos
            )));
        };
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn expect_marker(&mut self, marker: &[u8; 4]) -> Result<()> {
        let found = self.take(4)?;
        if found != marker {
            return Err(BlockbusterError::parser_dna_error(format!(
                "Expected {} marker, got: {:?}",
                String::from_utf8_lossy(marker),
                String::from_utf8_lossy(found)
            )));
        }
        Ok(())
    }

    fn align4(&mut self) {
        self.pos = (self.pos + 3) & !3;
    }

    fn read_u16(&mut self) -> Result<u16> {
        let slice = self.take(2)?;
        let bytes = [slice[0], slice[1]];
        Ok(if self.little_endian {
            u16::from_le_bytes(bytes)
        } else {
            u16::from_be_bytes(bytes)
        })
    }

    fn read_u32(&mut self) -> Result<u32> {
        let slice = self.take(4)?;
        let bytes = [slice[0], slice[1], slice[2], slice[3]];
        Ok(if self.little_endian {
            u32::from_le_bytes(bytes)
        } else {
            u32::from_be_bytes(bytes)
        })
    }

    fn read_cstring(&mut self) -> Result<String> {
        let rest = &self.data[self.pos.min(self.data.len())..];
        let Some(len) = rest.iter().position(|&b| b == 0) else {
            return Err(BlockbusterError::parser_dna_error(
                "Unterminated string in SDNA",
            ));
        };
        let s = String::from_utf8_lossy(&rest[..len]).into_owned();
        self.pos += len + 1;
        Ok(s)
    }
}
