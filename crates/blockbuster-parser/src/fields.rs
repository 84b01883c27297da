use crate::{BlockbusterError, DnaCollection, DnaField, Result};

/// Utilities for reading structured data from block data using DNA information
pub struct FieldReader<'a> {
    pub data: &'a [u8],
    pub dna: &'a DnaCollection,
    pub pointer_size: usize,
    pub is_little_endian: bool,
}

impl<'a> FieldReader<'a> {
    pub fn new(
        data: &'a [u8],
        dna: &'a DnaCollection,
        pointer_size: usize,
        is_little_endian: bool,
    ) -> Self {
        Self {
            data,
            dna,
            pointer_size,
            is_little_endian,
        }
    }

    fn bytes<const N: usize>(&self, offset: usize) -> Result<[u8; N]> {
        let end = offset.checked_add(N).filter(|&end| end <= self.data.len());
        let Some(end) = end else {
            return Err(BlockbusterError::parser_invalid_field(format!(
                "Offset {} + {} exceeds data length {}",
                offset,
                N,
                self.data.len()
            )));
        };
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(&self.data[offset..end]);
        Ok(bytes)
    }

    /// Read a pointer value from the given offset
    pub fn read_pointer(&self, offset: usize) -> Result<u64> {
        if self.pointer_size == 8 {
            self.read_u64(offset)
        } else {
            self.read_u32(offset).map(|v| v as u64)
        }
    }

    pub fn read_u8(&self, offset: usize) -> Result<u8> {
        Ok(self.bytes::<1>(offset)?[0])
    }

    pub fn read_i16(&self, offset: usize) -> Result<i16> {
        let bytes = self.bytes::<2>(offset)?;
        Ok(if self.is_little_endian {
            i16::from_le_bytes(bytes)
        } else {
            i16::from_be_bytes(bytes)
        })
    }

    pub fn read_u16(&self, offset: usize) -> Result<u16> {
        let bytes = self.bytes::<2>(offset)?;
        Ok(if self.is_little_endian {
            u16::from_le_bytes(bytes)
        } else {
            u16::from_be_bytes(bytes)
        })
    }

    pub fn read_i32(&self, offset: usize) -> Result<i32> {
        let bytes = self.bytes::<4>(offset)?;
        Ok(if self.is_little_endian {
            i32::from_le_bytes(bytes)
        } else {
            i32::from_be_bytes(bytes)
        })
    }

    /// Read a 32-bit unsigned integer
    pub fn read_u32(&self, offset: usize) -> Result<u32> {
        let bytes = self.bytes::<4>(offset)?;
        Ok(if self.is_little_endian {
            u32::from_le_bytes(bytes)
        } else {
            u32::from_be_bytes(bytes)
        })
    }

    /// Read a 64-bit unsigned integer
    pub fn read_u64(&self, offset: usize) -> Result<u64> {
        let bytes = self.bytes::<8>(offset)?;
        Ok(if self.is_little_endian {
            u64::from_le_bytes(bytes)
        } else {
            u64::from_be_bytes(bytes)
        })
    }

    /// Look up a field definition by struct and field name
    pub fn find_field(&self, struct_name: &str, field_name: &str) -> Result<&'a DnaField> {
        let struct_def = self.dna.find_struct(struct_name).ok_or_else(|| {
            BlockbusterError::parser_invalid_field(format!("Struct {struct_name} not found"))
        })?;

        struct_def.find_field(field_name).ok_or_else(|| {
            BlockbusterError::parser_invalid_field(format!(
                "Field {field_name} not found in struct {struct_name}"
            ))
        })
    }

    /// Whether the file's DNA declares `struct_name.field_name`
    pub fn has_field(&self, struct_name: &str, field_name: &str) -> bool {
        self.dna
            .find_struct(struct_name)
            .is_some_and(|s| s.has_field(field_name))
    }

    /// Read a pointer field by name
    pub fn read_field_pointer(&self, struct_name: &str, field_name: &str) -> Result<u64> {
        let field = self.find_field(struct_name, field_name)?;
        self.read_pointer(field.offset)
    }

    /// Read an integer field of any DNA integer type, widened to i64
    pub fn read_field_int(&self, struct_name: &str, field_name: &str) -> Result<i64> {
        let field = self.find_field(struct_name, field_name)?;
        let offset = field.offset;
        let value = match field.type_name.as_str() {
            "char" | "uchar" | "uint8_t" => self.read_u8(offset)? as i64,
            "int8_t" => self.read_u8(offset)? as i8 as i64,
            "short" | "int16_t" => self.read_i16(offset)? as i64,
            "ushort" | "uint16_t" => self.read_u16(offset)? as i64,
            "int" | "int32_t" => self.read_i32(offset)? as i64,
            "uint" | "uint32_t" => self.read_u32(offset)? as i64,
            "int64_t" | "uint64_t" | "long" | "ulong" => self.read_u64(offset)? as i64,
            other => {
                return Err(BlockbusterError::parser_invalid_field(format!(
                    "Field {struct_name}.{field_name} has non-integer type {other}"
                )));
            }
        };
        Ok(value)
    }

    /// Read a field value as u32
    pub fn read_field_u32(&self, struct_name: &str, field_name: &str) -> Result<u32> {
        let value = self.read_field_int(struct_name, field_name)?;
        u32::try_from(value).map_err(|_| {
            BlockbusterError::parser_invalid_field(format!(
                "Field {struct_name}.{field_name} value {value} does not fit in u32"
            ))
        })
    }

    /// Read a field as a string (for character arrays like name[66])
    pub fn read_field_string(&self, struct_name: &str, field_name: &str) -> Result<String> {
        let field = self.find_field(struct_name, field_name)?;
        let bytes = self.field_bytes(field)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }

    /// Read every pointer of a pointer-array field such as `*mtex[18]`
    pub fn read_field_pointer_array(&self, struct_name: &str, field_name: &str) -> Result<Vec<u64>> {
        let field = self.find_field(struct_name, field_name)?;
        if !field.name.is_pointer {
            return Err(BlockbusterError::parser_invalid_field(format!(
                "Field {struct_name}.{field_name} is not a pointer"
            )));
        }
        (0..field.name.array_size)
            .map(|i| self.read_pointer(field.offset + i * self.pointer_size))
            .collect()
    }

    /// Read `first` of an embedded `ListBase` field; `first` sits at the field offset
    pub fn read_field_listbase_first(&self, struct_name: &str, field_name: &str) -> Result<u64> {
        let field = self.find_field(struct_name, field_name)?;
        if field.type_name != "ListBase" {
            return Err(BlockbusterError::parser_invalid_field(format!(
                "Field {struct_name}.{field_name} is not a ListBase"
            )));
        }
        self.read_pointer(field.offset)
    }

    fn field_bytes(&self, field: &DnaField) -> Result<&'a [u8]> {
        let end = field.offset + field.size;
        if end > self.data.len() {
            return Err(BlockbusterError::parser_invalid_field(format!(
                "Field data exceeds block bounds: offset {} + size {} > {}",
                field.offset,
                field.size,
                self.data.len()
            )));
        }
        Ok(&self.data[field.offset..end])
    }
}
