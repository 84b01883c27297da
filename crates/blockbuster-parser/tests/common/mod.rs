//! Writer for minimal synthetic .blend files (64-bit pointers, little endian)

#![allow(dead_code)]

use std::collections::HashMap;

struct StructLayout {
    type_index: u16,
    fields: Vec<(u16, u16)>,
    offsets: HashMap<String, usize>,
}

struct RawBlock {
    code: [u8; 4],
    sdna_index: u32,
    address: u64,
    count: u32,
    data: Vec<u8>,
}

pub struct BlendBuilder {
    pointer_size: usize,
    types: Vec<(String, u16)>,
    names: Vec<String>,
    structs: Vec<StructLayout>,
    struct_by_name: HashMap<String, usize>,
    blocks: Vec<RawBlock>,
    next_address: u64,
}

impl Default for BlendBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BlendBuilder {
    pub fn new() -> Self {
        let mut builder = BlendBuilder {
            pointer_size: 8,
            types: Vec::new(),
            names: Vec::new(),
            structs: Vec::new(),
            struct_by_name: HashMap::new(),
            blocks: Vec::new(),
            next_address: 0x1000,
        };
        for (name, size) in [
            ("char", 1),
            ("uchar", 1),
            ("short", 2),
            ("ushort", 2),
            ("int", 4),
            ("float", 4),
            ("int64_t", 8),
            ("void", 0),
        ] {
            builder.types.push((name.to_string(), size));
        }
        builder
    }

    fn type_index(&mut self, name: &str) -> u16 {
        if let Some(i) = self.types.iter().position(|(t, _)| t == name) {
            return i as u16;
        }
        self.types.push((name.to_string(), 0));
        (self.types.len() - 1) as u16
    }

    fn name_index(&mut self, name: &str) -> u16 {
        if let Some(i) = self.names.iter().position(|n| n == name) {
            return i as u16;
        }
        self.names.push(name.to_string());
        (self.names.len() - 1) as u16
    }

    /// Declare a struct; field types must be primitives or structs declared earlier
    pub fn add_struct(&mut self, name: &str, fields: &[(&str, &str)]) -> u32 {
        let type_index = self.type_index(name);
        let mut offset = 0usize;
        let mut field_indices = Vec::new();
        let mut offsets = HashMap::new();

        for (field_type, field_name) in fields {
            let t = self.type_index(field_type);
            let n = self.name_index(field_name);
            field_indices.push((t, n));

            let is_pointer = field_name.contains('*');
            let array = array_len(field_name);
            let size = if is_pointer {
                self.pointer_size * array
            } else {
                self.types[t as usize].1 as usize * array
            };
            offsets.insert(bare_name(field_name), offset);
            offset += size;
        }

        self.types[type_index as usize].1 = offset as u16;
        self.structs.push(StructLayout {
            type_index,
            fields: field_indices,
            offsets,
        });
        let sdna = self.structs.len() - 1;
        self.struct_by_name.insert(name.to_string(), sdna);
        sdna as u32
    }

    pub fn struct_size(&self, name: &str) -> usize {
        let layout = &self.structs[self.struct_by_name[name]];
        self.types[layout.type_index as usize].1 as usize
    }

    pub fn offset(&self, struct_name: &str, field: &str) -> usize {
        self.structs[self.struct_by_name[struct_name]].offsets[field]
    }

    pub fn sdna_index(&self, struct_name: &str) -> u32 {
        self.struct_by_name[struct_name] as u32
    }

    /// Zeroed buffer the size of one `struct_name`
    pub fn zeroed(&self, struct_name: &str) -> Vec<u8> {
        vec![0u8; self.struct_size(struct_name)]
    }

    pub fn put_ptr(&self, data: &mut [u8], offset: usize, value: u64) {
        data[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
    }

    pub fn put_i16(&self, data: &mut [u8], offset: usize, value: i16) {
        data[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
    }

    pub fn put_i32(&self, data: &mut [u8], offset: usize, value: i32) {
        data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    pub fn put_i64(&self, data: &mut [u8], offset: usize, value: i64) {
        data[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
    }

    pub fn put_str(&self, data: &mut [u8], offset: usize, value: &str) {
        data[offset..offset + value.len()].copy_from_slice(value.as_bytes());
        data[offset + value.len()] = 0;
    }

    /// Reserve an address for a block added later
    pub fn alloc_address(&mut self) -> u64 {
        let address = self.next_address;
        self.next_address += 0x100;
        address
    }

    /// Append a block at a fresh address and return that address
    pub fn add_block(&mut self, code: &[u8], struct_name: &str, data: Vec<u8>) -> u64 {
        let address = self.alloc_address();
        self.add_block_at(code, struct_name, address, 1, data);
        address
    }

    pub fn add_block_at(
        &mut self,
        code: &[u8],
        struct_name: &str,
        address: u64,
        count: u32,
        data: Vec<u8>,
    ) {
        let mut padded = [0u8; 4];
        padded[..code.len()].copy_from_slice(code);
        let sdna_index = self.sdna_index(struct_name);
        self.blocks.push(RawBlock {
            code: padded,
            sdna_index,
            address,
            count,
            data,
        });
    }

    /// Append a `DATA` block holding an array of pointers
    pub fn add_pointer_array(&mut self, pointers: &[u64]) -> u64 {
        let mut data = Vec::with_capacity(pointers.len() * 8);
        for p in pointers {
            data.extend_from_slice(&p.to_le_bytes());
        }
        let address = self.alloc_address();
        self.blocks.push(RawBlock {
            code: *b"DATA",
            sdna_index: 0,
            address,
            count: pointers.len() as u32,
            data,
        });
        address
    }

    /// Append a raw `DATA` block
    pub fn add_raw_data(&mut self, data: Vec<u8>) -> u64 {
        let address = self.alloc_address();
        self.blocks.push(RawBlock {
            code: *b"DATA",
            sdna_index: 0,
            address,
            count: 1,
            data,
        });
        address
    }

    fn dna_payload(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"SDNA");
        out.extend_from_slice(b"NAME");
        out.extend_from_slice(&(self.names.len() as u32).to_le_bytes());
        for name in &self.names {
            out.extend_from_slice(name.as_bytes());
            out.push(0);
        }
        align4(&mut out);

        out.extend_from_slice(b"TYPE");
        out.extend_from_slice(&(self.types.len() as u32).to_le_bytes());
        for (name, _) in &self.types {
            out.extend_from_slice(name.as_bytes());
            out.push(0);
        }
        align4(&mut out);

        out.extend_from_slice(b"TLEN");
        for (_, size) in &self.types {
            out.extend_from_slice(&size.to_le_bytes());
        }
        align4(&mut out);

        out.extend_from_slice(b"STRC");
        out.extend_from_slice(&(self.structs.len() as u32).to_le_bytes());
        for layout in &self.structs {
            out.extend_from_slice(&layout.type_index.to_le_bytes());
            out.extend_from_slice(&(layout.fields.len() as u16).to_le_bytes());
            for (t, n) in &layout.fields {
                out.extend_from_slice(&t.to_le_bytes());
                out.extend_from_slice(&n.to_le_bytes());
            }
        }
        out
    }

    /// Serialize with a legacy `BLENDER-v300` header
    pub fn build(&self) -> Vec<u8> {
        self.build_inner(true, true)
    }

    /// Serialize without the `DNA1` block
    pub fn build_without_dna(&self) -> Vec<u8> {
        self.build_inner(false, true)
    }

    /// Serialize without the closing `ENDB` block
    pub fn build_without_end(&self) -> Vec<u8> {
        self.build_inner(true, false)
    }

    fn build_inner(&self, with_dna: bool, with_end: bool) -> Vec<u8> {
        let mut out = b"BLENDER-v300".to_vec();
        for block in &self.blocks {
            write_block_header(&mut out, block.code, block.data.len() as u32, block.address, block.sdna_index, block.count);
            out.extend_from_slice(&block.data);
        }
        if with_dna {
            let dna = self.dna_payload();
            write_block_header(&mut out, *b"DNA1", dna.len() as u32, 0, 0, 1);
            out.extend_from_slice(&dna);
        }
        if with_end {
            write_block_header(&mut out, *b"ENDB", 0, 0, 0, 0);
        }
        out
    }
}

fn write_block_header(out: &mut Vec<u8>, code: [u8; 4], len: u32, address: u64, sdna: u32, count: u32) {
    out.extend_from_slice(&code);
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(&address.to_le_bytes());
    out.extend_from_slice(&sdna.to_le_bytes());
    out.extend_from_slice(&count.to_le_bytes());
}

fn align4(out: &mut Vec<u8>) {
    while out.len() % 4 != 0 {
        out.push(0);
    }
}

fn array_len(name: &str) -> usize {
    name.split('[')
        .skip(1)
        .filter_map(|part| part.split(']').next()?.parse::<usize>().ok())
        .product()
}

fn bare_name(name: &str) -> String {
    name.trim_start_matches('*')
        .split('[')
        .next()
        .unwrap_or_default()
        .to_string()
}
