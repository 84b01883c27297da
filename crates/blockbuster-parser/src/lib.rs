//! # blockbuster-parser
//!
//! Reader for Blender .blend files.
//!
//! Provides header parsing, block enumeration, SDNA interpretation and
//! structured field access, which is everything the size reporter needs to
//! turn a file on disk into a snapshot of its datablocks.
//!
//! ## Layers
//!
//! 1. **Header**: pointer size, endianness and version
//! 2. **Blocks**: every block header up to `ENDB`, indexed by code and old address
//! 3. **DNA**: struct layouts from the `DNA1` block
//! 4. **Fields**: typed reads of named struct fields out of block data
//!
//! Zstandard-compressed files are decompressed in memory (`zstd` feature) and
//! uncompressed files are memory mapped when possible (`mmap` feature).

pub mod block;
pub mod compression;
pub mod dna;
pub mod error;
pub mod fields;
pub mod header;

pub use block::{BlendFileBlock, BlockHeader, block_code_to_string};
pub use compression::{CompressionKind, DecompressionMode, DecompressionPolicy, ParseOptions};
pub use dna::{DnaCollection, DnaField, DnaName, DnaStruct};
pub use error::{BlendFileErrorKind, BlockbusterError, Result};
pub use fields::FieldReader;
pub use header::BlendFileHeader;

use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// A trait for readable and seekable sources that can be sent across threads
pub trait ReadSeekSend: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeekSend for T {}

/// A parsed .blend file: header, block table, DNA and lookup indices
pub struct BlendFile<R: Read + Seek> {
    reader: R,
    header: BlendFileHeader,
    blocks: Vec<BlendFileBlock>,
    dna: DnaCollection,
    block_index: HashMap<[u8; 4], Vec<usize>>,
    address_index: HashMap<u64, usize>,
    stream_len: u64,
}

impl<R: Read + Seek> BlendFile<R> {
    pub fn new(mut reader: R) -> Result<Self> {
        if compression::detect_compression(&mut reader)? == CompressionKind::Zstd {
            return Err(BlockbusterError::blend_file(
                "Zstandard-compressed stream must be opened with parse_from_path",
                BlendFileErrorKind::UnsupportedCompression,
            ));
        }

        let header = BlendFileHeader::read(&mut reader)?;
        let stream_len = reader.seek(SeekFrom::End(0))?;
        log::debug!(
            "Blend header: version {}, {}-byte pointers, {} endian, format {}",
            header.version,
            header.pointer_size,
            if header.is_little_endian { "little" } else { "big" },
            header.file_format_version
        );

        let blocks = read_blocks(&mut reader, &header, stream_len)?;
        let dna = read_dna(&mut reader, &header, &blocks)?;

        let mut blend_file = BlendFile {
            reader,
            header,
            blocks,
            dna,
            block_index: HashMap::new(),
            address_index: HashMap::new(),
            stream_len,
        };
        blend_file.build_block_index();

        Ok(blend_file)
    }

    fn build_block_index(&mut self) {
        self.block_index.reserve(32);
        self.address_index.reserve(self.blocks.len());

        for (i, block) in self.blocks.iter().enumerate() {
            self.block_index
                .entry(block.header.code)
                .or_default()
                .push(i);
            if block.header.old_address != 0 {
                self.address_index.insert(block.header.old_address, i);
            }
        }
    }

    pub fn header(&self) -> &BlendFileHeader {
        &self.header
    }

    pub fn blocks(&self) -> &[BlendFileBlock] {
        &self.blocks
    }

    pub fn blocks_len(&self) -> usize {
        self.blocks.len()
    }

    /// Get block header by index
    pub fn get_block(&self, index: usize) -> Option<&BlendFileBlock> {
        self.blocks.get(index)
    }

    pub fn pointer_size(&self) -> usize {
        self.header.pointer_size as usize
    }

    /// Read the raw data for a specific block
    pub fn read_block_data(&mut self, block_index: usize) -> Result<Vec<u8>> {
        let block = self.blocks.get(block_index).ok_or_else(|| {
            BlockbusterError::parser_invalid_block(format!("Invalid block index: {block_index}"))
        })?;

        let end = block.data_offset.saturating_add(block.header.size);
        if end > self.stream_len {
            return Err(BlockbusterError::parser_invalid_data(format!(
                "Block data runs past end of file ({end} > {})",
                self.stream_len
            ))
            .with_block_index(block_index));
        }

        let mut data = vec![0u8; block.header.size as usize];
        self.reader.seek(SeekFrom::Start(block.data_offset))?;
        self.reader.read_exact(&mut data)?;
        Ok(data)
    }

    /// Get block by its memory address (pointer value)
    pub fn find_block_by_address(&self, address: u64) -> Option<usize> {
        if address == 0 {
            return None;
        }
        self.address_index.get(&address).copied()
    }

    /// Get all blocks of a specific type, in file order
    pub fn blocks_by_type(&self, block_type: &[u8; 4]) -> &[usize] {
        self.block_index
            .get(block_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn dna(&self) -> &DnaCollection {
        &self.dna
    }

    /// Name of the SDNA struct a block was written as
    pub fn block_struct_name(&self, block_index: usize) -> Option<&str> {
        let block = self.blocks.get(block_index)?;
        self.dna
            .get_struct(block.header.sdna_index as usize)
            .map(|s| s.type_name.as_str())
    }

    /// Create a field reader for a specific block
    pub fn create_field_reader<'a>(&'a self, block_data: &'a [u8]) -> FieldReader<'a> {
        FieldReader::new(
            block_data,
            &self.dna,
            self.header.pointer_size as usize,
            self.header.is_little_endian,
        )
    }
}

fn read_blocks<R: Read + Seek>(
    reader: &mut R,
    header: &BlendFileHeader,
    stream_len: u64,
) -> Result<Vec<BlendFileBlock>> {
    reader.seek(SeekFrom::Start(header.header_size() as u64))?;
    let mut blocks = Vec::new();

    loop {
        let header_offset = reader.stream_position()?;
        let block_header = BlockHeader::read(reader, header).map_err(|e| {
            if e.is_io() {
                BlockbusterError::parser_invalid_data(format!(
                    "Truncated block header at offset {header_offset} (missing ENDB?)"
                ))
            } else {
                e
            }
        })?;
        let data_offset = reader.stream_position()?;

        if block_header.is_end_block() {
            break;
        }

        let next = data_offset.saturating_add(block_header.size);
        if next > stream_len {
            return Err(BlockbusterError::parser_invalid_data(format!(
                "Block {} at offset {header_offset} claims {} bytes past end of file",
                block_code_to_string(block_header.code),
                block_header.size
            ))
            .with_block_index(blocks.len()));
        }

        log::trace!(
            "Block {} size={} addr={:#x} sdna={} count={}",
            block_code_to_string(block_header.code),
            block_header.size,
            block_header.old_address,
            block_header.sdna_index,
            block_header.count
        );

        blocks.push(BlendFileBlock {
            header: block_header,
            data_offset,
            header_offset,
        });
        reader.seek(SeekFrom::Start(next))?;
    }

    log::debug!("Read {} blocks", blocks.len());
    Ok(blocks)
}

fn read_dna<R: Read + Seek>(
    reader: &mut R,
    header: &BlendFileHeader,
    blocks: &[BlendFileBlock],
) -> Result<DnaCollection> {
    let dna_block = blocks
        .iter()
        .find(|block| block.header.is_dna_block())
        .ok_or_else(|| BlockbusterError::parser_no_dna("DNA block not found"))?;

    let mut data = vec![0u8; dna_block.header.size as usize];
    reader.seek(SeekFrom::Start(dna_block.data_offset))?;
    reader.read_exact(&mut data)?;
    DnaCollection::parse(&data, header)
}

/// Open and parse a .blend file from disk, decompressing it if needed
pub fn parse_from_path<P: AsRef<Path>>(
    path: P,
    options: Option<&ParseOptions>,
) -> Result<(BlendFile<Box<dyn ReadSeekSend>>, DecompressionMode)> {
    let path = path.as_ref();
    let policy = options.map(|o| &o.decompression_policy);
    let (reader, mode) = compression::open_source(path, policy)?;
    log::debug!("Opened {} ({mode:?})", path.display());

    let blend_file = BlendFile::new(reader).map_err(|e| e.with_file_path(path))?;
    Ok((blend_file, mode))
}
