use crate::error::{BlendFileErrorKind, BlockbusterError, Result};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Policy controlling how compressed files are handled
#[derive(Debug, Clone)]
pub struct DecompressionPolicy {
    /// Maximum size to decompress into memory (default: 256MB)
    pub max_in_memory_bytes: usize,
    /// Memory-map uncompressed files when the `mmap` feature is enabled
    pub prefer_mmap: bool,
}

impl Default for DecompressionPolicy {
    fn default() -> Self {
        Self {
            max_in_memory_bytes: 256 * 1024 * 1024,
            prefer_mmap: cfg!(feature = "mmap"),
        }
    }
}

/// Options for parsing operations
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    pub decompression_policy: DecompressionPolicy,
}

/// How the bytes behind a parsed file are held
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecompressionMode {
    /// Uncompressed, read through a buffered file handle
    None,
    /// Uncompressed, memory mapped
    Mmap,
    /// Zstd decompressed into memory
    ZstdInMemory,
}

/// Detected compression type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionKind {
    None,
    Zstd,
}

/// Read + Seek over any owned byte buffer (decompressed data or a memory map)
pub struct SliceCursor<T: AsRef<[u8]>> {
    data: T,
    position: usize,
}

impl<T: AsRef<[u8]>> SliceCursor<T> {
    pub fn new(data: T) -> Self {
        Self { data, position: 0 }
    }
}

impl<T: AsRef<[u8]>> Read for SliceCursor<T> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let data = self.data.as_ref();
        let available = data.len().saturating_sub(self.position);
        let to_read = buf.len().min(available);

        if to_read > 0 {
            buf[..to_read].copy_from_slice(&data[self.position..self.position + to_read]);
            self.position += to_read;
        }

        Ok(to_read)
    }
}

impl<T: AsRef<[u8]>> Seek for SliceCursor<T> {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        let new_pos = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::End(offset) => self.data.as_ref().len() as i64 + offset,
            SeekFrom::Current(offset) => self.position as i64 + offset,
        };

        if new_pos < 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Seek position cannot be negative",
            ));
        }

        self.position = new_pos as usize;
        Ok(self.position as u64)
    }
}

/// Detect compression type from reader
pub fn detect_compression<R: Read + Seek>(reader: &mut R) -> Result<CompressionKind> {
    let mut magic = [0u8; 4];
    let read = reader.read(&mut magic)?;
    reader.seek(SeekFrom::Start(0))?;

    // Zstandard frame magic, 0xFD2FB528 little endian
    if read == 4 && magic == [0x28, 0xB5, 0x2F, 0xFD] {
        Ok(CompressionKind::Zstd)
    } else {
        Ok(CompressionKind::None)
    }
}

#[cfg(feature = "zstd")]
fn decompress_zstd<R: Read>(reader: R, max_size: usize) -> Result<Vec<u8>> {
    let mut decoder = zstd::Decoder::new(std::io::BufReader::new(reader)).map_err(|e| {
        BlockbusterError::blend_file(
            format!("Failed to start zstd decoder: {e}"),
            BlendFileErrorKind::DecompressionFailed,
        )
    })?;
    let mut result = Vec::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = decoder.read(&mut buffer).map_err(|e| {
            BlockbusterError::blend_file(
                format!("Zstd stream is corrupt: {e}"),
                BlendFileErrorKind::DecompressionFailed,
            )
        })?;
        if bytes_read == 0 {
            break;
        }

        if result.len() + bytes_read > max_size {
            return Err(BlockbusterError::blend_file(
                format!("Decompressed data exceeds the in-memory limit of {max_size} bytes"),
                BlendFileErrorKind::SizeLimitExceeded,
            ));
        }

        result.extend_from_slice(&buffer[..bytes_read]);
    }

    log::debug!("Decompressed zstd blend file into {} bytes", result.len());
    Ok(result)
}

#[cfg(not(feature = "zstd"))]
fn decompress_zstd<R: Read>(_reader: R, _max_size: usize) -> Result<Vec<u8>> {
    Err(BlockbusterError::blend_file(
        "Zstd support not compiled in",
        BlendFileErrorKind::UnsupportedCompression,
    ))
}

/// Open a blend file and return a seekable reader over its uncompressed bytes
pub fn open_source<P: AsRef<Path>>(
    path: P,
    policy: Option<&DecompressionPolicy>,
) -> Result<(Box<dyn crate::ReadSeekSend>, DecompressionMode)> {
    let default_policy = DecompressionPolicy::default();
    let policy = policy.unwrap_or(&default_policy);
    let path = path.as_ref();
    let mut file = File::open(path).map_err(|e| {
        BlockbusterError::io_with_path(format!("Cannot open file: {e}"), path)
    })?;

    match detect_compression(&mut file)? {
        CompressionKind::Zstd => {
            let data = decompress_zstd(&mut file, policy.max_in_memory_bytes)?;
            Ok((Box::new(SliceCursor::new(data)), DecompressionMode::ZstdInMemory))
        }
        CompressionKind::None => {
            #[cfg(feature = "mmap")]
            if policy.prefer_mmap {
                // SAFETY: the map is read-only; the file is not expected to change while parsing
                match unsafe { memmap2::Mmap::map(&file) } {
                    Ok(mmap) => return Ok((Box::new(SliceCursor::new(mmap)), DecompressionMode::Mmap)),
                    Err(e) => log::warn!("Failed to mmap {}, falling back to buffered reads: {e}", path.display()),
                }
            }
            Ok((Box::new(std::io::BufReader::new(file)), DecompressionMode::None))
        }
    }
}
