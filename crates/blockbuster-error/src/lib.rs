//! # blockbuster-error
//!
//! Unified error type shared by the blockbuster crates.
//!
//! - Errors are grouped by domain (blend file parsing, report building, CLI)
//! - Variants carry context such as the file path and the block index
//! - `user_message()` gives a CLI-friendly rendering, `Display` a short one

use std::path::PathBuf;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The main error type for blockbuster
#[derive(Error, Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BlockbusterError {
    /// File system and I/O related errors
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
        file_path: Option<PathBuf>,
        // The source error is kept as text so the error stays cloneable
        #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
        source_message: Option<String>,
    },

    /// Blend file parsing and structure errors
    #[error("Blend file error: {message}")]
    BlendFile {
        message: String,
        #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
        file_path: Option<PathBuf>,
        #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
        block_index: Option<usize>,
        kind: BlendFileErrorKind,
    },

    /// Errors raised while turning blend data into a size report
    #[error("Report error: {message}")]
    Report {
        message: String,
        #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
        block_index: Option<usize>,
        kind: ReportErrorKind,
    },

    /// CLI and user interface errors
    #[error("CLI error: {message}")]
    Cli { message: String, kind: CliErrorKind },
}

/// Specific kinds of blend file errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BlendFileErrorKind {
    #[error("Invalid file header")]
    InvalidHeader,
    #[error("Invalid magic bytes")]
    InvalidMagic,
    #[error("Unsupported file version")]
    UnsupportedVersion,
    #[error("Missing DNA block")]
    NoDnaFound,
    #[error("Invalid block index")]
    InvalidBlockIndex,
    #[error("DNA parsing error")]
    DnaError,
    #[error("Invalid data structure")]
    InvalidData,
    #[error("Field access error")]
    InvalidField,
    #[error("Compression not supported")]
    UnsupportedCompression,
    #[error("Decompression failed")]
    DecompressionFailed,
    #[error("File size limit exceeded")]
    SizeLimitExceeded,
}

/// Specific kinds of report errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ReportErrorKind {
    #[error("Datablock could not be read")]
    UnreadableDatablock,
}

/// Specific kinds of CLI errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CliErrorKind {
    #[error("Output formatting failed")]
    OutputFormatError,
}

/// Convenient result type for blockbuster operations
pub type Result<T> = std::result::Result<T, BlockbusterError>;

impl BlockbusterError {
    /// Create a new I/O error
    pub fn io<M: Into<String>>(message: M) -> Self {
        Self::Io {
            message: message.into(),
            file_path: None,
            source_message: None,
        }
    }

    /// Create a new I/O error with file path context
    pub fn io_with_path<M: Into<String>, P: Into<PathBuf>>(message: M, path: P) -> Self {
        Self::Io {
            message: message.into(),
            file_path: Some(path.into()),
            source_message: None,
        }
    }

    /// Create a new blend file error
    pub fn blend_file<M: Into<String>>(message: M, kind: BlendFileErrorKind) -> Self {
        Self::BlendFile {
            message: message.into(),
            file_path: None,
            block_index: None,
            kind,
        }
    }

    /// Create a new report error
    pub fn report<M: Into<String>>(message: M, kind: ReportErrorKind) -> Self {
        Self::Report {
            message: message.into(),
            block_index: None,
            kind,
        }
    }

    /// Create a new CLI error
    pub fn cli<M: Into<String>>(message: M, kind: CliErrorKind) -> Self {
        Self::Cli {
            message: message.into(),
            kind,
        }
    }

    /// Add file path context to an existing error
    pub fn with_file_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        let path = path.into();
        match &mut self {
            Self::Io { file_path, .. } => *file_path = Some(path),
            Self::BlendFile { file_path, .. } => *file_path = Some(path),
            _ => {}
        }
        self
    }

    /// Add block index context to an existing error
    pub fn with_block_index(mut self, index: usize) -> Self {
        match &mut self {
            Self::BlendFile { block_index, .. } => *block_index = Some(index),
            Self::Report { block_index, .. } => *block_index = Some(index),
            _ => {}
        }
        self
    }

    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    pub fn is_blend_file(&self) -> bool {
        matches!(self, Self::BlendFile { .. })
    }

    /// Get the blend file error kind, if this is a blend file error
    pub fn blend_file_kind(&self) -> Option<&BlendFileErrorKind> {
        match self {
            Self::BlendFile { kind, .. } => Some(kind),
            _ => None,
        }
    }

    /// Get the file path associated with this error, if any
    pub fn file_path(&self) -> Option<&PathBuf> {
        match self {
            Self::Io { file_path, .. } => file_path.as_ref(),
            Self::BlendFile { file_path, .. } => file_path.as_ref(),
            _ => None,
        }
    }

    /// Get the block index associated with this error, if any
    pub fn block_index(&self) -> Option<usize> {
        match self {
            Self::BlendFile { block_index, .. } => *block_index,
            Self::Report { block_index, .. } => *block_index,
            _ => None,
        }
    }

    /// The bare message, without kind or context
    pub fn message(&self) -> &str {
        match self {
            Self::Io { message, .. }
            | Self::BlendFile { message, .. }
            | Self::Report { message, .. }
            | Self::Cli { message, .. } => message,
        }
    }

    /// Get a user-friendly error message suitable for CLI display
    pub fn user_message(&self) -> String {
        match self {
            Self::Io {
                message, file_path, ..
            } => {
                if let Some(path) = file_path {
                    format!("File error in '{}': {}", path.display(), message)
                } else {
                    message.clone()
                }
            }
            Self::BlendFile {
                message,
                file_path,
                block_index,
                kind: _,
            } => {
                let mut msg = format!("Blend file error: {message}");
                if let Some(path) = file_path {
                    msg.push_str(&format!(" (file: {})", path.display()));
                }
                if let Some(index) = block_index {
                    msg.push_str(&format!(" (block: {index})"));
                }
                msg
            }
            Self::Report {
                message,
                block_index,
                ..
            } => {
                let mut msg = format!("Size report failed: {message}");
                if let Some(index) = block_index {
                    msg.push_str(&format!(" (block: {index})"));
                }
                msg
            }
            Self::Cli { message, .. } => format!("CLI error: {message}"),
        }
    }
}

/// Parser domain helpers
impl BlockbusterError {
    pub fn parser_invalid_header<M: Into<String>>(message: M) -> Self {
        Self::blend_file(message, BlendFileErrorKind::InvalidHeader)
    }

    pub fn parser_no_dna<M: Into<String>>(message: M) -> Self {
        Self::blend_file(message, BlendFileErrorKind::NoDnaFound)
    }

    pub fn parser_invalid_block<M: Into<String>>(message: M) -> Self {
        Self::blend_file(message, BlendFileErrorKind::InvalidBlockIndex)
    }

    pub fn parser_dna_error<M: Into<String>>(message: M) -> Self {
        Self::blend_file(message, BlendFileErrorKind::DnaError)
    }

    pub fn parser_invalid_field<M: Into<String>>(message: M) -> Self {
        Self::blend_file(message, BlendFileErrorKind::InvalidField)
    }

    pub fn parser_invalid_data<M: Into<String>>(message: M) -> Self {
        Self::blend_file(message, BlendFileErrorKind::InvalidData)
    }
}

impl From<std::io::Error> for BlockbusterError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            file_path: None,
            source_message: Some(format!("IO Error: {err}")),
        }
    }
}
