//! Error types used by the parser, shared with the rest of the workspace.

pub use blockbuster_error::{BlendFileErrorKind, BlockbusterError, Result};
