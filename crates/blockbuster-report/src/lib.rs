//! # blockbuster-report
//!
//! Estimates how much memory and disk space the datablocks of a Blender
//! document take, and lists which objects and materials use the big ones.
//!
//! ```no_run
//! use blockbuster_report::{ReportOptions, build_report, load_from_path, render_report};
//!
//! let data = load_from_path("scene.blend", None)?;
//! let report = build_report(&data, &ReportOptions::default());
//! render_report(&report, &mut std::io::stdout(), false)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! The estimator works on a [`BlendData`] snapshot. Snapshots come from the
//! bundled loader or are assembled by hand for documents held elsewhere.

pub mod bpath;
pub mod format;
pub mod loader;
pub mod model;
pub mod references;
pub mod report;
pub mod size;

pub use blockbuster_error::{BlockbusterError, ReportErrorKind, Result};
pub use format::{convert_size, render_report};
pub use loader::{load_blend_data, load_from_path};
pub use model::{
    BlendData, Datablock, DatablockData, DatablockId, DatablockKind, Node, NodeTree, NodeType,
    ObjectType, PackedFile, SceneObject, TextureType,
};
pub use references::{ContainerKind, Reference, find_references};
pub use report::{ReportEntry, ReportOptions, SizeReport, build_report};
pub use size::{file_size, memory_size, total_size};
