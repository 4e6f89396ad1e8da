//! Top-level module for mesh topology storage.
//!
//! This module provides the core types for representing an indexed mesh
//! topology. It includes:
//! - Strong id types for elements, meshes and regions
//! - Cell type metadata with local edge and face tables
//! - Per-dimension element buffers with deduplicating lookup
//! - Per-mesh handle buffers carrying cached relations
//! - The `MeshHierarchy` facade tying buffers, meshes and regions together
//!
//! Most users will interact with [`hierarchy::MeshHierarchy`] and the id types
//! re-exported through the crate prelude.

pub mod cell_type;
pub mod element;
pub mod element_buffer;
pub mod handle_buffer;
pub mod hierarchy;
pub mod mesh;
pub mod region;
pub mod relations;

pub use cell_type::CellType;
pub use element::{ElementId, MeshId, RegionId};
pub use hierarchy::{BoundaryLayout, MeshHierarchy};
