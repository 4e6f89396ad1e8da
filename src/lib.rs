#![cfg_attr(docsrs, feature(doc_cfg))]
//! # topomesh
//!
//! topomesh is an indexed topological mesh storage engine for simulation codes. It
//! stores vertices, edges, faces and cells of a discretized domain in packed
//! per-dimension buffers, derives boundary/co-boundary/neighbor relations with
//! generation-stamped caching, groups elements into named regions and a tree of
//! nested meshes, and refines triangle and tetrahedron meshes by edge splitting.
//!
//! ## Features
//! - Packed offset/value buffers (dense and sparse) as the storage substrate
//! - Deduplicating element creation keyed by cell type and unordered vertex set
//! - Full and sparse boundary layouts with checked transitions between them
//! - Cached co-boundary, neighbor and boundary-flag relations that are
//!   invalidated by a hierarchy-wide generation counter
//! - Edge-based refinement with the complete marked-edge case tables for
//!   triangles and tetrahedra, plus line and quadrilateral splitting
//! - Byte-level serialization of the entire hierarchy state via serde/bincode
//!
//! ## Determinism
//!
//! All derived relations and refinement decisions are pure functions of element
//! ids and vertex coordinates; repeated runs over the same input produce
//! identical element ids, orderings and subdivisions.
//!
//! ## Usage
//! Add `topomesh` as a dependency in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! topomesh = "0.4"
//! ```

// Re-export our major subsystems:
pub mod debug_invariants;
pub mod error;
pub mod geometry;
pub mod refine;
pub mod storage;
pub mod topology;

pub use debug_invariants::DebugInvariants;
pub use error::TopoMeshError;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::error::TopoMeshError;
    pub use crate::geometry::{boundary_surface, cell_measure, mesh_volume};
    pub use crate::refine::{refine, refine_uniform, RefinementMarks};
    pub use crate::storage::{BucketBuffer, PackedBuffer, SparsePackedBuffer};
    pub use crate::topology::cell_type::CellType;
    pub use crate::topology::element::{ElementId, MeshId, RegionId};
    pub use crate::topology::hierarchy::{BoundaryLayout, MeshHierarchy};
}
