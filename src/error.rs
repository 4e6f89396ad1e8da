//! Error types for topomesh operations.
//!
//! All fallible public operations return [`TopoMeshError`]. Programming errors
//! (corrupt internal state that no caller input can produce) panic through the
//! invariant machinery in [`crate::debug_invariants`] instead.

use thiserror::Error;

use crate::topology::cell_type::CellType;
use crate::topology::element::{ElementId, MeshId, RegionId};
use crate::topology::hierarchy::BoundaryLayout;

/// Error type for topomesh operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopoMeshError {
    /// A topological dimension outside the supported `0..=3` range was requested.
    #[error("invalid topological dimension: {dimension}")]
    InvalidDimension { dimension: usize },

    /// A geometric dimension outside the supported `1..=3` range was requested.
    #[error("invalid geometric dimension: {dimension}")]
    InvalidGeometricDimension { dimension: usize },

    /// Coordinate data of the wrong arity for the hierarchy's geometric dimension.
    #[error("geometric dimension mismatch: expected {expected} coordinates, found {found}")]
    GeometryDimensionMismatch { expected: usize, found: usize },

    /// The element id does not refer to an element of this hierarchy.
    #[error("unknown element id: {0:?}")]
    UnknownElement(ElementId),

    /// The mesh id does not refer to a mesh of this hierarchy.
    #[error("unknown mesh id: {0:?}")]
    UnknownMesh(MeshId),

    /// The region id does not refer to a region of this hierarchy.
    #[error("unknown region id: {0:?}")]
    UnknownRegion(RegionId),

    /// Element creation was attempted with an empty vertex list.
    #[error("cannot create an element from an empty vertex list")]
    EmptyVertexList,

    /// The vertex list length does not match the cell type's vertex count.
    #[error("vertex count mismatch for {cell_type:?}: expected {expected}, found {found}")]
    VertexCountMismatch {
        cell_type: CellType,
        expected: usize,
        found: usize,
    },

    /// The same vertex appears more than once in an element's vertex list.
    #[error("duplicate vertex {0:?} in element vertex list")]
    DuplicateVertex(ElementId),

    /// A batch creation call mixed cell types of different dimensions.
    #[error("batch mixes cell dimensions: expected {expected}, found {found}")]
    MixedBatchDimensions { expected: usize, found: usize },

    /// A non-vertex id was passed where a vertex id is required.
    #[error("expected a vertex id, found {0:?}")]
    ExpectedVertex(ElementId),

    /// The requested boundary layout transition is not supported.
    #[error("unsupported boundary layout transition from {from:?} to {to:?} with {meshes} meshes")]
    UnsupportedLayoutTransition {
        from: BoundaryLayout,
        to: BoundaryLayout,
        meshes: usize,
    },

    /// The operation requires the full boundary layout.
    #[error("operation `{operation}` is not available under the sparse boundary layout")]
    SparseLayoutUnsupported { operation: &'static str },

    /// A boundary list that the operation needs has not been materialized.
    #[error("boundary of {element:?} at dimension {dimension} has not been materialized")]
    BoundaryNotMaterialized {
        element: ElementId,
        dimension: usize,
    },

    /// The `(dim, connector, neighbor)` triple does not describe a derivable
    /// neighbor relation.
    #[error(
        "invalid neighbor configuration: dim {dim}, connector {connector}, neighbor {neighbor}"
    )]
    InvalidNeighborConfig {
        dim: usize,
        connector: usize,
        neighbor: usize,
    },

    /// Refinement was asked to split a cell type it has no case table for.
    #[error("cell {element:?} of type {cell_type:?} cannot be refined with marked edges")]
    UnsupportedRefinementCellType {
        element: ElementId,
        cell_type: CellType,
    },

    /// The marks buffer does not cover the source hierarchy's edges.
    #[error("refinement marks cover {found} edges but the hierarchy has {expected}")]
    RefinementMarksMismatch { expected: usize, found: usize },

    /// Serialization of the hierarchy failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(String),

    /// Deserialization of a hierarchy snapshot failed.
    #[error("deserialization failed: {0}")]
    DeserializationFailed(String),

    /// An offset array is not monotone or overruns the values it indexes.
    #[error("corrupt offsets at row {index}")]
    CorruptOffsets { index: usize },

    /// Parallel per-element arrays disagree on length.
    #[error("row count mismatch: expected {expected}, found {found}")]
    RowCountMismatch { expected: usize, found: usize },

    /// Invariant violation: a mesh handle list is not sorted and unique.
    #[error("handle list of mesh {mesh:?} at dimension {dimension} is not sorted")]
    UnsortedHandles { mesh: MeshId, dimension: usize },

    /// Invariant violation: the vertex-keyed lookup index disagrees with storage.
    #[error("lookup index entry for {element:?} is corrupt")]
    LookupCorrupt { element: ElementId },
}
