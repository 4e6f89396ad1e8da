//! Storage substrate: packed offset/value buffers for per-element data.
//!
//! Everything the mesh stores per element (boundary lists, region memberships,
//! cached relations) lives in one of three buffer shapes:
//!
//! - [`PackedBuffer`]: dense rows over a contiguous index range, addressed by
//!   an offset array. The workhorse for boundary lists under the full layout.
//! - [`SparsePackedBuffer`]: packed rows for a sparse subset of indices, with a
//!   `BTreeMap` span index. Used for sparse boundary layouts, region storage
//!   after the packed switch, and cached relations.
//! - [`BucketBuffer`]: one growable `Vec` per row. The mutable staging shape
//!   for region membership before it is packed.

pub mod bucket;
pub mod packed;
pub mod sparse;

pub use bucket::BucketBuffer;
pub use packed::PackedBuffer;
pub use sparse::SparsePackedBuffer;
