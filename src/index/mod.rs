// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vector index module - exact k-NN search and the identifier map that names
//! each indexed vector, plus their persisted form.

pub mod artifact;
pub mod id_map;
pub mod vector;

pub use artifact::{
    load_artifacts, read_index_header, save_artifacts, ArtifactPaths, Artifacts, IndexHeader,
};
pub use id_map::IdentifierMap;
pub use vector::{squared_euclidean, FlatIndex, Neighbor};
