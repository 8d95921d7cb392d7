//! On-disk persistence for experiment outputs.
//!
//! - [`ArtifactStore`]: recommendation lists keyed by experiment name; the
//!   memoization signal of the recommendations batch.
//! - [`ModelStore`]: fitted factor models keyed by experiment name.
//! - [`RecommendationFormat`]: how lists are laid out as text.

mod artifacts;
mod format;
mod models;

pub use artifacts::ArtifactStore;
pub use format::RecommendationFormat;
pub use models::ModelStore;
