//! Read-only shared data: identifier indexes, preferences, item features.
//!
//! Loaded once per process and shared by `Arc` across every component the
//! factories build. Nothing here is mutated after loading.
//!
//! ## File formats
//!
//! | File          | Line format                     |
//! |---------------|---------------------------------|
//! | users / items | `id` (extra tab fields ignored) |
//! | preferences   | `user \t item [\t score]`       |
//! | features      | `item \t feature [\t value]`    |

mod features;
mod index;
mod preferences;

pub use features::FeatureData;
pub use index::Index;
pub use preferences::PreferenceData;
