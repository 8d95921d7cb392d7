//! The experiment configuration micro-language.
//!
//! One experiment per line, a name followed by `key=value` tokens:
//!
//! ```text
//! knn-rec recommender=ub neighborhood=knn neighborhood.k=5 neighborhood.sim=cosine
//! ```
//!
//! Dotted keys express nesting. `subset("neighborhood")` turns the line above
//! into a parameter set named `knn` with entries `k=5`, `sim=cosine`, and so on
//! down the component graph.
//!
//! Lines starting with `#` are comments. A line starting with `==` opens or
//! closes a commented block.

mod reader;
mod set;

pub use reader::{read, CommentFilter, Entries};
pub use set::ParameterSet;
