/* src/compiler/rust/src/analysis/mod.rs */

mod refs;
mod scope;
mod sweep;

pub use refs::{ReferenceSet, collect_references};
pub use sweep::{Candidates, Sweeper};

pub(crate) use refs::free_identifiers;
pub(crate) use scope::{Scope, block_scope, for_head_scope, for_init_scope, function_scope};
