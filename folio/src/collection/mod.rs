//! Documents, collections and the operations over them.

mod aggregate;
mod collection_handle;
mod collection_store;
mod document;
mod event;
mod find_options;
mod id_generator;

pub use aggregate::{AggregateOutput, AggregateStage};
pub use collection_handle::*;
pub use collection_store::*;
pub use document::*;
pub use event::*;
pub use find_options::*;
pub use id_generator::*;
