mod manifest;
mod path_index;
mod persistence;

pub use manifest::*;
pub use path_index::*;
pub use persistence::*;
