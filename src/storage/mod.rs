//! Storage collaborators: blob containers, chunk decoding and the control blob

pub mod blob;
pub mod decoder;
pub mod local;
pub mod memory;
pub mod meta;

pub use blob::*;
pub use decoder::*;
pub use local::*;
pub use memory::*;
pub use meta::*;
