//! Core data types: events, time, paths and cursors

pub mod cursor;
pub mod event;
pub mod path;
pub mod temporal;

pub use cursor::*;
pub use event::*;
pub use path::*;
pub use temporal::*;
