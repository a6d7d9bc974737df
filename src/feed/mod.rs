//! Change feed reading: segments, the top-level reader and its façades

pub mod blocking;
pub mod client;
pub mod reader;
pub mod segment;


pub use blocking::*;
pub use client::*;
pub use reader::*;
pub use segment::{Position, Progress, Segment};
