//! File system operations module
//!
//! Provides resource name resolution, the stream handles tasks own, and
//! the UTF-8 character layer used by the buffered strategies.

mod operations;
mod resolver;
mod text;

pub use operations::*;
pub use resolver::*;
pub use text::*;
