mod cursor;
mod source;

pub use cursor::{ByteCursor, LeRead, SeekGuard};
pub use source::{LocalSliceSource, SliceSource};
