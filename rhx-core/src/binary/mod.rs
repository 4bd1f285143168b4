pub mod read;
pub mod write;

pub use read::ByteCursor;
pub use write::*;
