//! FileSystem abstraction for testable discovery

mod mock;
mod real;
mod r#trait;

pub use mock::MockFileSystem;
pub use r#trait::{FileSystem, FsError};
pub use real::RealFileSystem;
