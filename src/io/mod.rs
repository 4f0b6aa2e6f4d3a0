pub mod mmap;

pub mod traits;
pub use traits::{BufferInfo, Driver};
