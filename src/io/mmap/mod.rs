pub mod arena;
pub use arena::Arena;

pub mod buffer;
pub use buffer::{MappedBuffer, State};

pub mod stream;
pub use stream::{Stream, Summary};
