pub mod file;
pub mod memory;

pub use file::FileRetriever;
pub use memory::MemoryRetriever;
