// Pattern source implementations - file-backed for production, in-memory
// for tests and embedders.

mod file_source;
mod in_memory;

pub use file_source::FilePatternSource;
pub use in_memory::InMemoryPatternSource;
