mod file_cache;
mod memory;

pub use file_cache::FileCacheStorage;
pub use memory::MemoryCacheStorage;
