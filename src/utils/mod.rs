pub mod id_allocator;
pub mod logging;

pub use id_allocator::IdAllocator;
