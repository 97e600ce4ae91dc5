mod message_source_fake;
mod message_store_memory;

pub use message_source_fake::*;
pub use message_store_memory::*;
