mod message_store_redis;

pub use message_store_redis::*;
