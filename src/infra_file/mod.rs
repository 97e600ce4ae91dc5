mod message_store_jsonl;

pub use message_store_jsonl::*;
