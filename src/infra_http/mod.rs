mod message_source_http;

pub use message_source_http::*;
