// source

mod message_source;

pub use message_source::*;

// store

mod message_store;

pub use message_store::*;
