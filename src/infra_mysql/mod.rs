mod message_store_mysql;

pub use message_store_mysql::*;
