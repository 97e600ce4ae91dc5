mod activity;
mod channel;
mod cursor;
mod message;
mod unit;

pub use activity::*;
pub use channel::*;
pub use cursor::*;
pub use message::*;
pub use unit::*;
