mod crawl;
mod pacer;
mod progress;

pub use crawl::*;
pub use pacer::*;
pub use progress::*;
