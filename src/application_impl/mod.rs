mod daily_activity;
mod interval_pacer;
mod normalizer;
mod pagination_engine;
mod tracing_reporter;

pub use daily_activity::*;
pub use interval_pacer::*;
pub use normalizer::*;
pub use pagination_engine::*;
pub use tracing_reporter::*;
