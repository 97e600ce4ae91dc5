mod app;
mod plan;

pub use app::*;
pub use plan::*;
