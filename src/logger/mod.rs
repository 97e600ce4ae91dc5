//! Tracing setup: a bootstrap subscriber whose filter is swapped once the
//! settings are known.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, info_span, trace, warn};
