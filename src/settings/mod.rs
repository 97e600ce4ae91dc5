//! Layered settings: a TOML file selected by `--settings` (or the build
//! profile default), overridden by `ARCHIVER__SECTION__KEY` environment
//! variables.

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;
