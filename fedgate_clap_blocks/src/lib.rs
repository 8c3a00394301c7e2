//! Building blocks for [`clap`]-driven configuration options.
pub mod fragment_cache;
pub mod logging;
