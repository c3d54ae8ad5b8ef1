//! Logger bootstrap for applications embedding the perception engine.

mod init;

pub use init::{LoggingConfig, init_logging};
