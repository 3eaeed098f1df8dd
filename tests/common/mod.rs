//! Common test utilities for the apkg CLI and library.
//!
//! - `cli`: runner for the compiled binary with fluent assertions
//! - `fixtures`: hand-built packages of both schema generations
#![allow(dead_code)]


use tracing_subscriber::EnvFilter;

pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
