#![doc(test(attr(deny(warnings))))]

//! Budget Wizard walks a user through a two-level category taxonomy, collects
//! typed field values per step, persists every edit locally, and submits the
//! aggregate to a remote endpoint once reviewed.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod domain;
pub mod errors;
pub mod navigation;
pub mod review;
pub mod session;
pub mod storage;
pub mod submission;
pub mod utils;
pub mod wizard;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Budget Wizard tracing initialized.");
    });
}
