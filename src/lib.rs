#![doc(test(attr(deny(warnings))))]

//! Formdesk Core models the dynamic form-schema editor of a CMS admin
//! console: an ordered field list, nested option trees with key/value
//! packages, the wire serializer and a read-only preview.

pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod errors;
pub mod storage;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Formdesk Core tracing initialized.");
    });
}
