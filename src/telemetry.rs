//! Tracing setup for binaries and tests.
//!
//! The library itself only emits `tracing` events; installing a subscriber
//! is the embedding application's choice. [`init`] is a convenient default
//! that respects `RUST_LOG`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a formatted stderr subscriber.
///
/// Filter defaults to `info,flowforge=debug` unless `RUST_LOG` is set.
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info,flowforge=debug"))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
