//! Shared test harness: route `tracing` output from the crate under test to the test
//! runner's captured stdout, so a failing scenario shows its `service.rs`/`recovery.rs` log
//! trail instead of nothing.

use std::sync::Once;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}
