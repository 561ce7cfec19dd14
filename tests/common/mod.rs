//! Shared test setup for the integration suite.

/// Install a `tracing-subscriber` `fmt` subscriber for the current process, once.
///
/// `try_init` swallows the "already set" error, so this is safe to call from every test function even though
/// several run as threads inside one test binary.
pub fn init_tracing()
{
    let _ = tracing_subscriber::fmt().with_test_writer().with_max_level(tracing::Level::DEBUG).try_init();
}
