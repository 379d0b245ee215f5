//! Global subscriber setup runs once per process, so it lives in its own test binary

use common::{init_structured_logging, LoggingConfig};
use tracing::Level;

#[test]
fn test_global_init_succeeds_once() {
    init_structured_logging(LoggingConfig::json().with_level(Level::DEBUG))
        .expect("first global init must succeed");

    tracing::info!(target_type = "Greeter", parameters = 1u64, "built constructor descriptor");

    let second = init_structured_logging(LoggingConfig::default());
    assert!(second.is_err());
}
