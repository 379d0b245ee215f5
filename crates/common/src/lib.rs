pub mod structured_logging;

pub use structured_logging::{
    build_subscriber, init_structured_logging, init_test_logging, ExecutionContext, JsonFormatter,
    LoggingConfig, StructuredLogEntry,
};
