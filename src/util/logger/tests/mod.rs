//! Logger 单元测试

use crate::util::logger::{init, init_debug, init_with_level, LogLevel};

#[test]
fn test_verbosity_levels() {
    assert_eq!(LogLevel::from_verbosity(0), LogLevel::Info);
    assert_eq!(LogLevel::from_verbosity(1), LogLevel::Debug);
    assert_eq!(LogLevel::from_verbosity(2), LogLevel::Trace);
    assert_eq!(LogLevel::from_verbosity(9), LogLevel::Trace);
    assert_eq!(tracing::Level::from(LogLevel::Warn), tracing::Level::WARN);
}

#[test]
fn test_repeated_init_is_harmless() {
    init_with_level(LogLevel::Trace);
    init();
    init_debug();
    tracing::info!("logger still usable");
}
