use log::LevelFilter;
use simplelog::{ConfigBuilder, WriteLogger};

/// Environment variable selecting the diagnostic log level.
pub const LOG_LEVEL_ENV: &str = "CODEB_HOOK_LOG";

/// Route `log` diagnostics to stderr. Stdout carries only the verdict.
/// Best-effort: an unparseable level falls back to warn, init errors are ignored.
pub fn init() {
    let level = std::env::var(LOG_LEVEL_ENV)
        .ok()
        .and_then(|v| v.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Warn);
    let config = ConfigBuilder::new()
        .set_time_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Off)
        .build();
    let _ = WriteLogger::init(level, config, std::io::stderr());
}
