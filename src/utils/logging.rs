//! Logging bootstrap

/// Inits logging for host. Safe to call more than once; only the first call
/// installs the logger.
pub fn init_logging(level: log::LevelFilter) {
    env_logger::Builder::new().filter(None, level).parse_default_env().try_init().ok();
    log::set_max_level(level)
}
