use std::io::Write;
use std::sync::Once;

use chrono::Local;
use env_logger::{Builder, Env};

static INIT: Once = Once::new();

/// Initialize the logging system
///
/// Reads the level from the `LOG_LEVEL` environment variable (default
/// `info`). Safe to call more than once; only the first call installs the
/// logger, which matters for tests that share a process.
pub fn init_logger() {
    INIT.call_once(|| {
        let env = Env::default().filter_or("LOG_LEVEL", "info");

        Builder::from_env(env)
            .format(|buf, record| {
                writeln!(
                    buf,
                    "{} [{}] - {}: {}",
                    Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                    record.level(),
                    record.target(),
                    record.args()
                )
            })
            .init();
    });
}
