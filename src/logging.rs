use std::io::Write;

use chrono::Local;
use env_logger::{Builder, Env};

/// Install the process logger. `RUST_LOG` overrides the default `info` level.
///
/// Safe to call more than once; only the first call installs a logger.
pub fn init() {
    let _ = Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}: {}",
                Local::now().to_rfc3339(),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .try_init();
}
