use std::sync::Once;

pub const ENV_LOG: &str = "ARROWTEST_LOG";

static TRACING_INIT: Once = Once::new();

/// Installs a stderr subscriber filtered by `ARROWTEST_LOG` (e.g.
/// `ARROWTEST_LOG=arrowtest=debug`). Does nothing when the variable is unset.
/// Safe to call more than once.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var_os(ENV_LOG).is_none() {
            return;
        }
        match EnvFilter::try_from_env(ENV_LOG) {
            Ok(filter) => {
                let _ = tracing_subscriber::registry()
                    .with(
                        fmt::layer()
                            .with_writer(std::io::stderr)
                            .with_target(true)
                            .with_level(true),
                    )
                    .with(filter)
                    .try_init();
            }
            Err(err) => eprintln!("ignoring invalid {ENV_LOG}: {err}"),
        }
    });
}
