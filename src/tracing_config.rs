//! Logging setup for declaration builds.
//!
//! Entirely env-driven and free when unused: nothing is installed unless
//! `DTSPACK_LOG` (or plain `RUST_LOG`) is set, and all output goes to
//! stderr so bundled declaration text and diagnostics own stdout.
//!
//! `DTSPACK_LOG` takes the usual filter syntax, e.g. `debug` or
//! `dtspack::module_resolver=trace,dtspack::engine=debug`.
//!
//! `DTSPACK_LOG_FORMAT` picks the sink layout:
//!
//! | value  | layout                                      |
//! |--------|---------------------------------------------|
//! | `text` | flat `tracing-subscriber` lines (default)   |
//! | `tree` | indented span hierarchy via `tracing-tree`  |
//! | `json` | newline-delimited JSON, one object per event |

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt};

/// Install the global subscriber according to the environment. Safe to call
/// exactly once at startup; a no-op when no filter variable is set.
pub fn init_tracing() {
    let filter = match (
        std::env::var("DTSPACK_LOG"),
        std::env::var("RUST_LOG").is_ok(),
    ) {
        (Ok(spec), _) => EnvFilter::builder().parse_lossy(spec),
        (Err(_), true) => EnvFilter::from_default_env(),
        (Err(_), false) => return,
    };

    let format = std::env::var("DTSPACK_LOG_FORMAT").unwrap_or_default();
    match format.to_lowercase().as_str() {
        "tree" => {
            let layer = tracing_tree::HierarchicalLayer::default()
                .with_indent_amount(2)
                .with_indent_lines(true)
                .with_deferred_spans(true)
                .with_targets(true);
            Registry::default().with(filter).with(layer).init();
        }
        "json" => {
            Registry::default()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}
