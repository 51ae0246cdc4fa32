//! Log output setup
//!
//! Development logs are pretty-printed; production emits one JSON object per
//! event. `RUST_LOG` replaces the default directives in both cases
//! (e.g. `RUST_LOG=qg_core=trace,info`).

use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Environment;

/// Directives used when `RUST_LOG` is unset
///
/// Session transitions in `qg_core` and backend latency in `qg_gemini` are
/// logged at debug, so development shows them and production does not.
pub fn default_directives(env: &Environment) -> &'static str {
    match env {
        Environment::Development => {
            "info,qg_core=debug,qg_gemini=debug,qg_api=debug,tower_http=debug,hyper_util=info"
        }
        Environment::Production => "info,tower_http=info,tower_governor=warn",
    }
}

pub fn init_tracing(env: &Environment) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(env)));

    let output = match env {
        Environment::Development => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_line_number(true)
            .pretty()
            .boxed(),
        Environment::Production => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .flatten_event(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(output.with_filter(filter))
        .init();

    tracing::info!(environment = ?env, "Tracing initialized");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_parse() {
        for env in [Environment::Development, Environment::Production] {
            assert!(EnvFilter::try_new(default_directives(&env)).is_ok());
        }
    }

    #[test]
    fn test_session_logs_only_in_development() {
        assert!(default_directives(&Environment::Development).contains("qg_core=debug"));
        assert!(!default_directives(&Environment::Production).contains("qg_core"));
    }
}
