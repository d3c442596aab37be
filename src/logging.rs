// 📝 Logging - One-time tracing subscriber setup
//
// The library only emits `tracing` events. Hosts that want them printed call
// `init` once; `RUST_LOG` overrides the profile's default filter.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Human-readable output, debug level
    Development,
    /// JSON output, info level
    Production,
}

impl Profile {
    fn default_filter(&self) -> &'static str {
        match self {
            Profile::Development => "data_comparator=debug",
            Profile::Production => "data_comparator=info",
        }
    }
}

static INIT_ONCE: Once = Once::new();

/// Install the global subscriber; later calls are no-ops
pub fn init(profile: Profile) {
    INIT_ONCE.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(profile.default_filter()));

        // A host may already own the global subscriber
        let _ = match profile {
            Profile::Development => tracing_subscriber::fmt().with_env_filter(filter).try_init(),
            Profile::Production => tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .try_init(),
        };
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_idempotent() {
        init(Profile::Development);
        init(Profile::Development);
        init(Profile::Production);

        tracing::info!("logging initialized");
    }

    #[test]
    fn test_default_filters() {
        assert_eq!(Profile::Development.default_filter(), "data_comparator=debug");
        assert_ne!(Profile::Development, Profile::Production);
    }
}
