use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Installs the global subscriber once. `RUST_LOG` wins over the default
/// `expense_manager=info`; output goes to stderr so it stays out of the prompt.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("expense_manager=info"));

        let _ = fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
        tracing::debug!("tracing initialized");
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_twice_does_not_panic() {
        super::init_tracing();
        super::init_tracing();
    }
}
