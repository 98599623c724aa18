// Path: crates/telemetry/src/init.rs
use cohort_types::config::TelemetryConfig;
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Layer, Registry};

static INSTALLED: OnceCell<()> = OnceCell::new();

/// Initializes the global `tracing` subscriber.
///
/// `RUST_LOG` wins over `config.log_level`. Records emitted through the `log`
/// facade are bridged into `tracing`. Only the first successful call installs
/// anything; later calls return `Ok(())`.
pub fn init_tracing(config: &TelemetryConfig) -> Result<(), anyhow::Error> {
    INSTALLED
        .get_or_try_init(|| install(config))
        .map(|_| ())
}

fn install(config: &TelemetryConfig) -> Result<(), anyhow::Error> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;
    let fmt_layer = if config.json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };
    let subscriber = Registry::default().with(filter).with(fmt_layer);
    tracing_log::LogTracer::init()?;
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_a_no_op() {
        let config = TelemetryConfig::default();
        init_tracing(&config).unwrap();
        init_tracing(&TelemetryConfig {
            log_level: "debug".into(),
            json: false,
        })
        .unwrap();
        tracing::info!(target: "storage", "subscriber installed");
        log::info!("bridged from log");
    }
}
