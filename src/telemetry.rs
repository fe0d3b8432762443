//! Tracing setup: console logging plus optional OTLP span export

use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_semantic_conventions::resource::{SERVICE_NAME, SERVICE_VERSION};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;
use crate::{AdvisorError, Result};

const SERVICE: &str = env!("CARGO_PKG_NAME");

/// Flushes exported spans when dropped
#[must_use = "dropping the guard shuts down span export"]
pub struct TelemetryGuard {
    provider: Option<SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("Failed to shut down tracer provider: {e}");
        }
    }
}

/// Build the `EnvFilter`; `RUST_LOG` wins over the configured level
fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

fn tracer_provider(endpoint: &str) -> Result<SdkTracerProvider> {
    let exporter = SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| AdvisorError::config(format!("Failed to create OTLP exporter: {e}")))?;

    let resource = Resource::builder()
        .with_attributes([
            KeyValue::new(SERVICE_NAME, SERVICE),
            KeyValue::new(SERVICE_VERSION, crate::VERSION),
        ])
        .build();

    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource)
        .build())
}

/// Install the global subscriber. Call once, early in `main`.
pub fn init_tracing(config: &LoggingConfig) -> Result<TelemetryGuard> {
    let fmt_layer = match config.format.as_str() {
        "json" => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed(),
        _ => tracing_subscriber::fmt::layer().with_target(true).boxed(),
    };

    let provider = config
        .otlp_endpoint
        .as_deref()
        .map(tracer_provider)
        .transpose()?;

    let otel_layer = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer(SERVICE)));

    tracing_subscriber::registry()
        .with(env_filter(&config.level))
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()
        .map_err(|e| AdvisorError::config(format!("Failed to install subscriber: {e}")))?;

    info!(
        "Logging initialized: level={}, format={}, otlp={}",
        config.level,
        config.format,
        config.otlp_endpoint.as_deref().unwrap_or("off")
    );

    Ok(TelemetryGuard { provider })
}
