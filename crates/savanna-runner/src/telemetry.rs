//! Log output and span export for the runner.
//!
//! Field events from `savanna_world` (births, catches, population snapshots)
//! go through the same subscriber as the runner's own session events.

use anyhow::Result;
use opentelemetry::{global, trace::TracerProvider as _, KeyValue};
use opentelemetry_sdk::{
    trace::{Config, RandomIdGenerator, Sampler, TracerProvider},
    Resource,
};
use opentelemetry_semantic_conventions::resource::{SERVICE_NAME, SERVICE_VERSION};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_SERVICE_NAME: &str = "savanna-runner";
const DEFAULT_FILTER: &str = "info,savanna_runner=debug,savanna_world=debug";

fn service_resource() -> Resource {
    let service_name =
        std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| DEFAULT_SERVICE_NAME.to_string());

    Resource::new(vec![
        KeyValue::new(SERVICE_NAME, service_name),
        KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
    ])
}

/// Spans are only sampled when somewhere is listening for them
fn tracer_provider(otel_endpoint: Option<&str>) -> TracerProvider {
    let sampler = if otel_endpoint.is_some() {
        Sampler::AlwaysOn
    } else {
        Sampler::AlwaysOff
    };

    TracerProvider::builder()
        .with_config(
            Config::default()
                .with_sampler(sampler)
                .with_id_generator(RandomIdGenerator::default())
                .with_resource(service_resource()),
        )
        .build()
}

pub fn init_telemetry(otel_endpoint: Option<&str>) -> Result<()> {
    let provider = tracer_provider(otel_endpoint);
    global::set_tracer_provider(provider.clone());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(tracing_opentelemetry::layer().with_tracer(provider.tracer(DEFAULT_SERVICE_NAME)))
        .init();

    match otel_endpoint {
        Some(endpoint) => info!(endpoint = %endpoint, "Telemetry ready, sampling session spans"),
        None => info!("Telemetry ready, logging only"),
    }
    Ok(())
}

pub fn shutdown_telemetry() {
    info!("Flushing telemetry");
    global::shutdown_tracer_provider();
}

/// Emit a session-level metric as a structured event.
///
/// `kind` is `gauge` or `counter`; extra `key = value` pairs become fields.
#[macro_export]
macro_rules! record_metric {
    (gauge, $name:expr, $value:expr $(, $key:ident = $val:expr)*) => {
        tracing::info!(
            gauge_name = $name,
            gauge_value = $value,
            $($key = $val,)*
            "Session gauge"
        );
    };
    (counter, $name:expr, $value:expr $(, $key:ident = $val:expr)*) => {
        tracing::info!(
            counter_name = $name,
            counter_value = $value,
            $($key = $val,)*
            "Session counter"
        );
    };
}

#[macro_export]
macro_rules! record_gauge {
    ($($args:tt)*) => {
        $crate::record_metric!(gauge, $($args)*)
    };
}

#[macro_export]
macro_rules! record_counter {
    ($($args:tt)*) => {
        $crate::record_metric!(counter, $($args)*)
    };
}
