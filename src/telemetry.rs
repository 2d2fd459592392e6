//! src/telemetry.rs
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Builds a subscriber filtered by `RUST_LOG`, or by `env_filter` when
/// `RUST_LOG` is unset, that writes to `sink`.
pub fn get_subscriber<Sink>(
    env_filter: &str,
    sink: Sink,
) -> impl Subscriber + for<'a> LookupSpan<'a> + Send + Sync + use<Sink>
where
    Sink: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(env_filter));
    tracing_subscriber::registry().with(env_filter).with(
        fmt::layer()
            .with_writer(sink)
            .with_thread_ids(true)
            .with_target(false),
    )
}

pub fn init_subscriber(subscriber: impl Subscriber + Send + Sync + 'static) -> anyhow::Result<()> {
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Subscriber for test binaries: prints to stdout when `TEST_LOG` is set and
/// discards everything otherwise.
pub fn get_test_subscriber() -> Box<dyn Subscriber + Send + Sync> {
    if std::env::var("TEST_LOG").is_ok() {
        Box::new(get_subscriber("debug", std::io::stdout))
    } else {
        Box::new(get_subscriber("debug", std::io::sink))
    }
}

/// `get_subscriber` plus a layer exporting every span over OTLP/HTTP. The
/// exporter blocks on its own thread, so no async runtime is needed. Call
/// `shutdown` on the returned provider before exiting to flush pending spans.
#[cfg(feature = "otlp")]
pub fn get_otlp_subscriber<Sink>(
    service_name: &'static str,
    env_filter: &str,
    sink: Sink,
) -> anyhow::Result<(
    impl Subscriber + Send + Sync + use<Sink>,
    opentelemetry_sdk::trace::SdkTracerProvider,
)>
where
    Sink: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    use opentelemetry::trace::TracerProvider as _;

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .build()?;
    let provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
        .with_resource(
            opentelemetry_sdk::Resource::builder()
                .with_service_name(service_name)
                .build(),
        )
        .with_batch_exporter(exporter)
        .build();
    let otel_layer = tracing_opentelemetry::layer().with_tracer(provider.tracer(service_name));

    Ok((get_subscriber(env_filter, sink).with(otel_layer), provider))
}

#[cfg(feature = "otlp")]
pub fn init_tracing<Sink>(
    service_name: &'static str,
    env_filter: &str,
    sink: Sink,
) -> anyhow::Result<opentelemetry_sdk::trace::SdkTracerProvider>
where
    Sink: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let (subscriber, provider) = get_otlp_subscriber(service_name, env_filter, sink)?;
    init_subscriber(subscriber)?;
    Ok(provider)
}
