//! Process-wide tracing setup for the collectors

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::{SimpleSpanProcessor, TracerProvider};
use std::sync::{Arc, Mutex, OnceLock};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Filter used when `RUST_LOG` is unset or unparseable: collector output at
/// info, dependencies (sqlx statement logs in particular) at warn.
pub const DEFAULT_LOG_FILTER: &str = "warn,dbo_core=info,dbo_postgres=info,dbo_telemetry=info";

static CRAWL_TRACER_PROVIDER: OnceLock<Arc<TracerProvider>> = OnceLock::new();

type SpanExportHook = Box<dyn FnOnce() -> SimpleSpanProcessor + Send>;

/// `None` once telemetry is initialized
static PENDING_EXPORT_HOOKS: Mutex<Option<Vec<SpanExportHook>>> = Mutex::new(Some(Vec::new()));

/// Forward crawl spans to the host agent's exporter.
///
/// Only hooks registered before [`init_telemetry`] take effect.
pub fn register_span_processor(hook: SpanExportHook) {
    let mut pending = PENDING_EXPORT_HOOKS
        .lock()
        .unwrap_or_else(|e| e.into_inner());
    match pending.as_mut() {
        Some(hooks) => hooks.push(hook),
        None => tracing::warn!("span export hook registered after telemetry init; ignored"),
    }
}

/// Filter from `RUST_LOG`, falling back to [`DEFAULT_LOG_FILTER`]
pub fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Install the crawl tracer and log subscriber.
///
/// Collector events carry structured fields (`collector`, `datname`,
/// `schema`, `error`), so output is one JSON object per line. A second call
/// keeps the first subscriber.
///
/// ```rust,no_run
/// dbo_telemetry::init_telemetry();
/// ```
pub fn init_telemetry() {
    let hooks = PENDING_EXPORT_HOOKS
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .take()
        .unwrap_or_default();

    let provider = hooks
        .into_iter()
        .fold(TracerProvider::builder(), |builder, hook| {
            builder.with_span_processor(hook())
        })
        .build();
    let tracer = provider.tracer(crate::attributes::SYSTEM_NAME);
    let _ = CRAWL_TRACER_PROVIDER.set(Arc::new(provider));

    let _ = tracing_subscriber::registry()
        .with(log_filter())
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_target(true),
        )
        .try_init();
}

pub fn tracer_provider() -> Option<Arc<TracerProvider>> {
    CRAWL_TRACER_PROVIDER.get().cloned()
}
