//! Metrics and tracing hooks.
//!
//! With the `metrics` feature, [`METRICS`] records statement counts, errors
//! and durations plus the number of chunks issued by batched hydration, and
//! exposes them in Prometheus text format through [`BookshelfMetrics::render`].
//! With the `tracing` feature, [`tracing_helpers`] creates the spans opened
//! around statements, connections and hydration calls.

#[cfg(feature = "metrics")]
pub use prometheus_metrics::{BookshelfMetrics, METRICS};

#[cfg(feature = "metrics")]
mod prometheus_metrics {
    use once_cell::sync::Lazy;
    use opentelemetry::metrics::{Counter, Histogram, MeterProvider};
    use opentelemetry_sdk::metrics::SdkMeterProvider;
    use prometheus::{Registry, TextEncoder};
    use std::time::Duration;

    pub static METRICS: Lazy<BookshelfMetrics> = Lazy::new(BookshelfMetrics::init);

    pub struct BookshelfMetrics {
        registry: Registry,
        // Keeps the reader alive for the lifetime of the instruments.
        _provider: SdkMeterProvider,
        pub queries_total: Counter<u64>,
        pub query_errors_total: Counter<u64>,
        pub query_duration: Histogram<f64>,
        pub hydration_chunks_total: Counter<u64>,
    }

    impl BookshelfMetrics {
        pub fn init() -> Self {
            let registry = Registry::new();
            let provider = match opentelemetry_prometheus::exporter()
                .with_registry(registry.clone())
                .build()
            {
                Ok(exporter) => SdkMeterProvider::builder().with_reader(exporter).build(),
                Err(e) => {
                    log::warn!(
                        "prometheus exporter unavailable, metrics will not be exported: {e}"
                    );
                    SdkMeterProvider::builder().build()
                }
            };
            let meter = provider.meter("bookshelf");

            let queries_total = meter
                .u64_counter("bookshelf_queries_total")
                .with_description("Total statements executed")
                .build();

            let query_errors_total = meter
                .u64_counter("bookshelf_query_errors_total")
                .with_description("Statements that returned an error")
                .build();

            let query_duration = meter
                .f64_histogram("bookshelf_query_duration_seconds")
                .with_description("Duration of statements")
                .build();

            let hydration_chunks_total = meter
                .u64_counter("bookshelf_hydration_chunks_total")
                .with_description("Join queries issued by batched many-to-many hydration")
                .build();

            Self {
                registry,
                _provider: provider,
                queries_total,
                query_errors_total,
                query_duration,
                hydration_chunks_total,
            }
        }

        pub fn record_query_duration(&self, elapsed: Duration) {
            self.queries_total.add(1, &[]);
            self.query_duration.record(elapsed.as_secs_f64(), &[]);
        }

        pub fn record_query_error(&self) {
            self.query_errors_total.add(1, &[]);
        }

        pub fn record_hydration_chunks(&self, chunks: u64) {
            self.hydration_chunks_total.add(chunks, &[]);
        }

        /// Current values in Prometheus text exposition format.
        pub fn render(&self) -> String {
            let families = self.registry.gather();
            TextEncoder::new().encode_to_string(&families).unwrap_or_else(|e| {
                log::warn!("failed to encode metrics: {e}");
                String::new()
            })
        }
    }
}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::{info_span, Span};

    /// Longest statement prefix recorded on a span.
    const MAX_STATEMENT_LEN: usize = 200;

    pub fn execute_query_span(sql: &str) -> Span {
        info_span!(
            "bookshelf.execute_query",
            db.system = "postgresql",
            db.statement = %truncate(sql)
        )
    }

    pub fn acquire_connection_span() -> Span {
        info_span!("bookshelf.connect", db.system = "postgresql")
    }

    /// Span around one hydration call.
    pub fn hydration_span(relation: &str, strategy: &str, parents: usize) -> Span {
        info_span!(
            "bookshelf.hydrate",
            relation = %relation,
            strategy = %strategy,
            parents = parents
        )
    }

    fn truncate(sql: &str) -> &str {
        match sql.char_indices().nth(MAX_STATEMENT_LEN) {
            Some((idx, _)) => &sql[..idx],
            None => sql,
        }
    }

}
