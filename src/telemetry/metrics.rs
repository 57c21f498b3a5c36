use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter},
};
use std::sync::LazyLock;

pub static METER: LazyLock<Meter> = LazyLock::new(|| global::meter("cloud-cost-quote"));

// --- Domain Metrics ---

pub static QUOTES_GENERATED: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("quote.generated")
        .with_description("Number of quotes priced, by savings outcome")
        .with_unit("{quote}")
        .build()
});

pub static QUOTE_ESTIMATED_COST: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("quote.estimated_cost")
        .with_description("Estimated monthly cost per quote")
        .with_unit("{currency}")
        .build()
});

pub static QUOTES_REJECTED: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("quote.rejected")
        .with_description("Number of quote requests rejected as invalid input")
        .with_unit("{quote}")
        .build()
});

pub static DOCUMENTS_RENDERED: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("quote.document.rendered")
        .with_description("Number of quote documents rendered")
        .with_unit("{document}")
        .build()
});

pub static RENDER_FAILURES: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("quote.document.failures")
        .with_description("Number of quote documents that could not be rendered")
        .with_unit("{document}")
        .build()
});

pub static NOTIFICATIONS_SENT: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("lead.notification.sent")
        .with_description("Number of lead notifications delivered, by target")
        .with_unit("{notification}")
        .build()
});

pub static NOTIFICATION_FAILURES: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("lead.notification.failures")
        .with_description("Number of lead notifications that failed or timed out, by target")
        .with_unit("{notification}")
        .build()
});

// --- HTTP Metrics ---

pub static HTTP_REQUESTS_TOTAL: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("http.requests.total")
        .with_description("Total number of HTTP requests")
        .with_unit("{request}")
        .build()
});

pub static HTTP_REQUEST_DURATION: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("http.request.duration")
        .with_description("HTTP request duration in milliseconds")
        .with_unit("ms")
        .with_boundaries(vec![
            1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0,
        ])
        .build()
});
