pub mod orchestrator;

pub use orchestrator::{QuoteOutcome, generate_quote, price_quote, quote_document};
