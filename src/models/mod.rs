pub mod quote;

pub use quote::{ContactDetails, Quote, QuoteRequest};
