pub mod engine;
pub mod price_sheet;

pub use engine::{Estimate, LineItem, LineItemKind, RateCard, SavingsOutcome, Usage, estimate};
