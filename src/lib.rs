pub mod config;
pub mod error;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod pricing;
pub mod report;
pub mod routes;
pub mod telemetry;

pub use config::Config;

use notify::Notifier;
use pricing::RateCard;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Resolved once at startup from the price sheet or the configured rates.
    pub rates: RateCard,
    pub notifier: Notifier,
}
