pub mod audit;
pub mod bookings;
pub mod conflict;
pub mod ledger;
pub mod payments;

pub use audit::AuditSink;
pub use bookings::BookingManager;
pub use ledger::Ledger;
pub use payments::PaymentIntake;

use crate::cache::Cache;
use crate::config::Config;
use crate::database::Database;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub database: Database,
    pub cache: Cache,
    pub config: Config,
}
