//! Photo organization module.
//!
//! Turns a file with a resolved date into a copy inside the dated output
//! tree: [`DestinationPlanner`] picks the path, [`TransferExecutor`] does
//! the copy, and [`OperationSummary`] keeps score.

mod executor;
mod planner;
mod types;

pub use executor::{TransferExecutor, TransferOutcome, MAX_RETRY_ATTEMPTS};
pub use planner::{sanitize_filename, subsecond_token, DestinationPlanner, UNKNOWN_FOLDER};
pub use types::*;
