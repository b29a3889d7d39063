//! # photo-organizer CLI
//!
//! Command-line interface for the photo organizer.
//!
//! ## Usage
//! ```bash
//! photo-organizer --input ~/Camera --output ~/Photos
//! photo-organizer --config organizer.json --dry-run -vv
//! ```

mod cli;

use std::process::ExitCode;

fn main() -> ExitCode {
    cli::run()
}
