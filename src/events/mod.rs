//! # Events Module
//!
//! Progress reporting for the organize pipeline.
//!
//! The pipeline pushes events into a channel; the CLI drains it on a
//! separate thread to drive the progress bar. Headless callers pass
//! [`null_sender`].
//!
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Organize(OrganizeEvent::Progress(p)) = event {
//!             println!("{}/{}", p.completed, p.total);
//!         }
//!     }
//! });
//!
//! pipeline.run_with_events(&sender)?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
