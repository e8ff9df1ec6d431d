//! Session Scheduler
//!
//! Cancellable periodic tickers for the proctoring loop. Ticks that are
//! missed while a handler is still running are skipped, never replayed in a
//! burst, so two cycles of the same cadence can never overlap.

mod scheduler;

pub use scheduler::{CancelToken, CadenceConfig, Ticker};
