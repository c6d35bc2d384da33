//! Background job dispatcher.
//!
//! Jobs live in a postgres table. API handlers and the recurring scheduler
//! enqueue rows through [`queue::JobQueue`]; [`worker::JobWorker`] polls for
//! due jobs, claims them with `FOR UPDATE SKIP LOCKED`, runs them, and retries
//! failures with exponential backoff until `max_attempts` is exhausted.

pub mod notify;
pub mod queue;
pub mod schedule;
pub mod worker;

pub use queue::JobQueue;
pub use worker::JobWorker;
