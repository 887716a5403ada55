//! Connection lifecycle management
//!
//! [`Lifecycle`] is the pure reconnect policy; [`FeedConnection`] is the owned
//! handle that runs it in a background [`crate::driver::Driver`] task.

mod lifecycle;
mod manager;

pub use lifecycle::{Backoff, Lifecycle, RetryDecision};
pub use manager::FeedConnection;
