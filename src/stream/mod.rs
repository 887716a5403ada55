//! Stream utilities for bitmap subscriptions

mod throttle;

pub use throttle::{Throttle, ThrottleExt};
