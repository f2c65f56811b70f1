//! Network settings

mod timeout;

pub use timeout::*;
