mod error;
mod manager;

pub use error::{error_chain_fmt, SubscriptionError};
pub use manager::SubscriptionManager;
