pub mod admin;
mod health_check;
mod subscriptions;
mod subscriptions_confirm;
mod unsubscribe;

pub use admin::{list_subscribers, publish_newsletter, AdminApiKey};
pub use health_check::health_check;
pub use subscriptions::handle_create_subscription;
pub use subscriptions_confirm::handle_confirm_subscription;
pub use unsubscribe::{handle_unsubscribe, handle_unsubscribe_link};
