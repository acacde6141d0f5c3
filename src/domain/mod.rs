pub mod subscriber;
pub mod subscriber_email;
pub mod subscriber_status;
pub mod subscription_token;
