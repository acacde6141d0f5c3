use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::subscriber_status::SubscriberStatus;
use crate::domain::subscription_token::{TokenHash, UnsubscribeToken};

#[derive(Debug, Clone, serde::Serialize)]
pub struct Subscriber {
    pub id: Uuid,
    pub email: SubscriberEmail,
    pub status: SubscriberStatus,
    #[serde(skip)]
    pub confirmation_token: Option<TokenHash>,
    #[serde(skip)]
    pub confirmation_token_expires_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub unsubscribe_token: UnsubscribeToken,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub unsubscribed_at: Option<DateTime<Utc>>,
}

impl Subscriber {
    /// A brand new `pending` subscriber holding the hash of its first confirmation token.
    pub fn new_pending(
        email: SubscriberEmail,
        confirmation_token: TokenHash,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Subscriber {
        Subscriber {
            id: Uuid::new_v4(),
            email,
            status: SubscriberStatus::Pending,
            confirmation_token: Some(confirmation_token),
            confirmation_token_expires_at: Some(expires_at),
            unsubscribe_token: UnsubscribeToken::generate(),
            created_at: now,
            confirmed_at: None,
            unsubscribed_at: None,
        }
    }
}

/// How an unsubscribe request identifies its subscriber.
#[derive(Debug, Clone)]
pub enum UnsubscribeTarget {
    Id(Uuid),
    Token(UnsubscribeToken),
}
