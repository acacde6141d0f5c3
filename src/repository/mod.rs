use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::subscriber::{Subscriber, UnsubscribeTarget};
use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::subscriber_status::SubscriberStatus;
use crate::domain::subscription_token::TokenHash;

#[cfg(test)]
pub mod in_memory;
mod postgres;

pub use postgres::PostgresSubscriberRepository;

/// Storage for subscriber rows.
///
/// Every method that changes a row is a single conditional write: it reports whether (or which)
/// row it touched instead of letting callers read first and write later.
#[async_trait]
pub trait SubscriberRepository: Send + Sync {
    async fn find_by_email(
        &self,
        email: &SubscriberEmail,
    ) -> Result<Option<Subscriber>, anyhow::Error>;

    /// Inserts a new row. Returns `false` when a row for the same email already exists.
    async fn insert(&self, subscriber: &Subscriber) -> Result<bool, anyhow::Error>;

    /// Moves the row back to `pending` with a fresh confirmation token, but only while it is
    /// still in `expected_status`. Returns `false` when the row changed in the meantime.
    async fn reissue_confirmation_token(
        &self,
        subscriber_id: Uuid,
        expected_status: SubscriberStatus,
        token: &TokenHash,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, anyhow::Error>;

    /// Confirms the `pending` row holding the given unexpired token and spends the token.
    async fn confirm(
        &self,
        token: &TokenHash,
        now: DateTime<Utc>,
    ) -> Result<Option<Subscriber>, anyhow::Error>;

    async fn unsubscribe(
        &self,
        target: &UnsubscribeTarget,
        now: DateTime<Utc>,
    ) -> Result<Option<Subscriber>, anyhow::Error>;

    async fn list(
        &self,
        status: Option<SubscriberStatus>,
    ) -> Result<Vec<Subscriber>, anyhow::Error>;
}
