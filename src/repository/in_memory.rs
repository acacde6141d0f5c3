//! Test double that keeps rows in a mutex-guarded vector. Each method holds the lock for its
//! whole body, which gives the same all-or-nothing behavior as the conditional SQL statements.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Mutex;
use uuid::Uuid;

use crate::domain::subscriber::{Subscriber, UnsubscribeTarget};
use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::subscriber_status::SubscriberStatus;
use crate::domain::subscription_token::TokenHash;
use crate::repository::SubscriberRepository;

#[derive(Default)]
pub struct InMemorySubscriberRepository {
    rows: Mutex<Vec<Subscriber>>,
    unavailable: Mutex<bool>,
}

impl InMemorySubscriberRepository {
    pub fn snapshot(&self) -> Vec<Subscriber> {
        self.rows.lock().unwrap().clone()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap() = unavailable;
    }

    fn check_available(&self) -> Result<(), anyhow::Error> {
        if *self.unavailable.lock().unwrap() {
            anyhow::bail!("connection refused");
        }
        Ok(())
    }
}

#[async_trait]
impl SubscriberRepository for InMemorySubscriberRepository {
    async fn find_by_email(
        &self,
        email: &SubscriberEmail,
    ) -> Result<Option<Subscriber>, anyhow::Error> {
        self.check_available()?;
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|row| &row.email == email).cloned())
    }

    async fn insert(&self, subscriber: &Subscriber) -> Result<bool, anyhow::Error> {
        self.check_available()?;
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|row| row.email == subscriber.email) {
            return Ok(false);
        }
        rows.push(subscriber.clone());
        Ok(true)
    }

    async fn reissue_confirmation_token(
        &self,
        subscriber_id: Uuid,
        expected_status: SubscriberStatus,
        token: &TokenHash,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, anyhow::Error> {
        self.check_available()?;
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|row| row.id == subscriber_id && row.status == expected_status);

        Ok(match row {
            Some(row) => {
                row.status = SubscriberStatus::Pending;
                row.confirmation_token = Some(token.clone());
                row.confirmation_token_expires_at = Some(expires_at);
                row.unsubscribed_at = None;
                true
            }
            None => false,
        })
    }

    async fn confirm(
        &self,
        token: &TokenHash,
        now: DateTime<Utc>,
    ) -> Result<Option<Subscriber>, anyhow::Error> {
        self.check_available()?;
        let mut rows = self.rows.lock().unwrap();
        let row = rows.iter_mut().find(|row| {
            row.status.is_pending()
                && row.confirmation_token.as_ref() == Some(token)
                && row
                    .confirmation_token_expires_at
                    .map_or(false, |expires_at| expires_at > now)
        });

        Ok(row.map(|row| {
            row.status = SubscriberStatus::Confirmed;
            row.confirmation_token = None;
            row.confirmation_token_expires_at = None;
            row.confirmed_at.get_or_insert(now);
            row.clone()
        }))
    }

    async fn unsubscribe(
        &self,
        target: &UnsubscribeTarget,
        now: DateTime<Utc>,
    ) -> Result<Option<Subscriber>, anyhow::Error> {
        self.check_available()?;
        let mut rows = self.rows.lock().unwrap();
        let row = rows.iter_mut().find(|row| match target {
            UnsubscribeTarget::Id(id) => &row.id == id,
            UnsubscribeTarget::Token(token) => &row.unsubscribe_token == token,
        });

        Ok(row.map(|row| {
            row.status = SubscriberStatus::Unsubscribed;
            row.confirmation_token = None;
            row.confirmation_token_expires_at = None;
            row.unsubscribed_at.get_or_insert(now);
            row.clone()
        }))
    }

    async fn list(
        &self,
        status: Option<SubscriberStatus>,
    ) -> Result<Vec<Subscriber>, anyhow::Error> {
        self.check_available()?;
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|row| status.map_or(true, |status| row.status == status))
            .cloned()
            .collect())
    }
}
