use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use crate::domain::subscriber::{Subscriber, UnsubscribeTarget};
use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::subscriber_status::SubscriberStatus;
use crate::domain::subscription_token::{TokenHash, UnsubscribeToken};
use crate::repository::SubscriberRepository;

const SUBSCRIBER_COLUMNS: &str = "id, email, status, confirmation_token_hash, \
    confirmation_token_expires_at, unsubscribe_token, created_at, confirmed_at, unsubscribed_at";

#[derive(Debug, Clone)]
pub struct PostgresSubscriberRepository {
    pool: PgPool,
}

impl PostgresSubscriberRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn subscriber_from_row(row: &PgRow) -> Result<Subscriber, anyhow::Error> {
    let confirmation_token: Option<String> = row.try_get("confirmation_token_hash")?;

    Ok(Subscriber {
        id: row.try_get("id")?,
        email: SubscriberEmail::parse(row.try_get("email")?).map_err(anyhow::Error::msg)?,
        status: SubscriberStatus::parse(row.try_get("status")?).map_err(anyhow::Error::msg)?,
        confirmation_token: confirmation_token.map(TokenHash::from_stored),
        confirmation_token_expires_at: row.try_get("confirmation_token_expires_at")?,
        unsubscribe_token: UnsubscribeToken::parse(row.try_get("unsubscribe_token")?)
            .map_err(anyhow::Error::msg)?,
        created_at: row.try_get("created_at")?,
        confirmed_at: row.try_get("confirmed_at")?,
        unsubscribed_at: row.try_get("unsubscribed_at")?,
    })
}

fn log_query_error(err: sqlx::Error) -> sqlx::Error {
    tracing::error!("Failed to execute query: {:?}", err);
    err
}

#[async_trait]
impl SubscriberRepository for PostgresSubscriberRepository {
    #[tracing::instrument(name = "Find subscriber by email", skip(self, email))]
    async fn find_by_email(
        &self,
        email: &SubscriberEmail,
    ) -> Result<Option<Subscriber>, anyhow::Error> {
        let query = format!(
            "SELECT {} FROM subscriptions WHERE email = $1",
            SUBSCRIBER_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(email.as_ref())
            .fetch_optional(&self.pool)
            .await
            .map_err(log_query_error)?;

        row.as_ref().map(subscriber_from_row).transpose()
    }

    #[tracing::instrument(
        name = "Insert a new subscriber into the database",
        skip(self, subscriber),
        fields(subscriber_id = %subscriber.id)
    )]
    async fn insert(&self, subscriber: &Subscriber) -> Result<bool, anyhow::Error> {
        let confirmation_token: Option<&str> =
            subscriber.confirmation_token.as_ref().map(AsRef::as_ref);
        let result = sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, email, status, confirmation_token_hash, confirmation_token_expires_at,
                unsubscribe_token, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(subscriber.id)
        .bind(subscriber.email.as_ref())
        .bind(subscriber.status.as_ref())
        .bind(confirmation_token)
        .bind(subscriber.confirmation_token_expires_at)
        .bind(subscriber.unsubscribe_token.as_ref())
        .bind(subscriber.created_at)
        .execute(&self.pool)
        .await
        .map_err(log_query_error)?;

        Ok(result.rows_affected() == 1)
    }

    #[tracing::instrument(name = "Reissue a confirmation token", skip(self, token))]
    async fn reissue_confirmation_token(
        &self,
        subscriber_id: Uuid,
        expected_status: SubscriberStatus,
        token: &TokenHash,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, anyhow::Error> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = 'pending',
                confirmation_token_hash = $3,
                confirmation_token_expires_at = $4,
                unsubscribed_at = NULL
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(subscriber_id)
        .bind(expected_status.as_ref())
        .bind(token.as_ref())
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(log_query_error)?;

        Ok(result.rows_affected() == 1)
    }

    #[tracing::instrument(name = "Mark subscriber as confirmed", skip(self, token))]
    async fn confirm(
        &self,
        token: &TokenHash,
        now: DateTime<Utc>,
    ) -> Result<Option<Subscriber>, anyhow::Error> {
        // Concurrent confirmations serialize on the row lock; the losers re-check the
        // predicate against the spent token and match nothing.
        let query = format!(
            r#"
            UPDATE subscriptions
            SET status = 'confirmed',
                confirmation_token_hash = NULL,
                confirmation_token_expires_at = NULL,
                confirmed_at = COALESCE(confirmed_at, $2)
            WHERE confirmation_token_hash = $1
              AND status = 'pending'
              AND confirmation_token_expires_at > $2
            RETURNING {}
            "#,
            SUBSCRIBER_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(token.as_ref())
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(log_query_error)?;

        row.as_ref().map(subscriber_from_row).transpose()
    }

    #[tracing::instrument(name = "Mark subscriber as unsubscribed", skip(self, target))]
    async fn unsubscribe(
        &self,
        target: &UnsubscribeTarget,
        now: DateTime<Utc>,
    ) -> Result<Option<Subscriber>, anyhow::Error> {
        let predicate = match target {
            UnsubscribeTarget::Id(_) => "id = $1",
            UnsubscribeTarget::Token(_) => "unsubscribe_token = $1",
        };
        let sql = format!(
            r#"
            UPDATE subscriptions
            SET status = 'unsubscribed',
                confirmation_token_hash = NULL,
                confirmation_token_expires_at = NULL,
                unsubscribed_at = COALESCE(unsubscribed_at, $2)
            WHERE {}
            RETURNING {}
            "#,
            predicate, SUBSCRIBER_COLUMNS
        );
        let query = match target {
            UnsubscribeTarget::Id(id) => sqlx::query(&sql).bind(*id),
            UnsubscribeTarget::Token(token) => {
                let token: &str = token.as_ref();
                sqlx::query(&sql).bind(token)
            }
        };
        let row = query
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(log_query_error)?;

        row.as_ref().map(subscriber_from_row).transpose()
    }

    #[tracing::instrument(name = "List subscribers", skip(self))]
    async fn list(
        &self,
        status: Option<SubscriberStatus>,
    ) -> Result<Vec<Subscriber>, anyhow::Error> {
        let query = format!(
            r#"
            SELECT {}
            FROM subscriptions
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY created_at
            "#,
            SUBSCRIBER_COLUMNS
        );
        let status: Option<&str> = status.as_ref().map(AsRef::as_ref);
        let rows = sqlx::query(&query)
            .bind(status)
            .fetch_all(&self.pool)
            .await
            .map_err(log_query_error)?;

        rows.iter().map(subscriber_from_row).collect()
    }
}
