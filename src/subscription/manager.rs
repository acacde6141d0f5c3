use chrono::Utc;
use std::sync::Arc;

use crate::domain::subscriber::{Subscriber, UnsubscribeTarget};
use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::subscriber_status::SubscriberStatus;
use crate::domain::subscription_token::{ConfirmationToken, UnsubscribeToken};
use crate::email_client::NotificationDispatcher;
use crate::repository::SubscriberRepository;
use crate::subscription::SubscriptionError;

/// Owns the double opt-in lifecycle: `pending` -> `confirmed` -> `unsubscribed`.
///
/// The manager keeps no subscriber state between calls. The repository is the only source of
/// truth and every transition is delegated to one of its conditional writes.
#[derive(Clone)]
pub struct SubscriptionManager {
    repository: Arc<dyn SubscriberRepository>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    base_url: String,
    confirmation_token_ttl: chrono::Duration,
}

impl SubscriptionManager {
    pub fn new(
        repository: Arc<dyn SubscriberRepository>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        base_url: String,
        confirmation_token_ttl: chrono::Duration,
    ) -> Self {
        Self {
            repository,
            dispatcher,
            base_url,
            confirmation_token_ttl,
        }
    }

    /// Registers `email` and mails it a confirmation link.
    ///
    /// The result is the same whether the address was unknown, pending, confirmed or
    /// unsubscribed.
    #[tracing::instrument(name = "Subscribe an email address", skip(self, email))]
    pub async fn subscribe(&self, email: String) -> Result<(), SubscriptionError> {
        let email = SubscriberEmail::parse(email).map_err(SubscriptionError::Validation)?;

        let existing = self
            .repository
            .find_by_email(&email)
            .await
            .map_err(SubscriptionError::Storage)?;

        let issued = match existing {
            None => self.create_pending(email).await?,
            Some(subscriber) if subscriber.status.is_confirmed() => {
                tracing::info!(subscriber_id = %subscriber.id, "Subscriber is already confirmed");
                None
            }
            Some(subscriber) => self.reissue_token(subscriber).await?,
        };

        if let Some((subscriber, token)) = issued {
            self.send_confirmation(&subscriber, &token).await;
        }

        Ok(())
    }

    /// Spends a confirmation token and returns the address it confirmed.
    ///
    /// Tokens are single-use: confirming twice with the same token fails the second time.
    #[tracing::instrument(name = "Confirm a pending subscriber", skip(self, token))]
    pub async fn confirm(&self, token: String) -> Result<SubscriberEmail, SubscriptionError> {
        if token.trim().is_empty() {
            return Err(SubscriptionError::Validation(
                "Confirmation token is missing".to_string(),
            ));
        }
        let token = ConfirmationToken::parse(token).map_err(|_| SubscriptionError::InvalidToken)?;

        let subscriber = self
            .repository
            .confirm(&token.hash(), Utc::now())
            .await
            .map_err(SubscriptionError::Storage)?
            .ok_or(SubscriptionError::InvalidToken)?;

        tracing::info!(subscriber_id = %subscriber.id, "Subscriber confirmed");

        Ok(subscriber.email)
    }

    /// Unsubscribes from any state. Repeating the call on an unsubscribed row succeeds.
    #[tracing::instrument(name = "Unsubscribe a subscriber", skip(self, target))]
    pub async fn unsubscribe(&self, target: UnsubscribeTarget) -> Result<(), SubscriptionError> {
        let subscriber = self
            .repository
            .unsubscribe(&target, Utc::now())
            .await
            .map_err(SubscriptionError::Storage)?
            .ok_or(SubscriptionError::NotFound)?;

        tracing::info!(subscriber_id = %subscriber.id, "Subscriber unsubscribed");

        Ok(())
    }

    #[tracing::instrument(name = "List subscribers", skip(self))]
    pub async fn subscribers(
        &self,
        status: Option<SubscriberStatus>,
    ) -> Result<Vec<Subscriber>, SubscriptionError> {
        self.repository
            .list(status)
            .await
            .map_err(SubscriptionError::Storage)
    }

    pub fn confirmation_link(&self, token: &ConfirmationToken) -> String {
        format!(
            "{}/subscriptions/confirm?token={}",
            self.base_url,
            token.as_ref()
        )
    }

    pub fn unsubscribe_link(&self, token: &UnsubscribeToken) -> String {
        format!(
            "{}/subscriptions/unsubscribe?token={}",
            self.base_url,
            token.as_ref()
        )
    }

    async fn create_pending(
        &self,
        email: SubscriberEmail,
    ) -> Result<Option<(Subscriber, ConfirmationToken)>, SubscriptionError> {
        let token = ConfirmationToken::generate();
        let now = Utc::now();
        let subscriber =
            Subscriber::new_pending(email, token.hash(), now + self.confirmation_token_ttl, now);

        let inserted = self
            .repository
            .insert(&subscriber)
            .await
            .map_err(SubscriptionError::Storage)?;

        if !inserted {
            // A concurrent request created the row first and sends its own confirmation.
            tracing::info!("Subscriber was created by a concurrent request");
            return Ok(None);
        }

        Ok(Some((subscriber, token)))
    }

    /// Gives a `pending` row a new token (the old one stops working) and re-enters an
    /// `unsubscribed` row into `pending`.
    async fn reissue_token(
        &self,
        subscriber: Subscriber,
    ) -> Result<Option<(Subscriber, ConfirmationToken)>, SubscriptionError> {
        let token = ConfirmationToken::generate();
        let expires_at = Utc::now() + self.confirmation_token_ttl;

        let reissued = self
            .repository
            .reissue_confirmation_token(subscriber.id, subscriber.status, &token.hash(), expires_at)
            .await
            .map_err(SubscriptionError::Storage)?;

        if !reissued {
            tracing::info!(
                subscriber_id = %subscriber.id,
                "Subscriber changed state concurrently, no token reissued"
            );
            return Ok(None);
        }

        Ok(Some((subscriber, token)))
    }

    async fn send_confirmation(&self, subscriber: &Subscriber, token: &ConfirmationToken) {
        let confirmation_link = self.confirmation_link(token);
        let unsubscribe_link = self.unsubscribe_link(&subscriber.unsubscribe_token);

        // The row stays pending when delivery fails; subscribing again sends a new link.
        if let Err(err) = self
            .dispatcher
            .send_confirmation(&subscriber.email, &confirmation_link, &unsubscribe_link)
            .await
        {
            tracing::error!(
                subscriber_id = %subscriber.id,
                "Failed to send a confirmation email: {:?}",
                err
            );
        }
    }
}
