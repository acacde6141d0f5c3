use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use std::time;

use crate::domain::subscriber_email::SubscriberEmail;

/// Sends the messages the subscription lifecycle produces.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn send_confirmation(
        &self,
        recipient: &SubscriberEmail,
        confirmation_link: &str,
        unsubscribe_link: &str,
    ) -> Result<(), anyhow::Error>;

    async fn send_newsletter_issue(
        &self,
        recipient: &SubscriberEmail,
        title: &str,
        html_content: &str,
        unsubscribe_link: &str,
    ) -> Result<(), anyhow::Error>;
}

pub struct EmailClient {
    http_client: Client,
    base_url: String,
    sender: SubscriberEmail,
    api_key: Secret<String>,
}

#[derive(serde::Serialize)]
pub struct SendEmailBody {
    personalizations: Vec<SengridPersonalization>,
    from: SengridEmail,
    subject: String,
    content: Vec<SengridContent>,
}

#[derive(serde::Serialize)]
struct SengridEmail {
    email: String,
}

#[derive(serde::Serialize)]
struct SengridPersonalization {
    to: Vec<SengridEmail>,
}

#[derive(serde::Serialize)]
struct SengridContent {
    #[serde(rename = "type")]
    content_type: String,
    value: String,
}

impl EmailClient {
    pub fn new(
        base_url: String,
        sender: SubscriberEmail,
        api_key: Secret<String>,
        timeout: time::Duration,
    ) -> Result<EmailClient, reqwest::Error> {
        let http_client = Client::builder().timeout(timeout).build()?;

        Ok(EmailClient {
            http_client,
            base_url,
            sender,
            api_key,
        })
    }

    pub async fn send_email(
        &self,
        recipient: &SubscriberEmail,
        subject: &str,
        html_content: &str,
    ) -> Result<(), reqwest::Error> {
        let url = format!("{}/mail/send", self.base_url);
        let body = SendEmailBody {
            from: SengridEmail {
                email: String::from(self.sender.as_ref()),
            },
            personalizations: vec![SengridPersonalization {
                to: vec![SengridEmail {
                    email: String::from(recipient.as_ref()),
                }],
            }],
            subject: String::from(subject),
            content: vec![SengridContent {
                content_type: String::from("text/html"),
                value: String::from(html_content),
            }],
        };

        self.http_client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&body)
            .send()
            .await?
            .error_for_status()?; // return an error when server response status code is 4xx or 5xx

        Ok(())
    }
}

#[async_trait]
impl NotificationDispatcher for EmailClient {
    #[tracing::instrument(
        name = "Send a confirmation email to a new subscriber",
        skip(self, confirmation_link, unsubscribe_link),
        fields(recipient = %recipient)
    )]
    async fn send_confirmation(
        &self,
        recipient: &SubscriberEmail,
        confirmation_link: &str,
        unsubscribe_link: &str,
    ) -> Result<(), anyhow::Error> {
        let html_body = format!(
            r#"
            <div>
                <h1>Welcome to the circus newsletter!</h1>
                <p>Click <a href="{}">here</a> to confirm your subscription.</p>
                <p>Not you? <a href="{}">Unsubscribe</a>.</p>
            </div>
            "#,
            confirmation_link, unsubscribe_link
        );

        self.send_email(recipient, "Confirm your subscription", &html_body)
            .await?;

        Ok(())
    }

    #[tracing::instrument(
        name = "Send a newsletter issue",
        skip(self, html_content, unsubscribe_link),
        fields(recipient = %recipient)
    )]
    async fn send_newsletter_issue(
        &self,
        recipient: &SubscriberEmail,
        title: &str,
        html_content: &str,
        unsubscribe_link: &str,
    ) -> Result<(), anyhow::Error> {
        let html_body = format!(
            r#"{}<p><a href="{}">Unsubscribe</a></p>"#,
            html_content, unsubscribe_link
        );

        self.send_email(recipient, title, &html_body).await?;

        Ok(())
    }
}
