use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::domain::subscriber_status::SubscriberStatus;
use crate::email_client::NotificationDispatcher;
use crate::routes::admin::{authorize, AdminApiKey, AdminError};
use crate::subscription::SubscriptionManager;

#[derive(Deserialize, Debug)]
pub struct NewNewsletter {
    pub title: String,
    pub content: NewsletterContent,
}

#[derive(Deserialize, Debug)]
pub struct NewsletterContent {
    pub html: String,
}

#[derive(Serialize)]
struct DeliveryReport {
    delivered: usize,
    failed: usize,
}

/// Sends an issue to every confirmed subscriber. A failed delivery is logged and skipped so the
/// remaining subscribers still get the issue.
#[tracing::instrument(
    name = "Publishing a newsletter to all subscribers",
    skip(request, body, manager, dispatcher, api_key),
    fields(title = %body.title)
)]
pub async fn publish_newsletter(
    request: HttpRequest,
    body: web::Json<NewNewsletter>,
    manager: web::Data<SubscriptionManager>,
    dispatcher: web::Data<dyn NotificationDispatcher>,
    api_key: web::Data<AdminApiKey>,
) -> Result<HttpResponse, AdminError> {
    authorize(&request, &api_key)?;

    let subscribers = manager
        .subscribers(Some(SubscriberStatus::Confirmed))
        .await?;
    let mut report = DeliveryReport {
        delivered: 0,
        failed: 0,
    };

    for subscriber in &subscribers {
        let unsubscribe_link = manager.unsubscribe_link(&subscriber.unsubscribe_token);

        match dispatcher
            .send_newsletter_issue(
                &subscriber.email,
                &body.title,
                &body.content.html,
                &unsubscribe_link,
            )
            .await
        {
            Ok(()) => report.delivered += 1,
            Err(err) => {
                report.failed += 1;
                tracing::error!(
                    subscriber_id = %subscriber.id,
                    "Failed to deliver a newsletter issue: {:?}",
                    err
                );
            }
        }
    }

    Ok(HttpResponse::Ok().json(report))
}
