use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::subscription::{SubscriptionError, SubscriptionManager};

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubscribeBody {
    pub email: String,
}

/// Always answers 200 for a well-formed address, whatever state the address was in.
#[tracing::instrument(name = "Creating a new subscriber handler", skip(body, manager))]
pub async fn handle_create_subscription(
    body: web::Json<SubscribeBody>,
    manager: web::Data<SubscriptionManager>,
) -> Result<HttpResponse, SubscriptionError> {
    manager.subscribe(body.into_inner().email).await?;

    Ok(HttpResponse::Ok().finish())
}
