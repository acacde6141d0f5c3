use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::subscription::{SubscriptionError, SubscriptionManager};

#[derive(Deserialize)]
pub struct Parameters {
    pub token: String,
}

#[derive(Serialize)]
struct ConfirmedSubscription<'a> {
    email: &'a str,
}

#[tracing::instrument(name = "Confirm a newsletter subscription", skip(parameters, manager))]
pub async fn handle_confirm_subscription(
    parameters: web::Query<Parameters>,
    manager: web::Data<SubscriptionManager>,
) -> Result<HttpResponse, SubscriptionError> {
    let email = manager.confirm(parameters.into_inner().token).await?;

    Ok(HttpResponse::Ok().json(ConfirmedSubscription {
        email: email.as_ref(),
    }))
}
