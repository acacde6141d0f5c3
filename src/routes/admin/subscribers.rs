use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::domain::subscriber_status::SubscriberStatus;
use crate::routes::admin::{authorize, AdminApiKey, AdminError};
use crate::subscription::SubscriptionManager;

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct ListParameters {
    pub status: Option<SubscriberStatus>,
}

#[tracing::instrument(name = "Listing subscribers", skip(request, manager, api_key))]
pub async fn list_subscribers(
    request: HttpRequest,
    parameters: web::Query<ListParameters>,
    manager: web::Data<SubscriptionManager>,
    api_key: web::Data<AdminApiKey>,
) -> Result<HttpResponse, AdminError> {
    authorize(&request, &api_key)?;

    let subscribers = manager.subscribers(parameters.status).await?;

    Ok(HttpResponse::Ok().json(subscribers))
}
