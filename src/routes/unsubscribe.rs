use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::subscriber::UnsubscribeTarget;
use crate::domain::subscription_token::UnsubscribeToken;
use crate::subscription::{SubscriptionError, SubscriptionManager};

#[derive(Deserialize)]
pub struct Parameters {
    pub token: String,
}

/// Either the subscriber id or the unsubscribe token from an email, never both.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnsubscribeBody {
    pub id: Option<Uuid>,
    pub token: Option<String>,
}

impl TryFrom<UnsubscribeBody> for UnsubscribeTarget {
    type Error = String;

    fn try_from(body: UnsubscribeBody) -> Result<Self, Self::Error> {
        match (body.id, body.token) {
            (Some(id), None) => Ok(UnsubscribeTarget::Id(id)),
            (None, Some(token)) => Ok(UnsubscribeTarget::Token(UnsubscribeToken::parse(token)?)),
            _ => Err("Provide exactly one of `id` or `token`".to_string()),
        }
    }
}

/// Target of the link embedded in every email.
#[tracing::instrument(name = "Unsubscribe through an email link", skip(parameters, manager))]
pub async fn handle_unsubscribe_link(
    parameters: web::Query<Parameters>,
    manager: web::Data<SubscriptionManager>,
) -> Result<HttpResponse, SubscriptionError> {
    let token =
        UnsubscribeToken::parse(parameters.into_inner().token).map_err(SubscriptionError::Validation)?;

    manager.unsubscribe(UnsubscribeTarget::Token(token)).await?;

    Ok(HttpResponse::Ok().finish())
}

#[tracing::instrument(name = "Unsubscribe a subscriber handler", skip(body, manager))]
pub async fn handle_unsubscribe(
    body: web::Json<UnsubscribeBody>,
    manager: web::Data<SubscriptionManager>,
) -> Result<HttpResponse, SubscriptionError> {
    let target: UnsubscribeTarget = body
        .into_inner()
        .try_into()
        .map_err(SubscriptionError::Validation)?;

    manager.unsubscribe(target).await?;

    Ok(HttpResponse::Ok().finish())
}
