use actix_web::{http::header::ContentType, http::StatusCode, web, HttpResponse};

use crate::{
    config::SubscriptionConfig,
    domain::ErrorKind,
    store_client::StoreClient,
    subscription::{PendingEmails, SubscriptionForm},
};

use super::render_page;

#[derive(serde::Deserialize)]
pub struct FormData {
    pub email: String,
}

/// Every outcome is rendered as the landing page.
/// An address another request is still inserting answers 409 with the form
/// shown as submitting.
#[tracing::instrument(
    name = "new newsletter subscription",
    skip(form, store, pending, settings),
    fields(subscriber_email = %form.email)
)]
pub async fn subscribe(
    form: web::Form<FormData>,
    store: web::Data<StoreClient>,
    pending: web::Data<PendingEmails>,
    settings: web::Data<SubscriptionConfig>,
) -> HttpResponse {
    let subscription = SubscriptionForm::new(store.get_ref())
        .revert_after(settings.revert_after())
        .share_pending(pending.into_inner());
    subscription.edit(&form.0.email);

    let status = match subscription.submit().await {
        Ok(_) => StatusCode::OK,
        Err(e) => e.kind().map_or(StatusCode::CONFLICT, status_code),
    };

    HttpResponse::build(status)
        .content_type(ContentType::html())
        .body(render_page(&subscription, settings.revert_after()))
}

fn status_code(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Duplicate => StatusCode::CONFLICT,
        ErrorKind::Permission | ErrorKind::Transient => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
    }
}
