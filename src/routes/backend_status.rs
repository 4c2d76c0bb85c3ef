use actix_web::{web, HttpResponse};

use crate::store_client::StoreClient;

/// `GET /health_check/backend`: whether the subscriber store is configured
/// and reachable.
pub async fn backend_status(store: web::Data<StoreClient>) -> HttpResponse {
    HttpResponse::Ok().json(store.check_connection().await)
}
