mod backend_status;
mod home;
mod subscription;

pub use backend_status::*;
pub use home::*;
pub use subscription::*;

use actix_web::{HttpResponse, Responder};

pub async fn health_check() -> impl Responder {
    HttpResponse::Ok()
}
