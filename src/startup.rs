use std::net::TcpListener;

use actix_web::{dev::Server, web, App, HttpServer};
use tracing_actix_web::TracingLogger;

use crate::{
    config::SubscriptionConfig, routes, store_client::StoreClient, subscription::PendingEmails,
};

pub fn run(
    listener: TcpListener,
    store: web::Data<StoreClient>,
    subscription: web::Data<SubscriptionConfig>,
) -> Result<Server, std::io::Error> {
    // shared by every worker
    let pending = web::Data::new(PendingEmails::default());
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(store.clone())
            .app_data(pending.clone())
            .app_data(subscription.clone())
            .route("/", web::get().to(routes::home))
            .route("/health_check", web::get().to(routes::health_check))
            .route(
                "/health_check/backend",
                web::get().to(routes::backend_status),
            )
            .route("/subscriptions", web::post().to(routes::subscribe))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
