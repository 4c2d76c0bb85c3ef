use std::net::TcpListener;

use actix_web::web;
use anyhow::Context;
use reparix_landing::{
    config::get_config,
    store_client::{StoreClient, SubscriberStore},
    telemetry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = telemetry::get_subscriber("reparix-landing", "info", std::io::stdout);
    telemetry::init_subscriber(subscriber);

    let config = get_config().context("failed to load configuration.")?;
    let address = config.web.server_address();
    let listener =
        TcpListener::bind(&address).with_context(|| format!("failed to bind {address}."))?;

    let store = web::Data::new(StoreClient::from_config(&config.backend));
    let subscription = web::Data::new(config.subscription.clone());
    tracing::info!(
        %address,
        table = store.table(),
        store_configured = store.is_configured(),
        "starting server."
    );

    reparix_landing::run(listener, store, subscription)?.await?;
    Ok(())
}
