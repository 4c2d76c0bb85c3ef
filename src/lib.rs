pub mod config;
pub mod domain;
mod routes;
mod startup;
pub mod store_client;
pub mod subscription;
pub mod telemetry;
mod util;

pub use startup::run;
