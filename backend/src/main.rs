use anyhow::Result;
use env_logger::Env;
use log::info;

mod api;
mod config;
mod db;
mod devices;
mod docs;
mod error;
mod registry;
mod req;
mod schema;
mod shelf;
mod utils;

#[actix_web::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = config::Config::from_env()?;
    info!("Starting station backend");

    api::new_http_server(&config).await
}
