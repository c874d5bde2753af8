use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod analysis;
mod auth;
mod balance;
mod config;
mod error;
mod report;
mod routes;
mod schemas;
mod settlement;
mod store;

use config::{Config, Storage};
use store::{ExpenseStore, MemoryStore, MongoStore};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "expense_tracker=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn serve<S>(store: S, config: Config) -> std::io::Result<()>
where
    S: ExpenseStore + Send + Sync + 'static,
{
    let address = (config.host.clone(), config.port);
    let store = web::Data::new(store);
    let config = web::Data::new(config);

    tracing::info!("Listening on http://{}:{}", address.0, address.1);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(Cors::permissive())
            .app_data(store.clone())
            .app_data(config.clone())
            .configure(routes::configure::<S>)
    })
    .bind(address)?
    .run()
    .await
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env()?;

    match config.storage {
        Storage::Mongo => {
            let uri = config.mongodb_uri.clone().unwrap_or_default();
            let store = MongoStore::connect(&uri, &config.database_name).await?;
            tracing::info!(database = %config.database_name, "Connected to MongoDB");
            serve(store, config).await?;
        }
        Storage::Memory => {
            tracing::warn!("Using the in-memory store; expenses are lost on shutdown");
            serve(MemoryStore::default(), config).await?;
        }
    }

    Ok(())
}
