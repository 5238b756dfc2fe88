use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod auth;
mod completion;
mod components;
mod config;
mod controllers;
mod crypto;
mod db_ops;
mod errors;
mod extractors;
mod htmx;
mod identity;
mod middleware;
mod models;
mod notes;
mod routes;
mod session;
mod summaries;
mod summarize;
#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("notes=info,tower_http=info")),
        )
        .init();

    let config = config::Config::from_env()?;

    let db = db_ops::create_pg_pool(
        &config.database_url,
        config.database_max_connections,
    )
    .await
    .context("pool to be able to connect")?;
    db_ops::migrate(&db)
        .await
        .context("database migrations to apply")?;

    let state = models::AppState {
        store: Arc::new(db_ops::PgStore::new(db)),
        identity: Arc::new(identity::GoTrueClient::new(&config.identity)?),
        completion: Arc::new(completion::OpenAiClient::new(
            config.completion.clone(),
        )?),
        session: config.session.clone(),
        site_url: config.site_url.clone(),
    };
    let app = routes::app(state);

    tracing::info!("listening on {}", config.bind_addr);
    axum::Server::bind(&config.bind_addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
