//! Example consumer: serves the users model from `users.json` through crud-ctrl.
//!
//! Run from repo root: `cargo run -p example-consumer`
//! Without DATABASE_URL the in-memory store is used.

use crud_ctrl::{
    common_routes_with_ready, crud_routes, load_from_path, sql, Context, CrudConfig, CrudController, CrudState,
    MemoryStore, ModelStore, PgStore, Settings,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::net::TcpListener;

const BUNDLED_CONFIG: &str = include_str!("../users.json");

async fn load_config(settings: &Settings) -> Result<CrudConfig, Box<dyn std::error::Error>> {
    if tokio::fs::try_exists(&settings.config_path).await.unwrap_or(false) {
        return Ok(load_from_path(&settings.config_path).await?);
    }
    tracing::info!(path = %settings.config_path, "config file not found; using bundled users.json");
    Ok(crud_ctrl::config::from_json_str(BUNDLED_CONFIG)?)
}

fn params(v: Value) -> Map<String, Value> {
    v.as_object().cloned().unwrap_or_default()
}

/// Walk through the actions once, logging each outcome.
async fn demo<S: ModelStore>(ctrl: &CrudController<S>) {
    let ctx = Context::anonymous();
    let calls = [
        ("create", json!({ "displayName": "John Doe", "email": "john@example.com", "photo": "https://example.com/john.jpg" })),
        ("list", json!({})),
        ("get", json!({ "id": 1 })),
        ("update", json!({ "id": 2, "role": "WEBAPP_ADMIN" })),
        ("get", json!({ "id": 1 })),
    ];
    for (name, p) in calls {
        match ctrl.call_action(&ctx, name, params(p)).await {
            Ok(out) => tracing::info!(action = name, result = %json!(out), "demo"),
            Err(e) => tracing::info!(action = name, error = %json!(e.structured()), "demo"),
        }
    }
}

async fn serve<S: ModelStore + 'static>(
    controller: CrudController<S>,
    settings: &Settings,
) -> Result<(), Box<dyn std::error::Error>> {
    demo(&controller).await;
    let state = CrudState::new(controller);
    let app = crud_routes(state.clone(), settings.body_limit).merge(common_routes_with_ready(state));
    let listener = TcpListener::bind(settings.bind_addr).await?;
    tracing::info!("Example consumer listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let settings = Settings::from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("crud_ctrl=info,example_consumer=info")),
        )
        .init();

    let config = load_config(&settings).await?;
    match &settings.database_url {
        Some(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(settings.max_connections)
                .connect(url)
                .await?;
            let store = Arc::new(PgStore::new(pool));
            let controller = CrudController::from_config(&config, store)?;
            sql::sync(controller.store().pool(), controller.model()).await?;
            serve(controller, &settings).await
        }
        None => {
            tracing::info!("DATABASE_URL not set; using the in-memory store");
            let controller = CrudController::from_config(&config, Arc::new(MemoryStore::new()))?;
            serve(controller, &settings).await
        }
    }
}
