#![allow(dead_code)]

use crud_ctrl::{CrudConfig, CrudController, MemoryStore, Row};
use serde_json::{json, Map, Value};
use std::sync::Arc;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("crud_ctrl=debug"))
        .with_test_writer()
        .try_init();
}

pub fn users_config() -> CrudConfig {
    serde_json::from_value(json!({
        "model": {
            "name": "User",
            "table": "users",
            "paranoid": true,
            "fields": [
                { "name": "displayName", "type": "STRING", "comment": "Shown in the app" },
                { "name": "email", "type": "STRING" },
                { "name": "photo", "type": "STRING" },
                { "name": "role", "type": "ENUM", "values": ["WEBAPP_ADMIN", "CONSUMER"] },
                { "name": "age", "type": "INTEGER" },
                { "name": "ownerId", "type": "INTEGER" }
            ],
            "scopes": [
                { "name": "consumers", "where": { "role": "CONSUMER" } },
                { "name": "adults", "where": { "age": { "$gte": 18 } } },
                { "name": "withDeleted", "include_deleted": true }
            ],
            "associations": [
                { "name": "owner", "kind": "belongs_to", "target": "accounts" },
                { "name": "posts", "kind": "has_many", "target": "posts", "remote_key": "userId" },
                {
                    "name": "tags",
                    "kind": "belongs_to_many",
                    "target": "tags",
                    "through": { "table": "user_tags", "local_key": "user_id", "remote_key": "tag_id" }
                }
            ],
            "unique": [["email"]]
        },
        "rules": [
            { "roles": ["CONSUMER"], "restricted_fields": ["email", "photo"], "scope": "consumers" },
            { "roles": ["WEBAPP_ADMIN"], "scope": "withDeleted" }
        ]
    }))
    .unwrap()
}

pub fn controller_with(config: &CrudConfig) -> (CrudController<MemoryStore>, Arc<MemoryStore>) {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let ctrl = CrudController::from_config(config, Arc::clone(&store)).unwrap();
    (ctrl, store)
}

pub fn controller() -> (CrudController<MemoryStore>, Arc<MemoryStore>) {
    controller_with(&users_config())
}

pub fn params(v: Value) -> Map<String, Value> {
    v.as_object().cloned().unwrap()
}

pub fn row(v: Value) -> Row {
    params(v)
}

/// Two accounts, posts for user 1, tags for user 1.
pub fn seed_related(store: &MemoryStore) {
    store
        .insert_rows(
            "accounts",
            vec![row(json!({ "id": 1, "name": "Acme" })), row(json!({ "id": 2, "name": "Globex" }))],
        )
        .unwrap();
    store
        .insert_rows(
            "posts",
            vec![
                row(json!({ "id": 10, "userId": 1, "title": "first" })),
                row(json!({ "id": 11, "userId": 1, "title": "second" })),
            ],
        )
        .unwrap();
    store
        .insert_rows("tags", vec![row(json!({ "id": 5, "label": "vip" }))])
        .unwrap();
    store
        .insert_rows("user_tags", vec![row(json!({ "user_id": 1, "tag_id": 5 }))])
        .unwrap();
}
