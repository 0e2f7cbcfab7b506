mod common;

use common::{controller, controller_with, params, seed_related, users_config};
use crud_ctrl::{ActionOutput, AppError, Context, ValidationErrors};
use serde_json::{json, Value};

fn validation(err: AppError) -> ValidationErrors {
    match err {
        AppError::Validation(errors) => errors,
        other => panic!("expected validation error, got {:?}", other),
    }
}

async fn create(ctrl: &crud_ctrl::CrudController<crud_ctrl::MemoryStore>, v: Value) -> crud_ctrl::Row {
    ctrl.call_action(&Context::anonymous(), "create", params(v))
        .await
        .unwrap()
        .into_row()
        .unwrap()
}

#[tokio::test]
async fn test_create_fills_key_and_timestamps() {
    let (ctrl, _) = controller();
    let row = create(&ctrl, json!({ "displayName": "John Doe", "photo": "p.jpg" })).await;
    assert_eq!(row["id"], json!(1));
    assert_eq!(row["displayName"], json!("John Doe"));
    assert_eq!(row["role"], Value::Null);
    assert!(row["createdAt"].is_string());
    assert!(row["updatedAt"].is_string());
    assert_eq!(row["deletedAt"], Value::Null);

    let second = create(&ctrl, json!({})).await;
    assert_eq!(second["id"], json!(2));
}

#[tokio::test]
async fn test_native_validation_only_for_submitted_fields() {
    let (ctrl, _) = controller();
    let err = ctrl
        .call_action(&Context::anonymous(), "create", params(json!({ "age": "abc", "role": "ROOT" })))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "VALIDATION_ERROR");
    let errors = validation(err);
    assert_eq!(errors.get("age"), Some(&["\"abc\" is not a valid integer".to_string()][..]));
    assert_eq!(
        errors.get("role"),
        Some(&["\"ROOT\" is not a valid choice in [\"WEBAPP_ADMIN\",\"CONSUMER\"]".to_string()][..])
    );
    assert!(errors.get("displayName").is_none());
}

#[tokio::test]
async fn test_unknown_params_and_actions_are_rejected() {
    let (ctrl, _) = controller();
    let errors = validation(
        ctrl.call_action(&Context::anonymous(), "create", params(json!({ "nickname": "jd" })))
            .await
            .unwrap_err(),
    );
    assert_eq!(errors.get("nickname"), Some(&["is not allowed".to_string()][..]));

    let err = ctrl
        .call_action(&Context::anonymous(), "purge", params(json!({})))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "UNKNOWN_ACTION");
}

#[tokio::test]
async fn test_list_limit_bounds_and_defaults() {
    let (ctrl, _) = controller();
    let anon = Context::anonymous();
    for limit in [json!(1001), json!(-1), json!("ten")] {
        let err = ctrl
            .call_action(&anon, "list", params(json!({ "limit": limit })))
            .await
            .unwrap_err();
        assert!(validation(err).get("limit").is_some());
    }
    let errors = validation(
        ctrl.call_action(&anon, "list", params(json!({ "limit": 1001 })))
            .await
            .unwrap_err(),
    );
    assert_eq!(errors.get("limit"), Some(&["must be <= 1000".to_string()][..]));
    let errors = validation(
        ctrl.call_action(&anon, "list", params(json!({ "offset": 1e300 })))
            .await
            .unwrap_err(),
    );
    assert!(errors.get("offset").is_some());

    for i in 0..55 {
        create(&ctrl, json!({ "displayName": format!("user {}", i) })).await;
    }
    let list = ctrl
        .call_action(&anon, "list", params(json!({})))
        .await
        .unwrap()
        .into_list()
        .unwrap();
    assert_eq!(list.count, 55);
    assert_eq!(list.rows.len(), 50);
    assert_eq!(list.rows[0]["id"], json!(1));

    let tail = ctrl
        .call_action(&anon, "list", params(json!({ "offset": 50, "limit": 0 })))
        .await
        .unwrap()
        .into_list()
        .unwrap();
    assert_eq!(tail.count, 55);
    assert_eq!(tail.rows.len(), 5);

    let fractional = ctrl
        .call_action(&anon, "list", params(json!({ "offset": 1.5, "limit": 2.5 })))
        .await
        .unwrap()
        .into_list()
        .unwrap();
    assert_eq!(fractional.rows.len(), 2);
    assert_eq!(fractional.rows[0]["id"], json!(2));
}

#[tokio::test]
async fn test_list_where_and_order() {
    let (ctrl, _) = controller();
    let anon = Context::anonymous();
    for (name, age) in [("ann", 31), ("bob", 17), ("cid", 45)] {
        create(&ctrl, json!({ "displayName": name, "age": age })).await;
    }
    let list = ctrl
        .call_action(
            &anon,
            "list",
            params(json!({ "where": { "age": { "$gte": 18 } }, "order": "-age" })),
        )
        .await
        .unwrap()
        .into_list()
        .unwrap();
    let names: Vec<&Value> = list.rows.iter().map(|r| &r["displayName"]).collect();
    assert_eq!(names, vec![&json!("cid"), &json!("ann")]);

    let errors = validation(
        ctrl.call_action(&anon, "list", params(json!({ "where": { "height": 2 } })))
            .await
            .unwrap_err(),
    );
    assert_eq!(errors.get("where"), Some(&["unknown field 'height'".to_string()][..]));
}

#[tokio::test]
async fn test_get_missing_is_null() {
    let (ctrl, _) = controller();
    let out = ctrl
        .call_action(&Context::anonymous(), "get", params(json!({ "id": 42 })))
        .await
        .unwrap();
    assert_eq!(out, ActionOutput::Row(None));

    let errors = validation(
        ctrl.call_action(&Context::anonymous(), "get", params(json!({})))
            .await
            .unwrap_err(),
    );
    assert_eq!(errors.get("id"), Some(&["can't be blank".to_string()][..]));
}

#[tokio::test]
async fn test_update_missing_is_object_not_found_without_mutation() {
    let (ctrl, store) = controller();
    let err = ctrl
        .call_action(&Context::anonymous(), "update", params(json!({ "id": 2, "role": "WEBAPP_ADMIN" })))
        .await
        .unwrap_err();
    let s = err.structured();
    assert_eq!(s.kind, "OBJECT_NOT_FOUND");
    assert_eq!(s.message, "User not found.");
    assert_eq!(s.detail, Some(json!({ "where": { "id": 2 } })));
    assert!(store.rows("users").unwrap().is_empty());
}

#[tokio::test]
async fn test_update_returns_reloaded_row() {
    let (ctrl, _) = controller();
    let created = create(&ctrl, json!({ "displayName": "John", "age": 20 })).await;
    let updated = ctrl
        .call_action(
            &Context::anonymous(),
            "update",
            params(json!({ "id": 1, "role": "WEBAPP_ADMIN", "age": "21" })),
        )
        .await
        .unwrap()
        .into_row()
        .unwrap();
    assert_eq!(updated["id"], json!(1));
    assert_eq!(updated["role"], json!("WEBAPP_ADMIN"));
    assert_eq!(updated["age"], json!("21"));
    assert_eq!(updated["displayName"], json!("John"));
    assert_eq!(updated["createdAt"], created["createdAt"]);

    let fetched = ctrl
        .call_action(&Context::anonymous(), "get", params(json!({ "id": 1 })))
        .await
        .unwrap()
        .into_row()
        .unwrap();
    assert_eq!(fetched, updated);
}

#[tokio::test]
async fn test_restricted_fields_are_stripped_per_role() {
    let (ctrl, _) = controller();
    create(
        &ctrl,
        json!({ "displayName": "c", "email": "c@x.io", "photo": "c.jpg", "role": "CONSUMER" }),
    )
    .await;
    let consumer = Context::with_role("CONSUMER");

    let list = ctrl
        .call_action(&consumer, "list", params(json!({})))
        .await
        .unwrap()
        .into_list()
        .unwrap();
    assert_eq!(list.rows.len(), 1);
    assert!(!list.rows[0].contains_key("email"));
    assert!(!list.rows[0].contains_key("photo"));

    let got = ctrl
        .call_action(&consumer, "get", params(json!({ "id": 1 })))
        .await
        .unwrap()
        .into_row()
        .unwrap();
    assert!(!got.contains_key("email"));

    let created = ctrl
        .call_action(&consumer, "create", params(json!({ "email": "d@x.io", "role": "CONSUMER" })))
        .await
        .unwrap()
        .into_row()
        .unwrap();
    assert!(!created.contains_key("email"));
    assert!(created.contains_key("id"));

    let updated = ctrl
        .call_action(&consumer, "update", params(json!({ "id": 1, "photo": "new.jpg" })))
        .await
        .unwrap()
        .into_row()
        .unwrap();
    assert!(!updated.contains_key("photo"));

    for ctx in [Context::with_role("WEBAPP_ADMIN"), Context::with_role("GUEST"), Context::anonymous()] {
        let row = ctrl
            .call_action(&ctx, "get", params(json!({ "id": 1 })))
            .await
            .unwrap()
            .into_row()
            .unwrap();
        assert_eq!(row["email"], json!("c@x.io"));
        assert_eq!(row["photo"], json!("new.jpg"));
    }
}

#[tokio::test]
async fn test_role_scope_narrows_list_get_and_update() {
    let (ctrl, _) = controller();
    create(&ctrl, json!({ "displayName": "admin", "role": "WEBAPP_ADMIN" })).await;
    create(&ctrl, json!({ "displayName": "consumer", "role": "CONSUMER" })).await;
    let consumer = Context::with_role("CONSUMER");

    let list = ctrl
        .call_action(&consumer, "list", params(json!({})))
        .await
        .unwrap()
        .into_list()
        .unwrap();
    assert_eq!(list.count, 1);
    assert_eq!(list.rows[0]["displayName"], json!("consumer"));

    let hidden = ctrl
        .call_action(&consumer, "get", params(json!({ "id": 1 })))
        .await
        .unwrap();
    assert_eq!(hidden, ActionOutput::Row(None));

    let err = ctrl
        .call_action(&consumer, "update", params(json!({ "id": 1, "displayName": "x" })))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "OBJECT_NOT_FOUND");

    let everyone = ctrl
        .call_action(&Context::anonymous(), "list", params(json!({})))
        .await
        .unwrap()
        .into_list()
        .unwrap();
    assert_eq!(everyone.count, 2);
}

#[tokio::test]
async fn test_requested_scope_intersects_role_scope() {
    let (ctrl, _) = controller();
    create(&ctrl, json!({ "displayName": "young", "role": "CONSUMER", "age": 12 })).await;
    create(&ctrl, json!({ "displayName": "old", "role": "CONSUMER", "age": 60 })).await;
    create(&ctrl, json!({ "displayName": "boss", "role": "WEBAPP_ADMIN", "age": 50 })).await;

    let list = ctrl
        .call_action(&Context::with_role("CONSUMER"), "list", params(json!({ "scope": "adults" })))
        .await
        .unwrap()
        .into_list()
        .unwrap();
    assert_eq!(list.count, 1);
    assert_eq!(list.rows[0]["displayName"], json!("old"));

    let errors = validation(
        ctrl.call_action(&Context::anonymous(), "list", params(json!({ "scope": "vip" })))
            .await
            .unwrap_err(),
    );
    assert_eq!(errors.get("scope"), Some(&["\"vip\" is not included in the list".to_string()][..]));
}

#[tokio::test]
async fn test_delete_counts_and_soft_deletes() {
    let (ctrl, store) = controller();
    let anon = Context::anonymous();
    for _ in 0..2 {
        let out = ctrl
            .call_action(&anon, "delete", params(json!({ "id": 7 })))
            .await
            .unwrap();
        assert_eq!(out.deleted_count(), Some(0));
    }

    create(&ctrl, json!({ "displayName": "gone" })).await;
    let first = ctrl.call_action(&anon, "delete", params(json!({ "id": 1 }))).await.unwrap();
    let second = ctrl.call_action(&anon, "delete", params(json!({ "id": 1 }))).await.unwrap();
    assert_eq!(first.deleted_count(), Some(1));
    assert_eq!(second.deleted_count(), Some(0));

    let rows = store.rows("users").unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0]["deletedAt"].is_string());

    let visible = ctrl
        .call_action(&anon, "get", params(json!({ "id": 1 })))
        .await
        .unwrap();
    assert_eq!(visible, ActionOutput::Row(None));

    let admin = ctrl
        .call_action(&Context::with_role("WEBAPP_ADMIN"), "list", params(json!({})))
        .await
        .unwrap()
        .into_list()
        .unwrap();
    assert_eq!(admin.count, 1);
}

#[tokio::test]
async fn test_delete_scope_gating_is_opt_in() {
    let consumer = Context::with_role("CONSUMER");

    let (ctrl, _) = controller();
    create(&ctrl, json!({ "role": "WEBAPP_ADMIN" })).await;
    let out = ctrl.call_action(&consumer, "delete", params(json!({ "id": 1 }))).await.unwrap();
    assert_eq!(out.deleted_count(), Some(1));

    let mut config = users_config();
    config.options.scope_deletes = true;
    let (ctrl, _) = controller_with(&config);
    create(&ctrl, json!({ "role": "WEBAPP_ADMIN" })).await;
    let out = ctrl.call_action(&consumer, "delete", params(json!({ "id": 1 }))).await.unwrap();
    assert_eq!(out.deleted_count(), Some(0));
}

#[tokio::test]
async fn test_includes_raw_and_nested() {
    let (ctrl, store) = controller();
    seed_related(&store);
    create(&ctrl, json!({ "displayName": "a", "ownerId": 1 })).await;
    create(&ctrl, json!({ "displayName": "b" })).await;

    let list = ctrl
        .call_action(
            &Context::anonymous(),
            "list",
            params(json!({ "include": ["owner", "posts", "tags"] })),
        )
        .await
        .unwrap()
        .into_list()
        .unwrap();
    let a = &list.rows[0];
    assert_eq!(a["owner.name"], json!("Acme"));
    assert!(!a.contains_key("owner"));
    assert_eq!(a["posts"].as_array().map(Vec::len), Some(2));
    assert_eq!(a["tags"], json!([{ "id": 5, "label": "vip" }]));
    let b = &list.rows[1];
    assert_eq!(b["owner"], Value::Null);
    assert_eq!(b["posts"], json!([]));

    let mut config = users_config();
    config.options.disable_raw_option = true;
    let (ctrl, store) = controller_with(&config);
    seed_related(&store);
    create(&ctrl, json!({ "ownerId": 2 })).await;
    let got = ctrl
        .call_action(&Context::anonymous(), "get", params(json!({ "id": 1, "include": "owner" })))
        .await
        .unwrap()
        .into_row()
        .unwrap();
    assert_eq!(got["owner"], json!({ "id": 2, "name": "Globex" }));

    let errors = validation(
        ctrl.call_action(&Context::anonymous(), "get", params(json!({ "id": 1, "include": ["friends"] })))
            .await
            .unwrap_err(),
    );
    assert_eq!(errors.get("include"), Some(&["\"friends\" is not included in the list".to_string()][..]));
}

#[tokio::test]
async fn test_unique_violation_propagates() {
    let (ctrl, _) = controller();
    create(&ctrl, json!({ "email": "a@x.io" })).await;
    let err = ctrl
        .call_action(&Context::anonymous(), "create", params(json!({ "email": "a@x.io" })))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "CONFLICT");
}

#[tokio::test]
async fn test_model_fields_descriptors() {
    let (ctrl, _) = controller();
    let all = ctrl.get_model_fields(&Context::anonymous(), false);
    assert_eq!(
        all["id"],
        json!({ "type": "INTEGER", "allowNull": false, "primaryKey": true })
    );
    assert_eq!(
        all["displayName"],
        json!({ "type": "STRING", "allowNull": true, "comment": "Shown in the app", "length": 255, "primaryKey": false })
    );
    assert_eq!(all["role"]["values"], json!(["WEBAPP_ADMIN", "CONSUMER"]));
    assert!(all.contains_key("createdAt"));

    let writable = ctrl.get_model_fields(&Context::with_role("CONSUMER"), true);
    assert!(!writable.contains_key("createdAt"));
    assert!(!writable.contains_key("deletedAt"));
    assert!(!writable.contains_key("email"));
    assert!(writable.contains_key("displayName"));
}
