mod common;

use axum::http::StatusCode;
use common::{app, TestRequest};
use serde_json::{json, Value};

fn people() -> Value {
    json!({
        "resources": [{
            "table": "people",
            "fields": [
                { "name": "id", "type": "integer", "generated": true },
                { "name": "name", "type": "string", "nullable": false, "unique": true },
                { "name": "age", "type": "integer" }
            ]
        }]
    })
}

#[tokio::test]
async fn duplicate_create_is_rejected_and_not_stored() {
    let app = app(people(), &[]);

    let created = TestRequest::post("/people").json(json!({ "name": "a" })).send(&app).await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body, json!({ "id": 1, "name": "a", "age": null }));

    let dup = TestRequest::post("/people").json(json!({ "name": "a" })).send(&app).await;
    assert_eq!(dup.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(dup.body["error"]["message"], json!("Key already exists"));

    let listed = TestRequest::get("/people").send(&app).await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.body.as_array().map(Vec::len), Some(1));
    assert_eq!(listed.content_range(), Some("0-0/1"));
}

#[tokio::test]
async fn get_update_delete_one() {
    let app = app(people(), &[]);
    TestRequest::post("/people").json(json!({ "name": "a", "age": 3 })).send(&app).await;

    let got = TestRequest::get("/people/1").send(&app).await;
    assert_eq!(got.status, StatusCode::OK);
    assert_eq!(got.body["age"], json!(3));

    // the key in an update body is ignored
    let updated = TestRequest::put("/people/1")
        .json(json!({ "id": 99, "age": 4 }))
        .send(&app)
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body, json!({ "id": 1, "name": "a", "age": 4 }));

    let deleted = TestRequest::delete("/people/1").send(&app).await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.body["age"], json!(4));

    assert_eq!(TestRequest::get("/people/1").send(&app).await.status, StatusCode::NOT_FOUND);
    assert_eq!(TestRequest::put("/people/1").json(json!({ "age": 5 })).send(&app).await.status, StatusCode::NOT_FOUND);
    assert_eq!(TestRequest::delete("/people/1").send(&app).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_conflict_keeps_previous_state() {
    let app = app(people(), &[]);
    TestRequest::post("/people").json(json!({ "name": "a" })).send(&app).await;
    TestRequest::post("/people").json(json!({ "name": "b" })).send(&app).await;

    let clash = TestRequest::put("/people/2").json(json!({ "name": "a" })).send(&app).await;
    assert_eq!(clash.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(clash.body["error"]["code"], json!("conflict"));

    let b = TestRequest::get("/people/2").send(&app).await;
    assert_eq!(b.body["name"], json!("b"));
}

#[tokio::test]
async fn delete_all_reports_an_empty_listing() {
    let app = app(people(), &[]);
    for name in ["a", "b", "c"] {
        TestRequest::post("/people").json(json!({ "name": name })).send(&app).await;
    }

    let cleared = TestRequest::delete("/people").send(&app).await;
    assert_eq!(cleared.status, StatusCode::OK);
    assert_eq!(cleared.body, json!([]));
    assert_eq!(cleared.content_range(), Some("0--1/0"));

    let listed = TestRequest::get("/people").send(&app).await;
    assert_eq!(listed.body, json!([]));
    assert_eq!(listed.content_range(), Some("0--1/0"));
}

#[tokio::test]
async fn malformed_requests_are_rejected() {
    let app = app(people(), &[]);

    let bad_id = TestRequest::get("/people/abc").send(&app).await;
    assert_eq!(bad_id.status, StatusCode::BAD_REQUEST);

    let bad_json = TestRequest::post("/people").raw_body("{ nope").send(&app).await;
    assert_eq!(bad_json.status, StatusCode::BAD_REQUEST);

    let no_body = TestRequest::post("/people").send(&app).await;
    assert_eq!(no_body.status, StatusCode::BAD_REQUEST);

    let missing = TestRequest::post("/people").json(json!({ "age": 1 })).send(&app).await;
    assert_eq!(missing.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(missing.body["error"]["code"], json!("validation_error"));

    let wrong_type = TestRequest::post("/people")
        .json(json!({ "name": "x", "age": "old" }))
        .send(&app)
        .await;
    assert_eq!(wrong_type.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn uuid_keys_are_generated_and_parsed() {
    let app = app(
        json!({
            "resources": [{
                "table": "notes",
                "fields": [
                    { "name": "id", "type": "uuid", "generated": true },
                    { "name": "body", "type": "string" }
                ]
            }]
        }),
        &[],
    );
    let created = TestRequest::post("/notes").json(json!({ "body": "hi" })).send(&app).await;
    assert_eq!(created.status, StatusCode::CREATED);
    let id = created.body["id"].as_str().unwrap().to_string();

    let got = TestRequest::get(&format!("/notes/{}", id.to_uppercase())).send(&app).await;
    assert_eq!(got.status, StatusCode::OK);
    assert_eq!(got.body["body"], json!("hi"));

    assert_eq!(TestRequest::get("/notes/not-a-uuid").send(&app).await.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn disabled_routes_are_not_registered() {
    let app = app(
        json!({
            "resources": [{
                "table": "logs",
                "fields": [
                    { "name": "id", "type": "integer", "generated": true },
                    { "name": "line", "type": "string" }
                ],
                "routes": { "delete_all": false, "update": false }
            }]
        }),
        &[],
    );
    TestRequest::post("/logs").json(json!({ "line": "x" })).send(&app).await;

    let del = TestRequest::delete("/logs").send(&app).await;
    assert_eq!(del.status, StatusCode::METHOD_NOT_ALLOWED);
    let put = TestRequest::put("/logs/1").json(json!({ "line": "y" })).send(&app).await;
    assert_eq!(put.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(TestRequest::get("/logs").send(&app).await.content_range(), Some("0-0/1"));
}
