mod common;

use autores_api::database::Sqlite;
use autores_api::http::{AppState, build_router};
use axum::Router;
use axum::http::{Method, StatusCode};
use common::send;
use serde_json::{Value, json};

async fn app() -> Router {
    let repo = Sqlite::in_memory().await.unwrap();
    build_router(AppState::new(repo))
}

async fn list(app: &Router) -> Vec<Value> {
    let (status, body) = send(app, Method::GET, "/autores", None).await;
    assert_eq!(status, StatusCode::OK);
    body["data"].as_array().unwrap().clone()
}

async fn create(app: &Router, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, "/autores", Some(body)).await
}

fn failure_messages(body: &Value) -> Vec<String> {
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|failure| failure["message"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn create_get_delete_lifecycle() {
    let app = app().await;
    assert!(list(&app).await.is_empty());

    let (status, body) = create(&app, json!({ "name": "Ana" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Null);

    let authors = list(&app).await;
    assert_eq!(authors, vec![json!({ "id": 1, "name": "Ana" })]);

    let (status, body) = send(&app, Method::GET, "/autores/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status_code"], 200);
    assert_eq!(body["data"], json!({ "id": 1, "name": "Ana" }));

    let (status, body) = send(&app, Method::DELETE, "/autores/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Null);

    let (status, body) = send(&app, Method::GET, "/autores/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status_code"], 404);
}

#[tokio::test]
async fn create_rejects_lowercase_first_letter() {
    let app = app().await;

    let (status, body) = create(&app, json!({ "name": "ana" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        failure_messages(&body),
        vec!["The first letter must be uppercase."]
    );
    assert_eq!(body["data"][0]["field"], "name");
    assert!(list(&app).await.is_empty());
}

#[tokio::test]
async fn create_rejects_names_longer_than_five_chars() {
    let app = app().await;

    let (status, body) = create(&app, json!({ "name": "Abcdef" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        failure_messages(&body),
        vec!["The name field must not be longer than 5 characters."]
    );
    assert!(list(&app).await.is_empty());
}

#[tokio::test]
async fn create_requires_a_name() {
    let app = app().await;

    for body in [json!({}), json!({ "name": null }), json!({ "name": "" })] {
        let (status, body) = create(&app, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(failure_messages(&body), vec!["The name field is required."]);
    }
}

#[tokio::test]
async fn create_reports_every_failure_at_once() {
    let app = app().await;

    let (status, body) = create(&app, json!({ "name": "abcdefg" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(failure_messages(&body).len(), 2);
}

#[tokio::test]
async fn create_rejects_duplicate_name() {
    let app = app().await;
    create(&app, json!({ "name": "Ana" })).await;

    let (status, body) = create(&app, json!({ "name": "Ana" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["data"].as_str().unwrap().contains("already exists"));
    assert_eq!(list(&app).await.len(), 1);
}

#[tokio::test]
async fn duplicate_check_is_case_sensitive() {
    let app = app().await;
    create(&app, json!({ "name": "Ana" })).await;

    let (status, _) = create(&app, json!({ "name": "ANA" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list(&app).await.len(), 2);
}

#[tokio::test]
async fn create_ignores_body_id() {
    let app = app().await;

    let (status, _) = create(&app, json!({ "id": 42, "name": "Ana" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list(&app).await[0]["id"], 1);
}

#[tokio::test]
async fn update_replaces_the_record() {
    let app = app().await;
    create(&app, json!({ "name": "Ana" })).await;

    let (status, body) = send(
        &app,
        Method::PUT,
        "/autores/1",
        Some(json!({ "id": 1, "name": "Bea" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Null);

    let (_, body) = send(&app, Method::GET, "/autores/1", None).await;
    assert_eq!(body["data"]["name"], "Bea");
}

#[tokio::test]
async fn update_with_mismatched_id_leaves_store_untouched() {
    let app = app().await;
    create(&app, json!({ "name": "Ana" })).await;

    let (status, body) = send(
        &app,
        Method::PUT,
        "/autores/1",
        Some(json!({ "id": 2, "name": "Bea" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["data"].as_str().unwrap().contains("does not match"));
    assert_eq!(list(&app).await, vec![json!({ "id": 1, "name": "Ana" })]);
}

#[tokio::test]
async fn update_of_unknown_id_is_not_found() {
    let app = app().await;

    let (status, _) = send(
        &app,
        Method::PUT,
        "/autores/7",
        Some(json!({ "id": 7, "name": "Bea" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(list(&app).await.is_empty());
}

#[tokio::test]
async fn update_validates_the_body() {
    let app = app().await;
    create(&app, json!({ "name": "Ana" })).await;

    let (status, body) = send(
        &app,
        Method::PUT,
        "/autores/1",
        Some(json!({ "id": 1, "name": "bea" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        failure_messages(&body),
        vec!["The first letter must be uppercase."]
    );
}

#[tokio::test]
async fn update_to_taken_name_is_rejected() {
    let app = app().await;
    create(&app, json!({ "name": "Ana" })).await;
    create(&app, json!({ "name": "Bea" })).await;

    let (status, _) = send(
        &app,
        Method::PUT,
        "/autores/2",
        Some(json!({ "id": 2, "name": "Ana" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_of_unknown_id_is_not_found() {
    let app = app().await;
    create(&app, json!({ "name": "Ana" })).await;

    let (status, _) = send(&app, Method::DELETE, "/autores/9", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(list(&app).await.len(), 1);
}

#[tokio::test]
async fn get_by_name_returns_first_author_containing_fragment() {
    let app = app().await;
    create(&app, json!({ "name": "Dana" })).await;
    create(&app, json!({ "name": "Ana" })).await;

    let (status, body) = send(&app, Method::GET, "/autores/na", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({ "id": 1, "name": "Dana" }));

    let (status, body) = send(&app, Method::GET, "/autores/An", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Ana");

    let (status, _) = send(&app, Method::GET, "/autores/Zoe", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_with_books_includes_books() {
    let app = app().await;
    create(
        &app,
        json!({ "name": "Ana", "books": [{ "title": "Uno" }, { "title": "Dos" }] }),
    )
    .await;
    create(&app, json!({ "name": "Bea" })).await;

    let (status, body) = send(&app, Method::GET, "/autores/PrimerAutor", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"],
        json!([
            {
                "id": 1,
                "name": "Ana",
                "books": [
                    { "id": 1, "title": "Uno", "author_id": 1 },
                    { "id": 2, "title": "Dos", "author_id": 1 }
                ]
            },
            { "id": 2, "name": "Bea", "books": [] }
        ])
    );

    for author in list(&app).await {
        assert!(author.get("books").is_none());
    }
}

#[tokio::test]
async fn health_check_is_ok() {
    let app = app().await;

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], "ok");
}

#[tokio::test]
async fn mistyped_body_is_a_bad_request_envelope() {
    let app = app().await;

    let (status, body) = create(&app, json!({ "name": 5 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status_code"], 400);
    assert!(body["data"].is_string());

    let (status, body) = send(
        &app,
        Method::PUT,
        "/autores/1",
        Some(json!({ "id": "one", "name": "Ana" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status_code"], 400);
    assert!(list(&app).await.is_empty());
}

#[tokio::test]
async fn non_integer_id_is_a_bad_request_envelope() {
    let app = app().await;
    create(&app, json!({ "name": "Ana" })).await;

    let (status, body) = send(
        &app,
        Method::PUT,
        "/autores/abc",
        Some(json!({ "id": 1, "name": "Bea" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status_code"], 400);

    let (status, body) = send(&app, Method::DELETE, "/autores/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status_code"], 400);
    assert_eq!(list(&app).await.len(), 1);
}

#[tokio::test]
async fn name_starting_with_sharp_s_is_accepted() {
    let app = app().await;

    let (status, _) = create(&app, json!({ "name": "ßa" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list(&app).await[0]["name"], "ßa");
}
