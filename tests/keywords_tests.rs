// Keyword library driven against a local echo service.

use axum::{
    extract::{Path, Query},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::{SocketAddr, TcpListener};
use std::path::PathBuf;
use std::thread;

use openapi_test_data::keywords::KeywordError;
use openapi_test_data::{ApiTestingLibrary, GenerationMode};

fn sample(file_name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("samples")
        .join(file_name)
}

fn spawn_server() -> SocketAddr {
    let app = Router::new()
        .route(
            "/users",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                let request_id = headers
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                (
                    StatusCode::CREATED,
                    Json(json!({ "id": 1, "user": body, "requestId": request_id })),
                )
            }),
        )
        .route(
            "/users/:id",
            get(|Path(id): Path<u64>, Query(query): Query<HashMap<String, String>>| async move {
                Json(json!({ "id": id, "tags": ["admin", "staff"], "verbose": query.contains_key("verbose") }))
            }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();

    thread::spawn(move || {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async move {
            axum::Server::from_tcp(listener)
                .unwrap()
                .serve(app.into_make_service())
                .await
                .unwrap();
        });
    });

    addr
}

#[test]
fn test_generated_body_is_sent_and_asserted() {
    let addr = spawn_server();
    let mut library = ApiTestingLibrary::default();

    library.load_api_specification(sample("sample_openapi.yaml")).unwrap();
    library.set_base_url(&format!("http://{}/", addr));

    let output = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("target")
        .join("test-output")
        .join("keywords")
        .join("post_users.json");
    let generated = library
        .generate_test_data_for_endpoint("/users", "post", GenerationMode::Deterministic, Some(&output))
        .unwrap();
    assert!(generated.contains("\"body\""));
    assert!(output.exists());

    library
        .make_request("POST", "/users", None, &[], &[("X-Request-Id", "req-42")])
        .unwrap();

    library.response_status_code_should_be(201).unwrap();
    library.response_should_contain_property("user.email").unwrap();
    library.response_property_should_equal("user.name", "sample_name").unwrap();
    library.response_property_should_equal("requestId", "req-42").unwrap();
    assert!(library.response_status_code_should_be(200).is_err());
}

#[test]
fn test_query_params_and_list_indices() {
    let addr = spawn_server();
    let mut library = ApiTestingLibrary::new(Some(format!("http://{}", addr)));

    let response = library
        .make_request("get", "users/7", None, &[("verbose", "1")], &[])
        .unwrap();
    assert_eq!(response.status, 200);

    library.response_property_should_equal("id", "7").unwrap();
    library.response_property_should_equal("verbose", "true").unwrap();
    library.response_property_should_equal("tags.1", "staff").unwrap();

    let missing = library.response_should_contain_property("tags.5");
    assert!(matches!(missing, Err(KeywordError::Assertion(_))));
}

#[test]
fn test_test_data_loaded_from_file_supplies_body() {
    let addr = spawn_server();
    let mut library = ApiTestingLibrary::new(Some(format!("http://{}", addr)));

    let file = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("target")
        .join("test-output")
        .join("keywords")
        .join("stored_body.json");
    openapi_test_data::utils::write_to_file(&file, r#"{ "body": { "name": "Grace", "email": "grace@example.org" } }"#)
        .unwrap();

    library.load_test_data_from_file(&file).unwrap();
    library.make_request("POST", "/users", None, &[], &[]).unwrap();
    library.response_property_should_equal("user.name", "Grace").unwrap();
}
