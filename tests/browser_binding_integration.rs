use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;

use cmis_gateway::api::create_router;
use cmis_gateway::binding::{default_registry, params, Binding};

// Test client wrapper driving the router directly, one request at a time.
struct TestClient {
    router: Router,
}

struct TestResponse {
    status: StatusCode,
    headers: axum::http::HeaderMap,
    body: Vec<u8>,
}

impl TestResponse {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }

    fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl TestClient {
    fn new() -> Self {
        let mut parameters = HashMap::new();
        parameters.insert(params::PROVIDER.to_string(), "memory".to_string());
        parameters.insert(params::REPOSITORY_ID.to_string(), "test".to_string());
        let binding = Arc::new(Binding::new(parameters, &default_registry()).unwrap());
        Self {
            router: create_router(binding),
        }
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    async fn get(&self, path: &str) -> TestResponse {
        self.send(Request::get(path).body(Body::empty()).unwrap()).await
    }

    async fn get_as(&self, path: &str, user: &str) -> TestResponse {
        self.send(
            Request::get(path)
                .header("x-cmis-user", user)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    async fn post(&self, path: &str, payload: Value) -> TestResponse {
        self.send(
            Request::post(path)
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
    }
}

#[tokio::test]
async fn repository_listing_and_info() {
    let client = TestClient::new();

    let response = client.get("/").await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["id"], "test");

    let response = client.get("/test").await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["id"], "test");
    assert_eq!(body["root_folder_id"], "root");
}

#[tokio::test]
async fn type_routes() {
    let client = TestClient::new();

    let response = client.get("/test?cmisselector=typeChildren").await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["total"], 2);
    assert!(body["items"][0]["id"].is_string());

    let response = client.get("/test?cmisselector=typeDescendants").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["total"], 2);

    let response = client
        .get("/test?cmisselector=typeDefinition&typeId=cmis:folder")
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["id"], "cmis:folder");

    let response = client.get("/test?cmisselector=typeDefinition").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["exception"], "invalidArgument");
}

#[tokio::test]
async fn selector_defaults_follow_the_object() {
    let client = TestClient::new();

    // Document without a selector serves its content.
    let response = client.get("/test/root?objectId=doc-readme").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text(), "Hello CMIS");
    assert_eq!(
        response.headers.get("content-type").unwrap(),
        "text/plain"
    );

    // Folder without a selector lists its children.
    let response = client.get("/test/root?objectId=folder-reports").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["total"], 1);

    // No objectId addresses the root folder, so bare root GETs list its
    // children.
    let response = client.get("/test/root").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["total"], 3);

    // Unresolvable object falls back to the object selector and the
    // handler reports the real failure.
    let response = client.get("/test/root?objectId=missing").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["exception"], "objectNotFound");
}

#[tokio::test]
async fn create_and_delete_round_trip() {
    let client = TestClient::new();

    let response = client
        .post(
            "/test/root?cmisaction=createFolder&objectId=root",
            json!({"properties": {"cmis:name": "archive"}}),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let folder_id = response.json()["id"].as_str().unwrap().to_string();

    let response = client
        .post(
            "/test/root?cmisaction=createDocument",
            json!({
                "objectId": folder_id,
                "properties": {"cmis:name": "notes.txt"},
                "content": {"fileName": "notes.txt", "mimeType": "text/plain", "data": "n"}
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let doc_id = response.json()["id"].as_str().unwrap().to_string();

    let response = client
        .get(&format!("/test/root?cmisselector=content&objectId={}", doc_id))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text(), "n");

    // Non-empty folder cannot be deleted one object at a time.
    let response = client
        .post(
            &format!("/test/root?cmisaction=delete&objectId={}", folder_id),
            json!({}),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.json()["exception"], "constraint");

    let response = client
        .post(
            &format!("/test/root?cmisaction=deleteTree&objectId={}", folder_id),
            json!({}),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["total"], 2);
}

#[tokio::test]
async fn unknown_action_and_operation() {
    let client = TestClient::new();

    let response = client.post("/test/root", json!({})).await;
    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
    let body = response.json();
    assert_eq!(body["exception"], "notSupported");
    assert_eq!(body["message"], "Unknown action");

    let response = client.post("/test/root?cmisaction=", json!({})).await;
    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.json()["message"], "Unknown action");

    let response = client.post("/test/root?cmisaction=teleport", json!({})).await;
    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.json()["message"], "Unknown operation");

    let response = client.get("/test/root/extra/path").await;
    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.json()["message"], "Unknown operation");
}

#[tokio::test]
async fn last_result_is_memoized_per_transaction() {
    let client = TestClient::new();

    let response = client
        .get("/test/root?cmisselector=object&objectId=missing&transaction=t1")
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let first = client.get("/test?cmisselector=lastResult&transaction=t1").await;
    assert_eq!(first.status, StatusCode::OK);
    let body = first.json();
    assert_eq!(body["code"], 404);
    assert_eq!(body["exception"], "objectNotFound");

    // Reading the record does not consume it.
    let second = client.get("/test?cmisselector=lastResult&transaction=t1").await;
    assert_eq!(second.json(), body);

    // Other transactions are unaffected.
    let other = client.get("/test?cmisselector=lastResult&transaction=t2").await;
    assert_eq!(other.json()["code"], 0);
}

#[tokio::test]
async fn anonymous_permission_failure_is_challenged() {
    let client = TestClient::new();

    let response = client
        .get("/test/root?cmisselector=object&objectId=doc-secret&transaction=t1")
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers.get("www-authenticate").unwrap(),
        "Basic realm=\"CMIS\""
    );
    assert_eq!(response.text(), "Authorization Required");

    // The challenge is the whole answer; nothing is memoized for the
    // transaction.
    let response = client.get("/test?cmisselector=lastResult&transaction=t1").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["code"], 0);

    let response = client
        .get_as("/test/root?cmisselector=object&objectId=doc-secret", "alice")
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.json()["exception"], "permissionDenied");
}

#[tokio::test]
async fn query_is_rejected_by_the_memory_provider() {
    let client = TestClient::new();

    let response = client
        .post(
            "/test?cmisaction=query",
            json!({"statement": "SELECT cmis:name FROM cmis:document"}),
        )
        .await;
    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.json()["exception"], "notSupported");

    let response = client.post("/test?cmisaction=query", json!({})).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["exception"], "invalidArgument");
}
