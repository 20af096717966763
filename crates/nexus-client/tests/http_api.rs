use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{delete, get, patch, post},
};
use bytes::Bytes;
use serde_json::{Value, json};

use nexus_client::api::{FILENAME_HEADER, ForumApi, HttpForumApi};
use nexus_client::config::ClientConfig;
use nexus_client::error::ClientError;
use nexus_types::api::{CreateMessageRequest, ProfileUpdateRequest, ValidateTcRequest};
use nexus_types::models::ThreadTag;

/// What the fake server saw, in arrival order.
#[derive(Clone, Default)]
struct Seen {
    requests: Arc<Mutex<Vec<(String, Option<String>, Value)>>>,
}

impl Seen {
    fn record(&self, route: impl Into<String>, headers: &HeaderMap, body: Value) {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.requests.lock().unwrap().push((route.into(), auth, body));
    }

    fn last(&self) -> (String, Option<String>, Value) {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

fn message_json(id: i64, content: &str) -> Value {
    json!({
        "id": id,
        "threadId": 7,
        "userId": 3,
        "user": { "id": 3, "username": "mert", "displayName": "Mert" },
        "content": content,
        "createdAt": "2024-05-01T12:00:00Z",
        "isEdited": false,
        "likes": 2
    })
}

async fn serve(router: Router) -> HttpForumApi {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    let config = ClientConfig::default().with_api_url(format!("http://{addr}/"));
    HttpForumApi::new(&config).unwrap()
}

fn forum(seen: Seen) -> Router {
    Router::new()
        .route(
            "/api/auth/validate-tc",
            post(|State(seen): State<Seen>, headers: HeaderMap, Json(body): Json<Value>| async move {
                seen.record("validate-tc", &headers, body);
                Json(json!({ "success": false, "message": "Identity details do not match" }))
            }),
        )
        .route(
            "/api/threads/{tid}",
            get(|Path(id): Path<i64>| async move {
                match id {
                    7 => Json(json!({ "id": 7, "title": "Lifetimes", "tag": "Question" }))
                        .into_response(),
                    500 => (StatusCode::BAD_GATEWAY, "<html>upstream</html>").into_response(),
                    _ => (StatusCode::NOT_FOUND, Json(json!({ "message": "Thread not found" })))
                        .into_response(),
                }
            }),
        )
        .route(
            "/api/threads/{tid}/messages",
            get(|| async { Json(json!([message_json(1, "first"), message_json(2, "second")])) }),
        )
        .route(
            "/api/messages",
            post(|State(seen): State<Seen>, headers: HeaderMap, Json(body): Json<Value>| async move {
                seen.record("create", &headers, body.clone());
                let content = body["content"].as_str().unwrap_or_default().to_string();
                Json(message_json(9, &content))
            }),
        )
        .route(
            "/api/messages/{mid}",
            patch(
                |State(seen): State<Seen>, Path(mid): Path<i64>, headers: HeaderMap, Json(body): Json<Value>| async move {
                    seen.record(format!("update {mid}"), &headers, body.clone());
                    let mut updated = message_json(mid, body["content"].as_str().unwrap_or_default());
                    updated["isEdited"] = json!(true);
                    Json(updated)
                },
            ),
        )
        .route(
            "/api/threads/{tid}/messages/{mid}",
            delete(
                |State(seen): State<Seen>, Path((tid, mid)): Path<(i64, i64)>, headers: HeaderMap| async move {
                    seen.record(format!("delete {tid}/{mid}"), &headers, Value::Null);
                    StatusCode::NO_CONTENT
                },
            ),
        )
        .route(
            "/api/threads/{tid}/messages/{mid}/like",
            post(|headers: HeaderMap| async move {
                let expired = headers
                    .get("authorization")
                    .is_none_or(|v| v.as_bytes() == b"Bearer expired");
                if expired {
                    return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "No token" })))
                        .into_response();
                }
                Json(json!({ "likes": 3 })).into_response()
            }),
        )
        .route(
            "/api/uploads",
            post(|State(seen): State<Seen>, headers: HeaderMap, body: Bytes| async move {
                let name = headers
                    .get(FILENAME_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                seen.record("upload", &headers, json!({ "name": name, "size": body.len() }));
                Json(json!({ "url": format!("/uploads/{name}") }))
            }),
        )
        .route(
            "/api/users/me",
            patch(|State(seen): State<Seen>, headers: HeaderMap, Json(body): Json<Value>| async move {
                seen.record("profile", &headers, body);
                Json(json!({ "id": 3, "username": "mert", "displayName": "Mert", "bio": "hi" }))
            }),
        )
        .with_state(seen)
}

#[tokio::test]
async fn fetches_thread_and_messages() {
    let api = serve(forum(Seen::default())).await;

    let thread = api.fetch_thread(7).await.unwrap();
    assert_eq!(thread.title, "Lifetimes");
    assert_eq!(thread.tag(), Some(ThreadTag::Question));

    let messages = api.fetch_messages(7).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content, "first");
    assert_eq!(messages[1].author_name(), "Mert");
    assert_eq!(messages[1].likes, 2);
}

#[tokio::test]
async fn error_body_message_is_surfaced() {
    let api = serve(forum(Seen::default())).await;

    match api.fetch_thread(99).await {
        Err(ClientError::Api { status, message }) => {
            assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
            assert_eq!(message, "Thread not found");
        }
        other => panic!("expected api error, got {other:?}"),
    }
}

#[tokio::test]
async fn unreadable_error_body_falls_back_to_status_text() {
    let api = serve(forum(Seen::default())).await;

    match api.fetch_thread(500).await {
        Err(ClientError::Api { status, message }) => {
            assert_eq!(status, reqwest::StatusCode::BAD_GATEWAY);
            assert_eq!(message, "Bad Gateway");
        }
        other => panic!("expected api error, got {other:?}"),
    }
}

#[tokio::test]
async fn message_mutations_carry_bearer_token() {
    let seen = Seen::default();
    let api = serve(forum(seen.clone())).await;

    let created = api
        .create_message(
            "tok",
            &CreateMessageRequest {
                thread_id: 7,
                content: "hello".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(created.id, 9);
    let (route, auth, body) = seen.last();
    assert_eq!(route, "create");
    assert_eq!(auth.as_deref(), Some("Bearer tok"));
    assert_eq!(body, json!({ "threadId": 7, "content": "hello" }));

    let updated = api.update_message("tok", 7, 2, "fixed").await.unwrap();
    assert!(updated.is_edited);
    assert_eq!(seen.last().0, "update 2");

    api.delete_message("tok", 7, 2).await.unwrap();
    let (route, auth, _) = seen.last();
    assert_eq!(route, "delete 7/2");
    assert_eq!(auth.as_deref(), Some("Bearer tok"));

    assert_eq!(api.like_message("tok", 7, 1).await.unwrap().likes, 3);
}

#[tokio::test]
async fn unauthorized_maps_to_unauthenticated() {
    let api = serve(forum(Seen::default())).await;

    assert!(matches!(
        api.like_message("expired", 7, 1).await,
        Err(ClientError::Unauthenticated)
    ));
    assert_eq!(api.like_message("tok", 7, 1).await.unwrap().likes, 3);
}

#[tokio::test]
async fn verification_rejection_is_a_normal_response() {
    let seen = Seen::default();
    let api = serve(forum(seen.clone())).await;

    let response = api
        .validate_tc(&ValidateTcRequest {
            tc_no: "10000000146".into(),
            first_name: "Mert".into(),
            last_name: "Demir".into(),
            year_of_birth: "1988".into(),
        })
        .await
        .unwrap();
    assert!(!response.success);
    assert_eq!(response.message.as_deref(), Some("Identity details do not match"));

    let (_, auth, body) = seen.last();
    assert_eq!(auth, None);
    assert_eq!(body["tcNo"], "10000000146");
    assert_eq!(body["yearOfBirth"], "1988");
}

#[tokio::test]
async fn upload_sends_raw_bytes_with_file_name() {
    let seen = Seen::default();
    let api = serve(forum(seen.clone())).await;

    let uploaded = api
        .upload_file("tok", "diagram.png", Bytes::from_static(&[1, 2, 3, 4]))
        .await
        .unwrap();
    assert_eq!(uploaded.url, "/uploads/diagram.png");

    let (route, auth, body) = seen.last();
    assert_eq!(route, "upload");
    assert_eq!(auth.as_deref(), Some("Bearer tok"));
    assert_eq!(body, json!({ "name": "diagram.png", "size": 4 }));
}

#[tokio::test]
async fn profile_update_omits_untouched_fields() {
    let seen = Seen::default();
    let api = serve(forum(seen.clone())).await;

    let user = api
        .update_profile(
            "tok",
            &ProfileUpdateRequest {
                bio: Some("hi".into()),
                ..ProfileUpdateRequest::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(user.bio.as_deref(), Some("hi"));
    assert_eq!(seen.last().2, json!({ "bio": "hi" }));
}
