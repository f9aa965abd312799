//! Request/response procedures against a live server.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use erpc::procedure::{encode_query, ENCODED_QUERY_FIELD};
use erpc::{typed, ErpcError, ErrorKind, Procedure, Server};

mod common;

#[derive(Serialize, Deserialize)]
struct Msg {
    msg: String,
}

#[derive(Serialize, Deserialize)]
struct Filter {
    tags: Vec<String>,
    limit: u32,
}

fn echo_server(log_errors: bool, handler_ran: Arc<AtomicBool>) -> Server {
    let mut config = common::test_config();
    config.errors.log_errors = log_errors;
    let mut server = Server::new(config);

    let base = Procedure::base();
    let router = server.router();
    router.post("/echo", &base.input(typed::<Msg>()), move |_req, locals| {
        let ran = handler_ran.clone();
        async move {
            ran.store(true, Ordering::SeqCst);
            let input: Msg = locals.input()?;
            Ok(json!({ "echo": input.msg }))
        }
    });
    router.get(
        "/secret",
        &base.extend(|req, _| async move {
            match req.header("authorization") {
                Some(token) => Ok(json!({ "token": token })),
                None => Err(ErpcError::new(ErrorKind::Unauthorized, "missing token")),
            }
        }),
        |_req, locals| async move { Ok(locals.get("token").cloned()) },
    );
    router.get("/boom", &base, |_req, _| async {
        Err::<Value, _>(ErpcError::other("database unreachable"))
    });
    router.get("/search", &base.query(typed::<Filter>()), |_req, locals| async move {
        let filter: Filter = locals.query()?;
        Ok(json!({ "tags": filter.tags, "limit": filter.limit }))
    });
    server
}

#[tokio::test]
async fn echo_returns_success_envelope() {
    let running = common::spawn(echo_server(true, Arc::new(AtomicBool::new(false)))).await;

    let res = common::client()
        .post(running.url("/echo"))
        .json(&json!({ "msg": "hi" }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "success": true, "result": { "echo": "hi" } }));
}

#[tokio::test]
async fn invalid_input_never_reaches_handler() {
    let ran = Arc::new(AtomicBool::new(false));
    let running = common::spawn(echo_server(true, ran.clone())).await;

    let res = common::client()
        .post(running.url("/echo"))
        .json(&json!({ "msg": 5 }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"]["type"], json!("BAD_REQUEST"));
    assert!(!ran.load(Ordering::SeqCst));
}

#[tokio::test]
async fn classified_step_failure_sets_status() {
    let running = common::spawn(echo_server(true, Arc::new(AtomicBool::new(false)))).await;
    let client = common::client();

    let denied = client.get(running.url("/secret")).send().await.unwrap();
    assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);
    let body: Value = denied.json().await.unwrap();
    assert_eq!(
        body,
        json!({ "success": false, "error": { "type": "UNAUTHORIZED", "message": "missing token" } })
    );

    let allowed = client
        .get(running.url("/secret"))
        .header("authorization", "abc")
        .send()
        .await
        .unwrap();
    let body: Value = allowed.json().await.unwrap();
    assert_eq!(body["result"], json!("abc"));
}

#[tokio::test]
async fn unclassified_message_hidden_without_log_errors() {
    let shown = common::spawn(echo_server(true, Arc::new(AtomicBool::new(false)))).await;
    let hidden = common::spawn(echo_server(false, Arc::new(AtomicBool::new(false)))).await;
    let client = common::client();

    let res = client.get(shown.url("/boom")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "success": false, "error": "database unreachable" }));

    let res = client.get(hidden.url("/boom")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "success": false }));
}

#[tokio::test]
async fn encoded_query_blob_is_decoded() {
    let running = common::spawn(echo_server(true, Arc::new(AtomicBool::new(false)))).await;
    let blob = encode_query(&json!({ "tags": ["a", "b"], "limit": 10 })).unwrap();

    let res = common::client()
        .get(running.url("/search"))
        .query(&[(ENCODED_QUERY_FIELD, blob.as_str())])
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["result"], json!({ "tags": ["a", "b"], "limit": 10 }));
}

#[tokio::test]
async fn unknown_path_is_not_found_envelope() {
    let running = common::spawn(echo_server(true, Arc::new(AtomicBool::new(false)))).await;

    let res = common::client().get(running.url("/nowhere")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"]["type"], json!("NOT_FOUND"));
}

#[tokio::test]
async fn sub_router_params_merge() {
    let mut server = Server::new(common::test_config());
    let base = Procedure::base();
    let user = server.sub("/user/:user_uuid");
    user.put("/msg/:msg_uuid", &base, |req, _| async move {
        Ok(json!({ "updatedBy": req.param("user_uuid"), "uuid": req.param("msg_uuid") }))
    });
    user.sub("/message")
        .post("/create", &base, |req, _| async move { Ok(json!({ "owner": req.param("user_uuid") })) });
    let running = common::spawn(server).await;
    let client = common::client();

    let body: Value = client
        .put(running.url("/user/u1/msg/m9"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["result"], json!({ "updatedBy": "u1", "uuid": "m9" }));

    let body: Value = client
        .post(running.url("/user/u2/message/create"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["result"], json!({ "owner": "u2" }));
}

#[tokio::test]
async fn custom_error_handler_replaces_envelope() {
    let mut server = Server::new(common::test_config());
    server
        .router()
        .get("/teapot", &Procedure::base(), |_req, _| async {
            Err::<(), _>(ErpcError::new(ErrorKind::Conflict, "taken"))
        });
    server.on_error(|err| {
        use axum::response::IntoResponse;
        (StatusCode::IM_A_TEAPOT, format!("custom: {err}")).into_response()
    });
    let running = common::spawn(server).await;

    let res = common::client().get(running.url("/teapot")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(res.text().await.unwrap(), "custom: taken");
}

#[test]
fn conflicting_routes_fail_activation() {
    let mut server = Server::new(common::test_config());
    let base = Procedure::base();
    server.router().get("/item/:id", &base, |_req, _| async { Ok(()) });
    server.router().get("/item/:uuid/parts", &base, |_req, _| async { Ok(()) });

    assert!(matches!(
        server.into_app(),
        Err(erpc::ServerError::Route(erpc::RouteError::ConflictingParameters { .. }))
    ));
}

#[tokio::test]
async fn overrunning_handler_gets_timeout_envelope() {
    let mut config = common::test_config();
    config.timeouts.request_secs = 1;
    let mut server = Server::new(config);
    server.router().get("/slow", &Procedure::base(), |_req, _| async {
        tokio::time::sleep(std::time::Duration::from_secs(3)).await;
        Ok("late")
    });
    let running = common::spawn(server).await;

    let res = common::client().get(running.url("/slow")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::REQUEST_TIMEOUT);
    assert!(res.headers().contains_key("x-request-id"));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"]["type"], json!("TIMEOUT"));
}
