//! The test client against a small application.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use hermes_core::{Completer, Deferred, Outcome, RestResponse};
use hermes_handlers::{request_filter_fn, ApplicationBuilder, ResourceClass, ResourceMethod};
use hermes_test::{MockExchange, TestClient, TestError, TestRequest};
use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Widget {
    id: u64,
    name: String,
}

fn app() -> ApplicationBuilder {
    ApplicationBuilder::new()
        .resource(
            ResourceClass::new("Widgets", "/widgets")
                .method(
                    ResourceMethod::get(|mut args| {
                        let id: u64 = args.take(0)?;
                        Ok(Outcome::ok(format!("widget {id}")))
                    })
                    .path("/{id}")
                    .path_param::<u64>("id")
                    .produces(mime::TEXT_PLAIN),
                )
                .method(
                    ResourceMethod::post(|mut args| {
                        let widget: Widget = args.take(0)?;
                        Ok(Outcome::ok(Widget {
                            id: widget.id + 1,
                            name: widget.name,
                        }))
                    })
                    .body::<Widget>()
                    .consumes(mime::APPLICATION_JSON)
                    .produces(mime::APPLICATION_JSON),
                )
                .method(
                    ResourceMethod::get(|_| {
                        let (deferred, completer) = Deferred::new();
                        drop(completer);
                        Ok(Outcome::deferred(deferred))
                    })
                    .path("/{id}/broken"),
                ),
        )
        .register_json::<Widget>()
}

#[tokio::test]
async fn test_get_text() {
    let client = TestClient::from_application(app()).unwrap();
    client
        .get("/widgets/3")
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_content_type("text/plain")
        .assert_text("widget 3");
}

#[tokio::test]
async fn test_json_round_trip() {
    let client = TestClient::from_application(app()).unwrap();
    let response = client
        .post("/widgets")
        .json(&Widget {
            id: 1,
            name: "sprocket".to_string(),
        })
        .accept("application/json")
        .send()
        .await;

    response.assert_status(StatusCode::OK);
    let widget: Widget = response.json().unwrap();
    assert_eq!(
        widget,
        Widget {
            id: 2,
            name: "sprocket".to_string()
        }
    );
}

#[tokio::test]
async fn test_chunked_body() {
    let client = TestClient::from_application(app()).unwrap();
    client
        .post("/widgets")
        .content_type("application/json")
        .chunks([r#"{"id": 7, "#, r#""name": "gear"}"#])
        .send()
        .await
        .assert_status(StatusCode::OK);
}

#[tokio::test]
async fn test_bad_param_envelope() {
    let client = TestClient::from_application(app()).unwrap();
    client
        .get("/widgets/abc")
        .send()
        .await
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_content_type("application/json");
}

#[tokio::test]
async fn test_method_not_allowed() {
    let client = TestClient::from_application(app()).unwrap();
    let response = client.request(Method::PUT, "/widgets/3").send().await;
    response
        .assert_status(StatusCode::METHOD_NOT_ALLOWED)
        .assert_error_code("METHOD_NOT_ALLOWED");
    assert!(response.header("allow").is_some());
}

#[tokio::test]
async fn test_unknown_path_is_not_handled() {
    let client = TestClient::from_application(app()).unwrap();
    let err = client.get("/gadgets").try_send().await.unwrap_err();
    assert!(matches!(err, TestError::NotHandled { ref path, .. } if path == "/gadgets"));
}

#[tokio::test]
async fn test_dropped_completer_is_internal_error() {
    let client = TestClient::from_application(app()).unwrap();
    client
        .get("/widgets/1/broken")
        .send()
        .await
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_default_header_reaches_filters() {
    let guarded = app().request_filter(
        0,
        request_filter_fn(|ctx| {
            if ctx.header("x-api-key") != Some("secret") {
                ctx.abort_with(RestResponse::new(StatusCode::UNAUTHORIZED));
            }
            Ok(())
        }),
    );
    let client = TestClient::from_application(guarded)
        .unwrap()
        .with_default_header("X-Api-Key", "secret")
        .with_timeout(Duration::from_secs(1));

    client.get("/widgets/1").send().await.assert_status(StatusCode::OK);
    client
        .call(TestRequest::get("/widgets/1").header("x-api-key", "wrong"))
        .send()
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_mock_exchange_observes_suspension() {
    let parked: Arc<Mutex<Option<Completer>>> = Arc::default();
    let slot = Arc::clone(&parked);
    let dispatcher = ApplicationBuilder::new()
        .resource(ResourceClass::new("Later", "/later").method(ResourceMethod::get(move |_| {
            let (deferred, completer) = Deferred::new();
            *slot.lock().unwrap() = Some(completer);
            Ok(Outcome::deferred(deferred))
        })))
        .build()
        .unwrap();

    let mut pending = MockExchange::new(TestRequest::get("/later"))
        .dispatch(&dispatcher)
        .unwrap();
    assert!(pending.try_take().unwrap().is_none());

    let completer = parked.lock().unwrap().take().unwrap();
    completer.complete(Outcome::ok("done"));
    pending
        .wait(Duration::from_secs(1))
        .await
        .unwrap()
        .assert_status(StatusCode::OK)
        .assert_text("done");
}
