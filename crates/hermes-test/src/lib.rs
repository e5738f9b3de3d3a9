//! # Hermes Test
//!
//! An in-memory client for applications built on the Hermes dispatch
//! engine. Requests go through the dispatcher exactly as the server would
//! send them, without binding a port.
//!
//! ```rust,ignore
//! use hermes_test::TestClient;
//! use http::StatusCode;
//!
//! #[tokio::test]
//! async fn test_create_widget() {
//!     let client = TestClient::from_application(app()).unwrap();
//!
//!     let response = client
//!         .post("/widgets")
//!         .json(&serde_json::json!({ "id": 1, "name": "sprocket" }))
//!         .send()
//!         .await;
//!
//!     response.assert_status(StatusCode::OK);
//!     let widget: Widget = response.json().unwrap();
//!     assert_eq!(widget.name, "sprocket");
//! }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod exchange;
mod request;
mod response;

pub use client::{TestCall, TestClient};
pub use error::TestError;
pub use exchange::{MockExchange, PendingResponse};
pub use request::TestRequest;
pub use response::TestResponse;
