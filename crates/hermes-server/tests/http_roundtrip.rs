//! Requests over a real TCP connection.
//!
//! Each test binds an ephemeral port, serves an application on it and talks
//! raw HTTP/1.1 with `Connection: close`, so the response is everything
//! read until the server closes the socket.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hermes_core::{Completer, Deferred, Outcome};
use hermes_handlers::{ApplicationBuilder, ResourceClass, ResourceMethod};
use hermes_server::{Lifecycle, Server, ShutdownSignal};
use http::Method;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

struct Running {
    addr: SocketAddr,
    shutdown: ShutdownSignal,
    handle: JoinHandle<Result<(), hermes_server::ServerError>>,
}

fn application(parked: Arc<Mutex<Vec<Completer>>>) -> ApplicationBuilder {
    ApplicationBuilder::new().resource(
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
                    let text: String = args.take(0)?;
                    Ok(Outcome::ok(text.to_uppercase()))
                })
                .path("/echo")
                .body::<String>(),
            )
            .method(
                ResourceMethod::get(move |_| {
                    let (deferred, completer) = Deferred::new();
                    parked.lock().unwrap().push(completer);
                    Ok(Outcome::deferred(deferred))
                })
                .path("/{id}/stuck"),
            ),
    )
}

async fn start(server_lifecycle: Lifecycle) -> Running {
    let parked = Arc::new(Mutex::new(Vec::new()));
    let dispatcher = application(parked).build().unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = ShutdownSignal::new();

    let server = Server::builder(dispatcher)
        .request_timeout(Duration::from_millis(200))
        .shutdown_timeout(Duration::from_secs(1))
        .lifecycle(server_lifecycle)
        .build();
    let handle = tokio::spawn(server.serve(listener, shutdown.clone()));
    Running {
        addr,
        shutdown,
        handle,
    }
}

async fn exchange(addr: SocketAddr, request: &str) -> (u16, String, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut raw))
        .await
        .unwrap()
        .unwrap();
    let raw = String::from_utf8(raw).unwrap();
    let (head, body) = raw.split_once("\r\n\r\n").unwrap();
    let status = head
        .split(' ')
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap();
    (status, head.to_ascii_lowercase(), body.to_string())
}

fn request(method: &Method, path: &str) -> String {
    format!("{method} {path} HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_get_over_tcp() {
    let running = start(Lifecycle::new()).await;
    let (status, head, body) = exchange(running.addr, &request(&Method::GET, "/widgets/5")).await;

    assert_eq!(status, 200);
    assert!(head.contains("content-type: text/plain"));
    assert_eq!(body, "widget 5");
    running.shutdown.trigger();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_chunked_upload() {
    let running = start(Lifecycle::new()).await;
    let request = "POST /widgets/echo HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\
                   Content-Type: text/plain\r\nTransfer-Encoding: chunked\r\n\r\n\
                   5\r\nhello\r\n6\r\n world\r\n0\r\n\r\n";
    let (status, _, body) = exchange(running.addr, request).await;

    assert_eq!(status, 200);
    assert_eq!(body, "HELLO WORLD");
    running.shutdown.trigger();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unknown_path_uses_fallback() {
    let running = start(Lifecycle::new()).await;
    let (status, head, body) = exchange(running.addr, &request(&Method::GET, "/gadgets")).await;

    assert_eq!(status, 404);
    assert!(head.contains("content-type: application/json"));
    assert!(body.contains("NOT_FOUND"));
    running.shutdown.trigger();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_request_timeout_is_504() {
    let running = start(Lifecycle::new()).await;
    let (status, _, _) = exchange(running.addr, &request(&Method::GET, "/widgets/1/stuck")).await;
    assert_eq!(status, 504);
    running.shutdown.trigger();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_runs_hooks() {
    let stopped = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stopped);
    let lifecycle = Lifecycle::new().on_shutdown("mark", move || {
        let flag = Arc::clone(&flag);
        async move {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        }
    });

    let running = start(lifecycle).await;
    let (status, _, _) = exchange(running.addr, &request(&Method::GET, "/widgets/1")).await;
    assert_eq!(status, 200);

    running.shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), running.handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(stopped.load(Ordering::SeqCst));
    assert!(TcpStream::connect(running.addr).await.is_err());
}
