//! The hyper transport over a real socket.

use std::sync::Arc;

use linear_web::health::Health;
use linear_web::{Args, Dispatcher, HandlerError, MediaType, ParamType, ParameterBinding, Route, Scanner, Server};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct Running {
    addr: std::net::SocketAddr,
    stop: oneshot::Sender<()>,
    task: JoinHandle<linear_web::Result<()>>,
}

async fn start() -> Running {
    let table = Scanner::new()
        .base_path("/api")
        .controller(Health::new())
        .route(
            Route::post("/echo/{n}")
                .consumes([MediaType::Json])
                .produces([MediaType::Json, MediaType::Xml])
                .param(ParameterBinding::path("n", ParamType::Int))
                .param(ParameterBinding::body::<Vec<i64>>("values"))
                .handler(|mut args: Args| {
                    let n: i64 = args.get("n").unwrap_or_default();
                    let values = args.take_body::<Vec<i64>>().unwrap_or_default();
                    Ok::<_, HandlerError>(values.into_iter().map(|v| v * n).collect::<Vec<_>>())
                }),
        )
        .build()
        .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, rx) = oneshot::channel::<()>();
    let server = Server::bind("127.0.0.1:0").unwrap().workers(2);
    let task = tokio::spawn(server.serve_with_shutdown(listener, Dispatcher::new(Arc::new(table)), async {
        let _ = rx.await;
    }));
    Running { addr, stop, task }
}

async fn send(addr: std::net::SocketAddr, raw: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw.as_bytes()).await.unwrap();
    let mut out = Vec::new();
    stream.read_to_end(&mut out).await.unwrap();
    String::from_utf8(out).unwrap()
}

#[tokio::test]
async fn serves_health_under_base_path() {
    let running = start().await;

    let res = send(running.addr, "GET /api/healthz HTTP/1.1\r\nhost: test\r\nconnection: close\r\n\r\n").await;
    assert!(res.starts_with("HTTP/1.1 200 OK"), "{res}");
    assert!(res.contains("content-type: application/json"), "{res}");
    assert!(res.ends_with(r#"{"status":"ok"}"#), "{res}");

    running.stop.send(()).unwrap();
    running.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn binds_path_and_body_over_the_wire() {
    let running = start().await;

    let body = "[1,2,3]";
    let raw = format!(
        "POST /api/echo/3 HTTP/1.1\r\nhost: test\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    );
    let res = send(running.addr, &raw).await;
    assert!(res.starts_with("HTTP/1.1 200 OK"), "{res}");
    assert!(res.ends_with("[3,6,9]"), "{res}");

    let raw = format!(
        "POST /api/echo/2 HTTP/1.1\r\nhost: test\r\ncontent-type: application/json\r\naccept: application/xml\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    );
    let res = send(running.addr, &raw).await;
    assert!(res.starts_with("HTTP/1.1 200 OK"), "{res}");
    assert!(res.contains("content-type: application/xml"), "{res}");
    assert!(res.ends_with("<response>2</response><response>4</response><response>6</response>"), "{res}");

    running.stop.send(()).unwrap();
    running.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn failures_carry_status_and_error_body() {
    let running = start().await;

    let res = send(running.addr, "GET /api/missing HTTP/1.1\r\nhost: test\r\nconnection: close\r\n\r\n").await;
    assert!(res.starts_with("HTTP/1.1 404 Not Found"), "{res}");
    assert!(res.contains(r#""code":"route_not_found""#), "{res}");

    let res = send(
        running.addr,
        "GET /api/healthz HTTP/1.1\r\nhost: test\r\naccept: text/html\r\nconnection: close\r\n\r\n",
    )
    .await;
    assert!(res.starts_with("HTTP/1.1 406 Not Acceptable"), "{res}");

    running.stop.send(()).unwrap();
    running.task.await.unwrap().unwrap();
}
