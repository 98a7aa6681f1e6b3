use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use skiff::{
    Application, BoxError, Config, DispatchMode, Event, EventType, Method, Router, Server,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct Running {
    addr: SocketAddr,
    stop: oneshot::Sender<()>,
    task: JoinHandle<Result<(), skiff::Error>>,
}

impl Running {
    async fn shutdown(self) -> Result<(), skiff::Error> {
        let _ = self.stop.send(());
        self.task.await.unwrap()
    }
}

async fn start(app: Application) -> Running {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    let task = tokio::spawn(Server::serve_listener(listener, app, async {
        let _ = stopped.await;
    }));
    Running { addr, stop, task }
}

async fn roundtrip(addr: SocketAddr, raw: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw.as_bytes()).await.unwrap();
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    String::from_utf8_lossy(&buf).to_ascii_lowercase()
}

fn router() -> Router {
    Router::new()
        .get("/hello/{name}", |req, res| {
            res.text(format!("hello {}", req.param("name").unwrap_or("?")));
            Ok(())
        })
        .post("/echo", |req, res| {
            res.text(String::from_utf8_lossy(req.body()).into_owned());
            Ok(())
        })
}

#[tokio::test]
async fn serves_routes_over_http() {
    let server = start(Application::new(router())).await;

    let res = roundtrip(server.addr, "GET /hello/ada HTTP/1.1\r\nhost: t\r\nconnection: close\r\n\r\n").await;
    assert!(res.starts_with("http/1.1 200 ok"), "{res}");
    assert!(res.contains(&format!("server: {}", skiff::SERVER_NAME)));
    assert!(res.ends_with("hello ada"));

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn not_found_closes_the_connection() {
    let server = start(Application::new(router())).await;

    // No `connection: close` from the client: the server must close on its own.
    let res = roundtrip(server.addr, "GET /nope HTTP/1.1\r\nhost: t\r\n\r\n").await;
    assert!(res.starts_with("http/1.1 404 not found"), "{res}");
    assert!(res.contains("connection: close"));
    assert!(res.contains("/nope"));

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn unknown_method_is_405() {
    let server = start(Application::new(router())).await;

    let res = roundtrip(server.addr, "BREW /hello/ada HTTP/1.1\r\nhost: t\r\n\r\n").await;
    assert!(res.starts_with("http/1.1 405 method not allowed"), "{res}");
    assert!(res.contains("connection: close"));

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn expect_continue_is_acknowledged() {
    let server = start(Application::new(router())).await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream
        .write_all(b"POST /echo HTTP/1.1\r\nhost: t\r\ncontent-length: 5\r\nexpect: 100-continue\r\nconnection: close\r\n\r\n")
        .await
        .unwrap();

    let mut interim = [0u8; 64];
    let n = stream.read(&mut interim).await.unwrap();
    assert!(String::from_utf8_lossy(&interim[..n]).to_ascii_lowercase().starts_with("http/1.1 100 continue"));

    stream.write_all(b"ping!").await.unwrap();
    let mut rest = Vec::new();
    stream.read_to_end(&mut rest).await.unwrap();
    let rest = String::from_utf8_lossy(&rest).to_ascii_lowercase();
    assert!(rest.contains("200 ok"), "{rest}");
    assert!(rest.ends_with("ping!"));

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn malformed_body_is_a_generic_500() {
    let server = start(Application::new(router())).await;

    let res = roundtrip(
        server.addr,
        "POST /echo HTTP/1.1\r\nhost: t\r\ntransfer-encoding: chunked\r\n\r\nzz\r\n",
    )
    .await;
    assert!(res.starts_with("http/1.1 500 internal server error"), "{res}");
    assert!(res.contains("connection: close"));
    assert!(res.contains(&format!("server: {}", skiff::SERVER_NAME)));
    assert!(res.ends_with("failure: 500 internal server error\r\n"));

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn idle_keep_alive_connection_does_not_block_shutdown() {
    let server = start(Application::new(router())).await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream.write_all(b"GET /hello/ada HTTP/1.1\r\nhost: t\r\n\r\n").await.unwrap();
    let mut buf = Vec::new();
    while !buf.ends_with(b"hello ada") {
        let mut chunk = [0u8; 256];
        let n = stream.read(&mut chunk).await.unwrap();
        assert!(n > 0, "connection closed before the response completed");
        buf.extend_from_slice(&chunk[..n]);
    }

    // The connection stays open and idle while the server stops.
    tokio::time::timeout(Duration::from_secs(5), server.shutdown())
        .await
        .expect("shutdown waited on an idle connection")
        .unwrap();

    let mut rest = Vec::new();
    stream.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());
}

#[tokio::test]
async fn worker_pool_mode_dispatches_off_the_runtime() {
    let mut config = Config::default();
    config.server.dispatch = DispatchMode::WorkerPool;
    let app = Application::new(
        Router::new().handle(Method::Get, "/thread", |_req, res| {
            let name = std::thread::current().name().unwrap_or_default().to_owned();
            res.text(name);
            Ok(())
        }),
    )
    .with_config(config);
    let server = start(app).await;

    let res = roundtrip(server.addr, "GET /thread HTTP/1.1\r\nhost: t\r\nconnection: close\r\n\r\n").await;
    assert!(res.starts_with("http/1.1 200 ok"), "{res}");

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn lifecycle_events_fire_in_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut app = Application::new(router());
    for kind in [
        EventType::ServerStopped,
        EventType::ServerStarting,
        EventType::ServerStopping,
        EventType::ServerStarted,
    ] {
        let log = Arc::clone(&log);
        app = app.on(kind, move |event: &Event| -> Result<(), BoxError> {
            log.lock().push(event.kind());
            Ok(())
        });
    }

    let server = start(app).await;
    roundtrip(server.addr, "GET /hello/x HTTP/1.1\r\nhost: t\r\nconnection: close\r\n\r\n").await;
    server.shutdown().await.unwrap();

    assert_eq!(
        *log.lock(),
        [
            EventType::ServerStarting,
            EventType::ServerStarted,
            EventType::ServerStopping,
            EventType::ServerStopped,
        ]
    );
}

#[tokio::test]
async fn failing_startup_listener_aborts_the_server() {
    let app = Application::new(router()).on(EventType::ServerStarting, |_: &Event| -> Result<(), BoxError> {
        Err("license check failed".into())
    });
    let server = start(app).await;

    let err = server.task.await.unwrap().unwrap_err();
    assert!(matches!(err, skiff::Error::Event(ref e) if e.event == EventType::ServerStarting));
}
