//! Local axum app standing in for the caption CDN.

use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::{serve, Router};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use url::Url;

/// One request as the server saw it
#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
}

impl RecordedRequest {
    pub(crate) fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

#[derive(Clone)]
struct Responder {
    status: StatusCode,
    body: Arc<Vec<u8>>,
    seen: Arc<Mutex<Vec<RecordedRequest>>>,
}

async fn respond(
    State(responder): State<Responder>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> impl IntoResponse {
    responder.seen.lock().unwrap().push(RecordedRequest {
        method,
        path: uri.path().to_string(),
        headers,
    });

    (
        responder.status,
        [(header::CONTENT_TYPE, "text/vtt")],
        responder.body.as_ref().clone(),
    )
}

pub(crate) struct TestServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl TestServer {
    /// Answer every request with `status` and `body`
    pub(crate) async fn serve(status: u16, body: Vec<u8>) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new().fallback(respond).with_state(Responder {
            status: StatusCode::from_u16(status).unwrap(),
            body: Arc::new(body),
            seen: Arc::clone(&requests),
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            serve(listener, app).await.expect("server run");
        });

        Self { addr, requests }
    }

    /// A URL nothing listens on
    pub(crate) async fn unused_url() -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);
        Url::parse(&format!("http://{}/captions/none.vtt", addr)).unwrap()
    }

    pub(crate) fn url(&self, path: &str) -> Url {
        Url::parse(&format!("http://{}{}", self.addr, path)).unwrap()
    }

    /// Requests received so far
    pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}
