//! Local stand-in for the Notion inference endpoint, for load tests against the proxy.

use std::convert::Infallible;
use std::env;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use http::{header, HeaderValue, Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as AutoBuilder;
use tokio::net::TcpListener;

const DEFAULT_UPSTREAM_PORT: u16 = 19_002;
const TRANSCRIPT_PATH: &str = "/api/v3/runInferenceTranscript";

#[derive(Copy, Clone)]
enum MockScenario {
    Text,
    Long,
    Unauthorized,
    Error,
}

impl MockScenario {
    fn from_env() -> Self {
        match env::var("MOCK_SCENARIO").as_deref() {
            Ok("long") => Self::Long,
            Ok("unauthorized") => Self::Unauthorized,
            Ok("error") => Self::Error,
            Ok("text") | Err(_) => Self::Text,
            Ok(other) => {
                eprintln!("unknown MOCK_SCENARIO '{other}', fallback to text");
                Self::Text
            }
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Long => "long",
            Self::Unauthorized => "unauthorized",
            Self::Error => "error",
        }
    }
}

struct MockState {
    scenario: MockScenario,
    long_body: Bytes,
    requests: AtomicU64,
    missing_cookie: AtomicU64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let port = env::var("UPSTREAM_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(DEFAULT_UPSTREAM_PORT);
    let fragments = env::var("MOCK_FRAGMENTS")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(500);
    let state = Arc::new(MockState {
        scenario: MockScenario::from_env(),
        long_body: long_transcript(fragments),
        requests: AtomicU64::new(0),
        missing_cookie: AtomicU64::new(0),
    });

    let listener = TcpListener::bind(("127.0.0.1", port))
        .await
        .unwrap_or_else(|err| panic!("failed to bind mock upstream on 127.0.0.1:{port}: {err}"));
    eprintln!(
        "mock notion upstream on http://127.0.0.1:{port}{TRANSCRIPT_PATH} (scenario={})",
        state.scenario.name()
    );
    let conn_builder = AutoBuilder::new(TokioExecutor::new());

    loop {
        let (stream, remote_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                eprintln!("accept error: {err}");
                continue;
            }
        };
        let io = TokioIo::new(stream);
        let conn_builder = conn_builder.clone();
        let service_state = Arc::clone(&state);
        let service = service_fn(move |request: Request<Incoming>| {
            let state_ref = Arc::clone(&service_state);
            async move { Ok::<_, Infallible>(handle_request(request, &state_ref).await) }
        });

        tokio::spawn(async move {
            if let Err(err) = conn_builder.serve_connection(io, service).await {
                eprintln!("mock upstream connection error from {remote_addr}: {err}");
            }
        });
    }
}

async fn handle_request(request: Request<Incoming>, state: &MockState) -> Response<Full<Bytes>> {
    let (parts, body) = request.into_parts();
    drain_request_body(body).await;

    if parts.method == Method::GET && parts.uri.path() == "/_mock/stats" {
        let body = format!(
            "{{\"scenario\":\"{}\",\"requests\":{},\"missing_cookie\":{}}}",
            state.scenario.name(),
            state.requests.load(Ordering::Relaxed),
            state.missing_cookie.load(Ordering::Relaxed),
        );
        return simple_response(StatusCode::OK, "application/json", Bytes::from(body));
    }
    if parts.uri.path() != TRANSCRIPT_PATH {
        return simple_response(
            StatusCode::NOT_FOUND,
            "application/json",
            Bytes::from_static(br#"{"errorId":"not_found"}"#),
        );
    }
    if parts.method != Method::POST {
        return simple_response(
            StatusCode::METHOD_NOT_ALLOWED,
            "application/json",
            Bytes::from_static(br#"{"errorId":"method_not_allowed"}"#),
        );
    }

    state.requests.fetch_add(1, Ordering::Relaxed);
    if !parts.headers.contains_key(header::COOKIE) {
        state.missing_cookie.fetch_add(1, Ordering::Relaxed);
    }

    match state.scenario {
        MockScenario::Text => simple_response(
            StatusCode::OK,
            "application/x-ndjson",
            Bytes::from_static(TEXT_TRANSCRIPT),
        ),
        MockScenario::Long => {
            simple_response(StatusCode::OK, "application/x-ndjson", state.long_body.clone())
        }
        MockScenario::Unauthorized => simple_response(
            StatusCode::UNAUTHORIZED,
            "application/json",
            Bytes::from_static(br#"{"errorId":"mock","name":"UnauthorizedError","message":"Token was invalid or expired."}"#),
        ),
        MockScenario::Error => simple_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "application/json",
            Bytes::from_static(br#"{"errorId":"mock","name":"ServiceUnavailable","message":"mock injected error"}"#),
        ),
    }
}

async fn drain_request_body(mut body: Incoming) {
    while let Some(frame_result) = body.frame().await {
        if frame_result.is_err() {
            break;
        }
    }
}

fn long_transcript(fragments: usize) -> Bytes {
    let mut body = String::with_capacity(fragments * 48 + 64);
    body.push_str("{\"type\":\"title\",\"value\":\"Mock thread\"}\n");
    for index in 0..fragments {
        body.push_str("{\"type\":\"markdown-chat\",\"value\":\"token ");
        body.push_str(&index.to_string());
        body.push_str(" \"}\n");
    }
    body.push_str("{\"recordMap\":{\"thread\":{}}}\n");
    Bytes::from(body)
}

fn simple_response(
    status: StatusCode,
    content_type: &'static str,
    body: Bytes,
) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

const TEXT_TRANSCRIPT: &[u8] = b"{\"type\":\"title\",\"value\":\"Mock thread\"}\n{\"type\":\"markdown-chat\",\"value\":\"Hello\"}\n{\"type\":\"markdown-chat\",\"value\":\" from the mock\"}\n{\"type\":\"markdown-chat\",\"value\":\" upstream.\"}\n{\"recordMap\":{\"thread\":{}}}\n";
