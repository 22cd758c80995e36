use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tokio::sync::{mpsc, oneshot};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Debug)]
pub enum ControlRequest {
    Report {
        reply: oneshot::Sender<String>,
    },
    Override {
        body: String,
        reply: oneshot::Sender<()>,
    },
    Tracking {
        on: bool,
        reply: oneshot::Sender<()>,
    },
}

#[derive(Debug, Clone)]
pub struct ControlHandle {
    tx: mpsc::Sender<ControlRequest>,
}

impl ControlHandle {
    pub fn new(tx: mpsc::Sender<ControlRequest>) -> Self {
        Self { tx }
    }

    async fn ask<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> ControlRequest,
    ) -> Result<T, ControlError> {
        let (reply, answer) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| ControlError::LoopGone)?;
        answer.await.map_err(|_| ControlError::LoopGone)
    }
}

pub enum ControlError {
    LoopGone,
}

impl IntoResponse for ControlError {
    fn into_response(self) -> Response {
        match self {
            ControlError::LoopGone => {
                (StatusCode::SERVICE_UNAVAILABLE, "control loop stopped").into_response()
            }
        }
    }
}

async fn get_values(State(handle): State<ControlHandle>) -> Result<Response, ControlError> {
    let report = handle.ask(|reply| ControlRequest::Report { reply }).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        report,
    )
        .into_response())
}

async fn post_override(
    State(handle): State<ControlHandle>,
    body: String,
) -> Result<StatusCode, ControlError> {
    handle
        .ask(|reply| ControlRequest::Override { body, reply })
        .await?;
    Ok(StatusCode::OK)
}

async fn start(State(handle): State<ControlHandle>) -> Result<StatusCode, ControlError> {
    handle
        .ask(|reply| ControlRequest::Tracking { on: true, reply })
        .await?;
    Ok(StatusCode::OK)
}

async fn stop(State(handle): State<ControlHandle>) -> Result<StatusCode, ControlError> {
    handle
        .ask(|reply| ControlRequest::Tracking { on: false, reply })
        .await?;
    Ok(StatusCode::OK)
}

pub fn router(handle: ControlHandle) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/getvalues.txt", get(get_values))
        .route("/", post(post_override))
        .route("/start", post(start))
        .route("/stop", post(stop))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(handle)
}

pub async fn run_server(bind_addr: &str, handle: ControlHandle) -> std::io::Result<()> {
    log::info!("Starting control surface on {}", bind_addr);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, router(handle)).await
}
