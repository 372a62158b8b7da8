use std::net::SocketAddr;

use anyhow::Context;
use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use commentbox_api::{ApiResponse, Comment, CommentId, Error, NewComment};
use tower_http::trace::TraceLayer;

use crate::{MockError, Shared};

impl IntoResponse for MockError {
    fn into_response(self) -> Response {
        tracing::info!("returning error to client: {self}");
        let status = self.status_code();
        (
            status,
            [(header::CONTENT_TYPE, "application/json")],
            Error::from(self).contents(),
        )
            .into_response()
    }
}

type Reply<T> = Result<Json<ApiResponse<T>>, MockError>;

/// The comments REST API, served from a shared `MockServer`
pub fn router(server: Shared) -> Router {
    Router::new()
        .route("/api/comments", get(list).post(create))
        .route("/api/comments/", get(list))
        .route("/api/comments/:id", put(update).delete(delete))
        .layer(TraceLayer::new_for_http())
        .with_state(server)
}

async fn list(State(server): State<Shared>) -> Reply<Vec<Comment>> {
    Ok(Json(ApiResponse::ok(Some(server.lock().await.list()?))))
}

async fn create(State(server): State<Shared>, Json(c): Json<NewComment>) -> Reply<Comment> {
    Ok(Json(ApiResponse::ok(Some(server.lock().await.create(c)?))))
}

async fn update(
    State(server): State<Shared>,
    Path(id): Path<String>,
    Json(c): Json<NewComment>,
) -> Reply<Comment> {
    let id = CommentId(id);
    Ok(Json(ApiResponse::ok(Some(
        server.lock().await.update(&id, c)?,
    ))))
}

async fn delete(State(server): State<Shared>, Path(id): Path<String>) -> Reply<()> {
    server.lock().await.delete(&CommentId(id))?;
    Ok(Json(ApiResponse::ok(None)))
}

/// Serve `router` on an ephemeral localhost port, in the background
pub async fn spawn(server: Shared) -> anyhow::Result<SocketAddr> {
    let addr = SocketAddr::from(([127, 0, 0, 1], 0));
    let serving = axum::Server::try_bind(&addr)
        .with_context(|| format!("binding mock server to {addr}"))?
        .serve(router(server).into_make_service());
    let addr = serving.local_addr();
    tracing::info!("mock server listening on {}", addr);
    tokio::spawn(async move {
        if let Err(err) = serving.await {
            tracing::error!(?err, "mock server stopped");
        }
    });
    Ok(addr)
}
