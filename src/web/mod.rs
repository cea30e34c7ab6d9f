// Web chat
// Serves the chat page and answers questions sent as form fields over HTTP


use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Form, FromRequest, Multipart, Request, State};
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::qa::RetrievalQa;

const CHAT_PAGE: &str = include_str!("chat.html");

const MSG_FIELD: &str = "msg";

#[derive(Debug, Deserialize)]
struct ChatForm {
    msg: String,
}

/// The `msg` field of a query string, urlencoded body or multipart body
#[derive(Debug)]
struct Question(String);

impl<S> FromRequest<S> for Question
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));

        if !is_multipart {
            let Form(form) = Form::<ChatForm>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            return Ok(Self(form.msg));
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(IntoResponse::into_response)?
        {
            if field.name() == Some(MSG_FIELD) {
                let text = field.text().await.map_err(IntoResponse::into_response)?;
                return Ok(Self(text));
            }
        }

        Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("Missing form field `{}`", MSG_FIELD),
        )
            .into_response())
    }
}

/// `GET /` serves the page; `GET` or `POST /get` answers the `msg` field
#[inline]
pub fn router(qa: Arc<RetrievalQa>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/get", get(answer).post(answer))
        .with_state(qa)
}

/// Serve until the listener fails
#[inline]
pub async fn serve(listener: TcpListener, qa: Arc<RetrievalQa>) -> anyhow::Result<()> {
    let addr = listener.local_addr().context("listener has no local address")?;
    info!("Chat server listening on http://{}", addr);

    axum::serve(listener, router(qa))
        .await
        .context("server shutdown")?;
    Ok(())
}

async fn index() -> Html<&'static str> {
    Html(CHAT_PAGE)
}

async fn answer(
    State(qa): State<Arc<RetrievalQa>>,
    Question(question): Question,
) -> Result<String, (StatusCode, String)> {
    info!("Question: {}", question);

    let response = tokio::task::spawn_blocking(move || qa.ask(&question))
        .await
        .map_err(|e| internal_error(&e))?
        .map_err(|e| internal_error(&e))?;

    info!("Response: {}", response.result);
    Ok(response.result)
}

fn internal_error(err: &dyn std::fmt::Display) -> (StatusCode, String) {
    error!("Failed to answer: {}", err);
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}
