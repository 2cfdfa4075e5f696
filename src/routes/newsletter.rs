//! `/send-newsletter`: the HTTP contract of the newsletter function.
//!
//! Every response carries the permissive CORS headers browsers need to call
//! it cross-origin, including errors and the `OPTIONS` preflight.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::error::AppError;
use crate::newsletter::{NewsletterPayload, NewsletterResponse};
use crate::AppState;

pub const ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type";
pub const ALLOW_METHODS: &str = "POST, OPTIONS";

fn with_cors(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOW_HEADERS));
    headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOW_METHODS));
    response
}

/// Send a newsletter to the given subscribers
#[utoipa::path(
    post,
    path = "/send-newsletter",
    request_body = NewsletterPayload,
    responses(
        (status = 200, description = "Batch ran; `sent`/`failed` count the outcomes", body = NewsletterResponse),
        (status = 400, description = "Missing fields, unknown type or no subscribers"),
        (status = 405, description = "Only POST and OPTIONS are allowed"),
        (status = 500, description = "Email provider API key not configured")
    ),
    tag = "newsletter"
)]
#[tracing::instrument(skip(state, payload))]
pub async fn send(State(state): State<AppState>, payload: Result<Json<NewsletterPayload>, JsonRejection>) -> Response {
    with_cors(dispatch(state, payload).await.into_response())
}

async fn dispatch(
    state: AppState,
    payload: Result<Json<NewsletterPayload>, JsonRejection>,
) -> Result<Json<NewsletterResponse>, AppError> {
    let Json(payload) = payload?;
    let request = payload.validate()?;
    tracing::info!(
        title = %request.title,
        kind = ?request.kind,
        subscribers = request.subscribers.len(),
        "newsletter request received"
    );

    let dispatcher = state.dispatcher()?;
    let report = dispatcher
        .dispatch(request.kind, &request.title, &request.content, request.subscribers)
        .await;
    Ok(Json(NewsletterResponse::from(&report)))
}

pub async fn preflight() -> Response {
    with_cors(StatusCode::OK.into_response())
}

pub async fn method_not_allowed() -> Response {
    with_cors(AppError::MethodNotAllowed.into_response())
}
