use std::net::SocketAddr;

use crate::error::{AppError, Result};
use crate::model::{ShortenRequest, ShortenResponse};
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use snip_core::ShortCode;
use snip_shortener::{ShortenerError, UrlStats};
use tracing::debug;

const SHORTEN_OPERATION: &str = "shorten";

pub async fn shorten_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    payload: std::result::Result<Json<ShortenRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ShortenResponse>)> {
    let identity = peer.ip().to_string();
    if !state.rate_limit.check(&identity, SHORTEN_OPERATION).await {
        return Err(AppError::RateLimited);
    }
    let Json(request) = payload?;

    let code = state.shortener.shorten(request.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(ShortenResponse {
            short_url: state.short_url(&code),
            short_code: code.to_string(),
        }),
    ))
}

pub async fn redirect_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Response> {
    let code = ShortCode::new(code)?;
    let url = state.redirector.resolve(&code).await?;

    debug!(code = %code, "redirecting");
    Ok((StatusCode::FOUND, [(header::LOCATION, url)]).into_response())
}

pub async fn stats_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<UrlStats>> {
    let code = ShortCode::new(code)?;
    Ok(Json(state.stats.stats(&code).await?))
}

pub async fn delete_url_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode> {
    let code = ShortCode::new(code)?;

    if state.shortener.delete(&code).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ShortenerError::NotFound(code.to_string()).into())
    }
}
