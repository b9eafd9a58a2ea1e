//! Pairing QR endpoint.

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{Html, IntoResponse, Response};
use serde::Deserialize;

use wa_relay_client::ConnectionState;
use wa_relay_store::HistoryStore;

use crate::error::ApiError;
use crate::qr;
use crate::state::GatewayState;

/// Query parameters for the QR endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct QrQuery {
    /// `html` (default), `png` or `download`. Unknown values fall back to `html`.
    #[serde(default)]
    pub format: Option<String>,
}

/// Requested representation of the pairing code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QrFormat {
    Html,
    Png,
    Download,
}

impl QrFormat {
    fn parse(format: Option<&str>) -> Self {
        match format {
            Some("png") => Self::Png,
            Some("download") => Self::Download,
            _ => Self::Html,
        }
    }
}

/// Serve the current pairing code.
///
/// Without a pending code a status page is returned whatever the format:
/// a "connected" page when the client is ready, a "disconnected" page
/// pointing at the restart endpoint when it lost its session, otherwise a
/// page that reloads every 3 seconds until a code shows up.
///
/// # Errors
///
/// Returns 500 if the code cannot be rendered.
pub async fn get_qr<S>(
    State(state): State<Arc<GatewayState<S>>>,
    query: Result<Query<QrQuery>, QueryRejection>,
) -> Result<Response, ApiError>
where
    S: HistoryStore + 'static,
{
    let Query(query) = query?;

    let Some(code) = state.manager.current_pairing_code() else {
        let page = match state.manager.state() {
            ConnectionState::Ready => qr::connected_page(),
            ConnectionState::Disconnected => qr::disconnected_page(),
            _ => qr::initializing_page(),
        };
        return Ok(Html(page).into_response());
    };

    let response = match QrFormat::parse(query.format.as_deref()) {
        QrFormat::Html => Html(qr::pairing_page(&qr::render_data_url(&code)?)).into_response(),
        QrFormat::Png => png_response(qr::render_png(&code)?, "inline"),
        QrFormat::Download => png_response(qr::render_png(&code)?, "attachment"),
    };

    Ok(response)
}

fn png_response(png: Vec<u8>, disposition: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("{disposition}; filename=\"{}\"", qr::FILE_NAME),
            ),
        ],
        png,
    )
        .into_response()
}
