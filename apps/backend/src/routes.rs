use std::path::Path as FsPath;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use stickerdb_storage::{StickerFilter, StickerLibrary, StickerView};
use tower_http::cors::CorsLayer;
use tracing::{debug, error};

use crate::page::render_index;

#[derive(Clone)]
pub struct AppState {
    library: Arc<StickerLibrary>,
    public_base_url: Arc<str>,
}

impl AppState {
    pub fn new(library: StickerLibrary, public_base_url: &str) -> Self {
        Self {
            library: Arc::new(library),
            public_base_url: Arc::from(public_base_url.trim_end_matches('/')),
        }
    }

    fn picture_url(&self, file: &str) -> String {
        format!("{}/static/stickers/{file}", self.public_base_url)
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/all", get(list_all))
        .route("/stickers/:filename", get(sticker_file))
        .route("/static/stickers/:filename", get(sticker_file))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

async fn index(State(state): State<AppState>) -> Result<Html<String>, StatusCode> {
    let views = state.library.views().await.map_err(|err| {
        error!("failed to list stickers: {err:#}");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Html(render_index(&views)))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    artist: Option<String>,
    program: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ApiItem {
    name: String,
    picture: String,
    event: String,
    artist: String,
}

#[derive(Debug, Serialize)]
pub struct ApiListing {
    items: Vec<ApiItem>,
}

async fn list_all(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ApiListing>, StatusCode> {
    let filter = StickerFilter {
        artist: params.artist,
        program: params.program,
    };
    let views = state.library.filtered_views(&filter).await.map_err(|err| {
        error!("failed to list stickers: {err:#}");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let items = views
        .into_iter()
        .map(|view: StickerView| ApiItem {
            picture: state.picture_url(&view.file),
            name: view.name,
            event: view.program,
            artist: view.artist,
        })
        .collect();

    Ok(Json(ApiListing { items }))
}

async fn sticker_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, StatusCode> {
    let Some(path) = state.library.sticker_path(&filename).await else {
        debug!(file = %filename, "sticker not found");
        return Err(StatusCode::NOT_FOUND);
    };

    read_sticker(&path).await
}

/// Raw bytes with a guessed content type. The file was already found, so a
/// read failure here is a server error.
async fn read_sticker(path: &FsPath) -> Result<Response, StatusCode> {
    let bytes = tokio::fs::read(path).await.map_err(|err| {
        error!(path = %path.display(), "failed to read sticker: {err}");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    let mime = mime_guess::from_path(path).first_or_octet_stream();

    Ok(([(header::CONTENT_TYPE, mime.to_string())], bytes).into_response())
}
