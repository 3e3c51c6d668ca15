//! Post routes.
//!
//! Parses multipart forms (and, for updates, JSON or urlencoded text fields)
//! into orchestrator input and maps results onto the
//! JSON envelopes clients expect: `{message, post}` / `{message, posts}` on
//! success and `{message, error}` on failure.

use axum::{
    Form, Json, Router,
    extract::{
        FromRequest, Multipart, Path, Request, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info};

use crate::AppState;
use quill_core::post::{CreatePostInput, Post, PostChanges, PostError, UpdatePostInput};
use quill_core::storage::ImageFile;
use quill_shared::{AppError, PostId};

const NO_FILE_MESSAGE: &str = "No file uploaded. Send a file using form-data.";

/// Creates the post routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/create-post", post(create_post).get(create_post_usage))
        .route("/posts", get(list_posts))
        .route("/update-post/{id}", put(update_post))
        .route("/delete-post/{id}", delete(delete_post))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Post as returned to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    /// Post ID.
    pub id: PostId,
    /// Title.
    pub title: String,
    /// Caption.
    pub caption: String,
    /// Image URL, real or placeholder.
    pub image_url: String,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            title: post.title,
            caption: post.caption,
            image_url: post.image_url,
        }
    }
}

/// Text fields and the first file part of a post form.
#[derive(Debug, Default)]
struct PostForm {
    title: Option<String>,
    caption: Option<String>,
    description: Option<String>,
    file: Option<ImageFile>,
}

impl PostForm {
    async fn read(mut multipart: Multipart) -> Result<Self, MultipartError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            if let Some(file_name) = field.file_name().map(str::to_owned) {
                let content_type = field.content_type().map(str::to_owned);
                let bytes = field.bytes().await?;
                // Only the first file part is used, whatever its field name.
                if form.file.is_none() {
                    let mut image = ImageFile::new(bytes).with_file_name(file_name);
                    if let Some(content_type) = content_type {
                        image = image.with_content_type(content_type);
                    }
                    form.file = Some(image);
                }
                continue;
            }

            let name = field.name().map(str::to_owned);
            let value = field.text().await?;
            match name.as_deref() {
                Some("title") => form.title = Some(value),
                Some("caption") => form.caption = Some(value),
                Some("description") => form.description = Some(value),
                _ => {}
            }
        }

        Ok(form)
    }

    fn changes(&mut self) -> PostChanges {
        PostChanges {
            title: self.title.take(),
            caption: self.caption.take().or_else(|| self.description.take()),
        }
    }
}

/// Text-only update body, sent as JSON or urlencoded form.
#[derive(Debug, Default, Deserialize)]
struct PostFields {
    title: Option<String>,
    caption: Option<String>,
    description: Option<String>,
}

impl From<PostFields> for PostForm {
    fn from(fields: PostFields) -> Self {
        Self {
            title: fields.title,
            caption: fields.caption,
            description: fields.description,
            file: None,
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

async fn read_form(
    multipart: Result<Multipart, MultipartRejection>,
    rejection_message: &'static str,
) -> Result<PostForm, Response> {
    let multipart = multipart.map_err(|rejection| {
        debug!(error = %rejection.body_text(), "Request is not multipart");
        (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "message": rejection_message,
                "error": rejection.body_text(),
            })),
        )
            .into_response()
    })?;

    PostForm::read(multipart).await.map_err(|e| {
        debug!(error = %e.body_text(), "Failed to read multipart form");
        (
            e.status(),
            Json(json!({
                "message": "Invalid multipart form data.",
                "error": e.body_text(),
            })),
        )
            .into_response()
    })
}

/// Read an update body by content type.
///
/// Multipart may carry a replacement image; JSON and urlencoded bodies carry
/// text fields only. Any other or missing body changes no field.
async fn read_update_form(request: Request, state: &AppState) -> Result<PostForm, Response> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, state).await;
        return read_form(multipart, "Invalid multipart form data.").await;
    }
    if content_type.starts_with("application/json") {
        return Json::<PostFields>::from_request(request, state)
            .await
            .map(|Json(fields)| fields.into())
            .map_err(|rejection| invalid_body(rejection.status(), &rejection.body_text()));
    }
    if content_type.starts_with("application/x-www-form-urlencoded") {
        return Form::<PostFields>::from_request(request, state)
            .await
            .map(|Form(fields)| fields.into())
            .map_err(|rejection| invalid_body(rejection.status(), &rejection.body_text()));
    }

    Ok(PostForm::default())
}

fn invalid_body(status: StatusCode, detail: &str) -> Response {
    debug!(error = %detail, "Failed to read request body");
    (
        status,
        Json(json!({
            "message": "Invalid request body.",
            "error": detail,
        })),
    )
        .into_response()
}

/// Malformed ids cannot name an existing post.
fn parse_post_id(raw: &str) -> Result<PostId, Response> {
    raw.parse()
        .map_err(|_| not_found_response(&AppError::NotFound(format!("post {raw}"))))
}

fn not_found_response(app: &AppError) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "message": "Post not found.",
            "error": app.detail(),
        })),
    )
        .into_response()
}

fn error_response(failure_message: &'static str, err: PostError) -> Response {
    let app = AppError::from(err);
    let status =
        StatusCode::from_u16(app.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if status.is_server_error() {
        error!(error = %app, error_code = app.error_code(), "{failure_message}");
    } else {
        debug!(error = %app, error_code = app.error_code(), "Request rejected");
    }

    match &app {
        AppError::NotFound(_) => not_found_response(&app),
        AppError::Validation(msg) => (
            status,
            Json(json!({
                "message": msg,
                "error": app.error_code(),
            })),
        )
            .into_response(),
        AppError::Conflict(_) => (
            status,
            Json(json!({
                "message": "Post was modified concurrently. Retry the request.",
                "error": app.detail(),
            })),
        )
            .into_response(),
        _ => (
            status,
            Json(json!({
                "message": failure_message,
                "error": app.detail(),
            })),
        )
            .into_response(),
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/create-post`
/// Usage hint for clients that open the endpoint in a browser.
async fn create_post_usage() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({
            "message": "Method Not Allowed. Use POST method to create a post.",
            "usage": {
                "method": "POST",
                "url": "/create-post",
                "body": "form-data with keys: 'file' (File), 'title' (Text), 'caption' (Text)",
            },
        })),
    )
}

/// POST `/create-post`
/// Create a post from a multipart form with an image.
async fn create_post(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let mut form = match read_form(multipart, NO_FILE_MESSAGE).await {
        Ok(form) => form,
        Err(response) => return response,
    };

    let Some(image) = form.file.take() else {
        return error_response("Failed to create post", PostError::validation(NO_FILE_MESSAGE));
    };
    let changes = form.changes();

    let input = CreatePostInput {
        title: changes.title.unwrap_or_default(),
        caption: changes.caption.unwrap_or_default(),
        image,
    };

    match state.posts.create(input).await {
        Ok(post) => {
            info!(post_id = %post.id, "Post created via API");
            (
                StatusCode::CREATED,
                Json(json!({
                    "message": "Post created successfully",
                    "post": PostResponse::from(post),
                })),
            )
                .into_response()
        }
        Err(e) => error_response("Failed to create post", e),
    }
}

/// GET `/posts`
/// List all posts, newest first.
async fn list_posts(State(state): State<AppState>) -> Response {
    match state.posts.list().await {
        Ok(posts) => {
            let posts: Vec<PostResponse> = posts.into_iter().map(PostResponse::from).collect();
            (
                StatusCode::OK,
                Json(json!({
                    "message": "Posts retrieved successfully",
                    "posts": posts,
                })),
            )
                .into_response()
        }
        Err(e) => error_response("Failed to retrieve posts", e),
    }
}

/// PUT `/update-post/{id}`
/// Update title/caption and optionally replace the image.
async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: Request,
) -> Response {
    let id = match parse_post_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    // An unknown id is a 404 whatever the body looks like.
    if let Err(e) = state.posts.get(id).await {
        return error_response("Failed to update post", e);
    }
    let mut form = match read_update_form(request, &state).await {
        Ok(form) => form,
        Err(response) => return response,
    };

    let input = UpdatePostInput {
        changes: form.changes(),
        image: form.file.take(),
    };

    match state.posts.update(id, input).await {
        Ok(post) => (
            StatusCode::OK,
            Json(json!({
                "message": "Post updated successfully",
                "post": PostResponse::from(post),
            })),
        )
            .into_response(),
        Err(e) => error_response("Failed to update post", e),
    }
}

/// DELETE `/delete-post/{id}`
/// Delete a post and its remote image.
async fn delete_post(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = match parse_post_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.posts.delete(id).await {
        Ok(id) => (
            StatusCode::OK,
            Json(json!({
                "message": "Post deleted successfully",
                "post": { "id": id },
            })),
        )
            .into_response(),
        Err(e) => error_response("Failed to delete post", e),
    }
}
