use std::path::Path;

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tempfile::NamedTempFile;
use tokio_postgres::types::Type;
use tokio_postgres::Row;
use tracing::{info, warn};

use crate::connection::DescriptorOverrides;
use crate::error::ImportError;
use crate::import::{table_name_from_filename, FailedAttempt, ImportOutcome, ImportRequest};

use super::AppState;

/// Query parameters accepted by `POST /upload`.
#[derive(Debug, Default, Deserialize)]
pub struct UploadParams {
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub table: Option<String>,
    pub schema: Option<String>,
}

/// Body of a successful upload.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadResponse {
    pub success: bool,
    pub table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub format: String,
    pub rows: usize,
    pub columns: Vec<String>,
}

/// Error response: `{"success": false, "error": {"type": ..., "message": ...}}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error_type: &'static str,
    pub message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error_type: "BadRequest",
            message: message.into(),
        }
    }

    fn no_parser_matched(attempts: &[FailedAttempt]) -> Self {
        let reasons = attempts
            .iter()
            .map(|a| format!("{}: {}", a.format, a.error))
            .collect::<Vec<_>>()
            .join("; ");
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            error_type: "NoParserMatched",
            message: format!("no parser could load the file ({reasons})"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "success": false,
            "error": {
                "type": self.error_type,
                "message": self.message,
            }
        });
        (self.status, Json(body)).into_response()
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        let (status, error_type) = match &err {
            ImportError::InvalidIdentifier { .. } => (StatusCode::BAD_REQUEST, "InvalidIdentifier"),
            ImportError::Connection { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "ConnectionError"),
            ImportError::Write { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "WriteError"),
        };
        Self {
            status,
            error_type,
            message: err.to_string(),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self {
            status: err.status(),
            error_type: "BadRequest",
            message: err.body_text(),
        }
    }
}

pub(super) async fn root() -> Json<serde_json::Value> {
    Json(json!({ "hello": "world" }))
}

/// An upload persisted to a temp file. The file is removed when this is dropped.
struct SavedUpload {
    filename: String,
    file: NamedTempFile,
}

async fn save_upload(multipart: &mut Multipart) -> Result<SavedUpload, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;

        // Keep the extension so format resolution sees it.
        let suffix = Path::new(&filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default();
        let file = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(&suffix)
            .tempfile()
            .map_err(internal)?;
        tokio::fs::write(file.path(), &bytes).await.map_err(internal)?;

        info!(%filename, bytes = bytes.len(), path = %file.path().display(), "saved upload");
        return Ok(SavedUpload { filename, file });
    }
    Err(ApiError::bad_request("missing multipart field 'file'"))
}

fn internal(err: std::io::Error) -> ApiError {
    ApiError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        error_type: "Internal",
        message: format!("failed to store upload: {err}"),
    }
}

pub(super) async fn upload(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let saved = save_upload(&mut multipart).await?;

    let descriptor = state.base.with_overrides(&DescriptorOverrides {
        database: params.database,
        username: params.user,
        password: params.password,
    });
    let table = match params.table {
        Some(t) if !t.is_empty() => t,
        _ => table_name_from_filename(&saved.filename),
    };
    let mut request = ImportRequest::new(saved.file.path(), descriptor).with_table(table);
    if let Some(schema) = params.schema {
        request = request.with_schema(schema);
    }

    match state.importer.import_file(&request).await? {
        ImportOutcome::Written {
            table,
            schema,
            format,
            rows,
            columns,
        } => Ok(Json(UploadResponse {
            success: true,
            table,
            schema,
            format: format.to_string(),
            rows,
            columns,
        })),
        ImportOutcome::NoParserMatched { attempts } => {
            warn!(filename = %saved.filename, "upload not imported");
            Err(ApiError::no_parser_matched(&attempts))
        }
    }
}

pub(super) async fn pool_check(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let client = state
        .pool
        .get()
        .await
        .map_err(|e| ImportError::connection(format!("failed to acquire pooled connection: {e}")))?;
    let rows = client
        .query(r#"SELECT 2 AS "foo""#, &[])
        .await
        .map_err(|e| ImportError::connection(e.to_string()))?;

    let data: Vec<serde_json::Value> = rows
        .iter()
        .map(|row| trim_trailing_whitespace(row_to_json(row)))
        .collect();
    Ok(Json(json!({ "status": 200, "data": data })))
}

fn row_to_json(row: &Row) -> serde_json::Value {
    let mut out = serde_json::Map::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value = match *column.type_() {
            Type::BOOL => row.try_get::<_, Option<bool>>(idx).ok().flatten().map(Into::into),
            Type::INT2 => row.try_get::<_, Option<i16>>(idx).ok().flatten().map(Into::into),
            Type::INT4 => row.try_get::<_, Option<i32>>(idx).ok().flatten().map(Into::into),
            Type::INT8 => row.try_get::<_, Option<i64>>(idx).ok().flatten().map(Into::into),
            Type::FLOAT4 => row.try_get::<_, Option<f32>>(idx).ok().flatten().map(Into::into),
            Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx).ok().flatten().map(Into::into),
            Type::JSON | Type::JSONB => row.try_get::<_, Option<serde_json::Value>>(idx).ok().flatten(),
            _ => row.try_get::<_, Option<String>>(idx).ok().flatten().map(Into::into),
        };
        out.insert(column.name().to_string(), value.unwrap_or(serde_json::Value::Null));
    }
    serde_json::Value::Object(out)
}

/// Strip trailing whitespace from the top-level string values of a row object.
///
/// Fixed-width `CHAR(n)` columns come back space padded.
pub fn trim_trailing_whitespace(row: serde_json::Value) -> serde_json::Value {
    match row {
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.into_iter()
                .map(|(k, v)| match v {
                    serde_json::Value::String(s) => (k, serde_json::Value::String(s.trim_end().to_string())),
                    other => (k, other),
                })
                .collect(),
        ),
        other => other,
    }
}
