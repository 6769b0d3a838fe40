//! HTTP handlers under `/api/reports`

use crate::error::{ApiError, Result};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use report::{ExportFormat, ExportRequest, ExportResult, FieldDescriptor, ReportService};
use serde::Serialize;

/// Envelope of every JSON response
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadData {
    pub file_name: String,
    pub message: String,
}

/// Run blocking service work off the async runtime
async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> report::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(format!("worker task failed: {e}")))?
        .map_err(ApiError::from)
}

/// POST /api/reports/upload (multipart field `file`)
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<UploadData>>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("file part has no file name".to_string()))?;
        let content = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;

        tracing::info!(file = %file_name, bytes = content.len(), "Upload request");
        let service = state.service.clone();
        let stored = blocking(move || service.upload(&file_name, &content)).await?;

        return Ok(Json(ApiResponse::ok(
            "Template uploaded successfully",
            UploadData {
                file_name: stored,
                message: "File uploaded successfully".to_string(),
            },
        )));
    }

    Err(ApiError::BadRequest("missing multipart field 'file'".to_string()))
}

/// GET /api/reports/list
pub async fn list(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<String>>>> {
    let service = state.service.clone();
    let names = blocking(move || service.list()).await?;
    Ok(Json(ApiResponse::ok("Templates retrieved successfully", names)))
}

/// DELETE /api/reports/delete/:name
pub async fn delete(State(state): State<AppState>, Path(name): Path<String>) -> Result<Response> {
    let service = state.service.clone();
    let target = name.clone();
    if blocking(move || service.delete(&target)).await? {
        Ok(Json(ApiResponse::message("Template deleted successfully")).into_response())
    } else {
        Ok((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::failure(format!("Template '{name}' not found"))),
        )
            .into_response())
    }
}

/// GET /api/reports/fields/:name
pub async fn fields(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<Vec<FieldDescriptor>>>> {
    let service = state.service.clone();
    let fields = blocking(move || service.fields(&name)).await?;
    Ok(Json(ApiResponse::ok("Fields retrieved successfully", fields)))
}

/// POST /api/reports/export-pdf-with-data
pub async fn export_pdf(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ExportRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(mut request) = payload?;
    request.format = ExportFormat::Paged;
    export_with(state.service.clone(), request).await
}

/// POST /api/reports/export-html-with-data
pub async fn export_html(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ExportRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(mut request) = payload?;
    request.format = ExportFormat::Markup;
    export_with(state.service.clone(), request).await
}

/// POST /api/reports/export
pub async fn export(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ExportRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = payload?;
    export_with(state.service.clone(), request).await
}

async fn export_with(service: ReportService, request: ExportRequest) -> Result<Response> {
    tracing::info!(
        template = %request.template_name,
        format = %request.format,
        records = request.data_records.len(),
        "Export request"
    );
    let result = blocking(move || service.export(&request)).await?;

    let response = match result {
        ExportResult::Pdf(bytes) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, ExportFormat::Paged.content_type()),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"report.pdf\"",
                ),
            ],
            bytes,
        )
            .into_response(),
        ExportResult::Html(html) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, ExportFormat::Markup.content_type())],
            html,
        )
            .into_response(),
    };
    Ok(response)
}

/// GET /health and /api/reports/health
pub async fn health() -> Json<ApiResponse<()>> {
    Json(ApiResponse::message("Service is running"))
}
