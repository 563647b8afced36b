// ============================================================================
// Vault API - Document Handlers
// File: crates/vault-api/src/handlers/documents.rs
// Description: Upload, listing, lifecycle transitions and download
// ============================================================================

use axum::{
    body::Body,
    extract::{multipart::MultipartRejection, Multipart, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use vault_core::domain::{
    parse_period_date, AuditHistoryEntry, DocStatus, DocType, Document, DocumentDetail,
    DocumentFilter, DocumentSummary, FilePayload, NewDocument,
};
use vault_shared::types::Pagination;

use crate::error::ApiError;
use crate::extractors::{AppJson, AppPath, AppQuery, CurrentUser};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDocumentsQuery {
    pub fund_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub doc_type: Option<String>,
    pub status: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
    pub comment: Option<String>,
}

fn parse_doc_type(value: &str) -> Result<DocType, ApiError> {
    DocType::from_str(value)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown document type: {}", value)))
}

fn parse_status(value: &str) -> Result<DocStatus, ApiError> {
    DocStatus::from_str(value)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown document status: {}", value)))
}

fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("{} is required", field)))
}

/// POST /documents (multipart/form-data)
pub async fn create_document(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    let mut multipart = multipart?;
    let mut file: Option<FilePayload> = None;
    let mut title = None;
    let mut fund_id = None;
    let mut doc_type = None;
    let mut period_start = None;
    let mut period_end = None;
    let mut description = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await?;
                file = Some(FilePayload { filename, content_type, data });
            }
            "title" => title = Some(field.text().await?),
            "fundId" => fund_id = Some(field.text().await?),
            "type" => doc_type = Some(field.text().await?),
            "periodStart" => period_start = Some(field.text().await?),
            "periodEnd" => period_end = Some(field.text().await?),
            "description" => description = Some(field.text().await?),
            other => debug!("Ignoring multipart field {}", other),
        }
    }

    let file = file.ok_or_else(|| ApiError::BadRequest("file is required".into()))?;
    let fund_id = required(fund_id, "fundId")?;
    let fund_id = Uuid::parse_str(fund_id.trim())
        .map_err(|_| ApiError::BadRequest("fundId must be a UUID".into()))?;

    let input = NewDocument {
        title: required(title, "title")?,
        fund_id,
        doc_type: parse_doc_type(&required(doc_type, "type")?)?,
        period_start: parse_period_date("periodStart", &required(period_start, "periodStart")?)?,
        period_end: parse_period_date("periodEnd", &required(period_end, "periodEnd")?)?,
        description: description.filter(|d| !d.trim().is_empty()),
    };

    let document = state.documents.create(input, file, &user).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

/// GET /documents?fundId=&type=&status=&page=&perPage=
pub async fn list_documents(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppQuery(query): AppQuery<ListDocumentsQuery>,
) -> Result<Json<Vec<DocumentSummary>>, ApiError> {
    let pagination = (query.page.is_some() || query.per_page.is_some())
        .then(|| Pagination::new(query.page, query.per_page));

    let filter = DocumentFilter {
        fund_id: query.fund_id,
        doc_type: query.doc_type.as_deref().map(parse_doc_type).transpose()?,
        status: query.status.as_deref().map(parse_status).transpose()?,
        pagination,
    };

    Ok(Json(state.documents.find_all(filter, &user).await?))
}

/// GET /documents/{id}
pub async fn get_document(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<DocumentDetail>, ApiError> {
    Ok(Json(state.documents.find_one(&id, &user).await?))
}

/// GET /documents/{id}/history
pub async fn document_history(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Vec<AuditHistoryEntry>>, ApiError> {
    Ok(Json(state.documents.history(&id, &user).await?))
}

/// PATCH /documents/{id}/status
pub async fn update_document_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateStatusRequest>,
) -> Result<Json<Document>, ApiError> {
    let status = parse_status(&payload.status)?;
    let document = state
        .documents
        .update_status(&id, status, payload.comment, &user)
        .await?;
    Ok(Json(document))
}

/// DELETE /documents/{id}
pub async fn delete_document(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.documents.remove(&id, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /documents/{id}/download
pub async fn download_document(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Response, ApiError> {
    let (document, stream) = state.documents.download(&id, &user).await?;

    let content_type = document.mime_type.clone().unwrap_or_else(|| {
        mime_guess::from_path(&document.original_filename)
            .first_or_octet_stream()
            .to_string()
    });
    let content_type = HeaderValue::from_str(&content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    let disposition = format!(
        "attachment; filename=\"{}\"",
        ascii_filename(&document.original_filename)
    );
    let disposition = HeaderValue::from_str(&disposition)
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    let mut response = Body::from_stream(stream).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    if let Ok(len) = HeaderValue::from_str(&document.file_size.to_string()) {
        headers.insert(header::CONTENT_LENGTH, len);
    }
    Ok(response)
}

/// Quote-safe, printable ASCII only.
fn ascii_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim().is_empty() {
        "download".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames_are_made_header_safe() {
        assert_eq!(ascii_filename("q3 report.pdf"), "q3 report.pdf");
        assert_eq!(ascii_filename("r\"apport\u{e9}.pdf"), "r_apport_.pdf");
        assert_eq!(ascii_filename("\u{1f4c4}"), "_");
        assert_eq!(ascii_filename(""), "download");
    }
}
