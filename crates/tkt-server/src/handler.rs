use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use tkt_records::DownloadedFile;
use tkt_types::{
    Attachment, AttachmentId, Comment, FileKey, FileUpload, NewComment, NewTicket, Priority,
    Status, Ticket, TicketId, Timestamp,
};

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

const DOWNLOAD_CACHE_CONTROL: &str = "public, max-age=31536000";
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// A ticket id sent either as a JSON number or as a string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TicketRef {
    Number(u64),
    Text(String),
}

impl TicketRef {
    fn resolve(self) -> ServerResult<TicketId> {
        match self {
            Self::Number(n) => Ok(TicketId(n)),
            Self::Text(s) => parse_ticket_id(&s),
        }
    }
}

fn parse_ticket_id(raw: &str) -> ServerResult<TicketId> {
    raw.trim()
        .parse()
        .map_err(|_| ServerError::bad_request(format!("invalid ticketId: {raw}")))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ServerResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ServerError::bad_request(rejection.body_text()))
}

#[derive(Debug, Deserialize)]
pub struct TicketQuery {
    #[serde(rename = "ticketId")]
    pub ticket_id: Option<String>,
}

impl TicketQuery {
    fn required(self) -> ServerResult<TicketId> {
        match self.ticket_id {
            Some(raw) if !raw.trim().is_empty() => parse_ticket_id(&raw),
            _ => Err(ServerError::bad_request("missing ticketId parameter")),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateTicket {
    pub id: TicketId,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub priority: Option<Priority>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteTicket {
    pub id: TicketId,
}

#[derive(Debug, Deserialize)]
pub struct CreateComment {
    #[serde(rename = "ticketId", default)]
    pub ticket_id: Option<TicketRef>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteAttachment {
    #[serde(default)]
    pub id: Option<AttachmentId>,
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    #[serde(rename = "fileKey")]
    pub file_key: Option<String>,
}

/// Health check handler.
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// Tickets
// ---------------------------------------------------------------------------

pub async fn list_tickets(State(state): State<AppState>) -> Json<Vec<Ticket>> {
    Json(state.desk.tickets().list().await)
}

pub async fn create_ticket(
    State(state): State<AppState>,
    payload: Result<Json<NewTicket>, JsonRejection>,
) -> ServerResult<(StatusCode, Json<Ticket>)> {
    let ticket = state.desk.tickets().create(body(payload)?).await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

/// Apply a status and/or priority change. At least one must be present.
pub async fn update_ticket(
    State(state): State<AppState>,
    payload: Result<Json<UpdateTicket>, JsonRejection>,
) -> ServerResult<Json<Ticket>> {
    let update = body(payload)?;
    if update.status.is_none() && update.priority.is_none() {
        return Err(ServerError::bad_request("missing status or priority"));
    }
    let ticket = state
        .desk
        .tickets()
        .update_fields(update.id, update.status, update.priority)
        .await?;
    Ok(Json(ticket))
}

pub async fn delete_ticket(
    State(state): State<AppState>,
    payload: Result<Json<DeleteTicket>, JsonRejection>,
) -> ServerResult<Json<Ticket>> {
    let DeleteTicket { id } = body(payload)?;
    Ok(Json(state.desk.delete_ticket(id).await?))
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

pub async fn list_comments(
    State(state): State<AppState>,
    Query(query): Query<TicketQuery>,
) -> ServerResult<Json<Vec<Comment>>> {
    let ticket = query.required()?;
    Ok(Json(state.desk.comments().list(ticket).await))
}

pub async fn create_comment(
    State(state): State<AppState>,
    payload: Result<Json<CreateComment>, JsonRejection>,
) -> ServerResult<(StatusCode, Json<Comment>)> {
    let request = body(payload)?;
    let ticket = request
        .ticket_id
        .ok_or_else(|| ServerError::bad_request("missing ticketId"))?
        .resolve()?;
    let comment = state
        .desk
        .comments()
        .create(
            ticket,
            NewComment {
                content: request.content,
                created_at: request.created_at,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

// ---------------------------------------------------------------------------
// Attachments
// ---------------------------------------------------------------------------

pub async fn list_attachments(
    State(state): State<AppState>,
    Query(query): Query<TicketQuery>,
) -> ServerResult<Json<Vec<Attachment>>> {
    let ticket = query.required()?;
    Ok(Json(state.desk.attachments().list(ticket).await))
}

/// Multipart upload with a `file` part and a `ticketId` text part.
pub async fn upload_attachment(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ServerResult<(StatusCode, Json<Attachment>)> {
    let mut file: Option<FileUpload> = None;
    let mut ticket: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::bad_request(e.body_text()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or(FALLBACK_CONTENT_TYPE)
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::bad_request(e.body_text()))?;
                file = Some(FileUpload::new(filename, content_type, data));
            }
            Some("ticketId") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ServerError::bad_request(e.body_text()))?;
                ticket = Some(text);
            }
            _ => {}
        }
    }

    let (Some(file), Some(ticket)) = (file, ticket.filter(|t| !t.trim().is_empty())) else {
        return Err(ServerError::bad_request("missing file or ticketId"));
    };
    let ticket = parse_ticket_id(&ticket)?;
    let attachment = state.desk.attachments().upload(ticket, file).await?;
    Ok((StatusCode::CREATED, Json(attachment)))
}

pub async fn delete_attachment(
    State(state): State<AppState>,
    payload: Result<Json<DeleteAttachment>, JsonRejection>,
) -> ServerResult<Json<Value>> {
    let id = body(payload)?
        .id
        .filter(|id| !id.as_str().is_empty())
        .ok_or_else(|| ServerError::bad_request("missing attachment id"))?;
    state.desk.attachments().delete(&id).await?;
    Ok(Json(json!({ "message": "attachment deleted" })))
}

// ---------------------------------------------------------------------------
// Download
// ---------------------------------------------------------------------------

pub async fn download(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> ServerResult<Response> {
    let key = query
        .file_key
        .filter(|k| !k.is_empty())
        .map(FileKey::new)
        .ok_or_else(|| ServerError::bad_request("missing fileKey parameter"))?;
    let file = state.desk.attachments().download(&key).await?;
    info!(file_key = %key, size = file.data.len(), "file served");
    Ok(file_response(file))
}

fn content_disposition(filename: &str) -> HeaderValue {
    let escaped = filename.replace('\\', "\\\\").replace('"', "\\\"");
    HeaderValue::from_bytes(format!("attachment; filename=\"{escaped}\"").as_bytes())
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

fn file_response(file: DownloadedFile) -> Response {
    let content_type = HeaderValue::from_str(&file.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static(FALLBACK_CONTENT_TYPE));
    let headers = [
        (header::CONTENT_TYPE, content_type),
        (header::CONTENT_DISPOSITION, content_disposition(&file.filename)),
        (header::CACHE_CONTROL, HeaderValue::from_static(DOWNLOAD_CACHE_CONTROL)),
    ];
    (headers, file.data).into_response()
}
