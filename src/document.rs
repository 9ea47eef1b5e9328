//! Documents (receipts, invoices) attached to transactions.
//!
//! Files are uploaded through `POST /api/upload`, which stores the bytes
//! under the document directory keyed by content hash and returns the
//! metadata the client later attaches to a transaction. The stored files are
//! served read-only under `/documents`.

use std::path::{Path as FilePath, PathBuf};

use axum::{
    Json,
    extract::{FromRef, Multipart, State},
    response::{IntoResponse, Response},
};
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    AppState, Error,
    database_id::{DocumentId, TransactionId},
};

/// A file attached to a transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// The ID of the document.
    pub id: DocumentId,
    /// The path the file is served under, e.g. `/documents/abc123.pdf`.
    pub url: String,
    /// The original name of the uploaded file.
    pub file_name: String,
    /// The MIME type of the file.
    pub mime_type: String,
    /// The transaction the document is attached to.
    pub transaction_id: TransactionId,
}

/// The metadata needed to attach a [Document] to a transaction.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDocument {
    /// The path the file is served under.
    pub url: String,
    /// The original name of the uploaded file.
    pub file_name: String,
    /// The MIME type of the file.
    pub mime_type: String,
}

/// Create the document table.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_document_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS document (
                id INTEGER PRIMARY KEY,
                url TEXT NOT NULL,
                file_name TEXT NOT NULL,
                mime_type TEXT NOT NULL,
                transaction_id INTEGER NOT NULL,
                FOREIGN KEY(transaction_id) REFERENCES \"transaction\"(id) ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

/// Retrieve the documents attached to the transaction `transaction_id`.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn get_documents_for_transaction(
    transaction_id: TransactionId,
    connection: &Connection,
) -> Result<Vec<Document>, Error> {
    connection
        .prepare(
            "SELECT id, url, file_name, mime_type, transaction_id
             FROM document WHERE transaction_id = :transaction_id
             ORDER BY id",
        )?
        .query_map(&[(":transaction_id", &transaction_id)], map_document_row)?
        .map(|maybe_document| maybe_document.map_err(Error::SqlError))
        .collect()
}

/// Replace the document set of the transaction `transaction_id` with
/// `documents`: all existing rows are deleted and the supplied list is
/// inserted. An empty list clears the set.
///
/// Must be called inside the SQL transaction that performs the rest of the
/// transaction update.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn replace_documents(
    transaction_id: TransactionId,
    documents: &[NewDocument],
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "DELETE FROM document WHERE transaction_id = :transaction_id",
        &[(":transaction_id", &transaction_id)],
    )?;

    for document in documents {
        connection.execute(
            "INSERT INTO document (url, file_name, mime_type, transaction_id)
             VALUES (?1, ?2, ?3, ?4)",
            (
                &document.url,
                &document.file_name,
                &document.mime_type,
                transaction_id,
            ),
        )?;
    }

    Ok(())
}

/// Map a database row to a [Document].
pub fn map_document_row(row: &Row) -> Result<Document, rusqlite::Error> {
    Ok(Document {
        id: row.get(0)?,
        url: row.get(1)?,
        file_name: row.get(2)?,
        mime_type: row.get(3)?,
        transaction_id: row.get(4)?,
    })
}

/// The state needed to store uploaded documents.
#[derive(Debug, Clone)]
pub struct UploadState {
    /// The directory uploaded files are written to.
    document_dir: PathBuf,
}

impl FromRef<AppState> for UploadState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            document_dir: state.document_dir.clone(),
        }
    }
}

/// The key an uploaded file is stored under: the MD5 digest of its contents
/// plus the original file extension, so re-uploading the same file is a
/// no-op.
fn storage_key(file_name: &str, data: &[u8]) -> String {
    let digest = md5::compute(data);

    match FilePath::new(file_name).extension().and_then(|ext| ext.to_str()) {
        Some(extension) => format!("{digest:x}.{extension}"),
        None => format!("{digest:x}"),
    }
}

/// A route handler for uploading a document.
///
/// Accepts a multipart form with a file part, writes the bytes to the
/// document directory, and returns the metadata (`url`, `fileName`,
/// `mimeType`) the client attaches to a transaction via the update endpoint.
pub async fn upload_endpoint(
    State(state): State<UploadState>,
    mut multipart: Multipart,
) -> Result<Response, Error> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| Error::MultipartError(error.to_string()))?
    {
        let Some(file_name) = field.file_name().map(String::from) else {
            continue;
        };
        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|error| Error::MultipartError(error.to_string()))?;

        let key = storage_key(&file_name, &data);

        tokio::fs::create_dir_all(&state.document_dir)
            .await
            .map_err(|error| Error::DocumentStoreError(error.to_string()))?;
        tokio::fs::write(state.document_dir.join(&key), &data)
            .await
            .map_err(|error| Error::DocumentStoreError(error.to_string()))?;

        tracing::info!("stored document {key} ({mime_type}, {} bytes)", data.len());

        return Ok(Json(json!({
            "url": format!("{}/{key}", crate::endpoints::DOCUMENTS),
            "fileName": file_name,
            "mimeType": mime_type,
        }))
        .into_response());
    }

    Err(Error::MissingFile)
}
