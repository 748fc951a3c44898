use axum::http::HeaderMap;
use bytes::Bytes;

use super::IngestError;

/// Content types browsers and spreadsheet tools send for `.csv` files.
pub const CSV_CONTENT_TYPES: [&str; 3] = [
    "text/csv",
    "application/vnd.ms-excel",
    "application/octet-stream",
];

const FILE_FIELD: &str = "file";

#[derive(Debug)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Pull the `file` part out of a multipart body.
pub async fn read_file_part(headers: &HeaderMap, body: Bytes) -> Result<UploadedFile, IngestError> {
    let boundary = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| multer::parse_boundary(ct).ok())
        .ok_or(IngestError::NotMultipart)?;

    let stream = futures_util::stream::once(async { Ok::<_, std::io::Error>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| IngestError::Multipart(e.to_string()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(|m| m.essence_str().to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| IngestError::Multipart(e.to_string()))?;

        return Ok(UploadedFile {
            file_name,
            content_type,
            data,
        });
    }

    Err(IngestError::MissingFile)
}

pub fn ensure_csv_content_type(content_type: Option<&str>) -> Result<(), IngestError> {
    let accepted = content_type.is_some_and(|ct| {
        let essence = ct.split(';').next().unwrap_or("").trim();
        CSV_CONTENT_TYPES
            .iter()
            .any(|allowed| essence.eq_ignore_ascii_case(allowed))
    });

    if accepted {
        Ok(())
    } else {
        Err(IngestError::NotCsv)
    }
}

/// UTF-8 text with an optional leading byte-order mark removed.
pub fn decode_text(data: &[u8]) -> Result<&str, IngestError> {
    let text = std::str::from_utf8(data).map_err(|_| IngestError::InvalidEncoding)?;
    Ok(text.strip_prefix('\u{feff}').unwrap_or(text))
}
