//! `multipart/form-data` encoding of a serialized form.

use uuid::Uuid;

use crate::core::serializer::SerializedForm;
use crate::errors::FormResult;

const CRLF: &str = "\r\n";
const DEFAULT_FILE_TYPE: &str = "application/octet-stream";

/// Part names expected by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadSettings {
    pub data_field: String,
    pub attachment_field: String,
}

impl Default for PayloadSettings {
    fn default() -> Self {
        Self {
            data_field: "data".into(),
            attachment_field: "files".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartBody {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn encode(form: &SerializedForm, settings: &PayloadSettings) -> FormResult<Self> {
        let boundary = format!("formdesk-{}", Uuid::new_v4().simple());
        Self::encode_with_boundary(form, settings, boundary)
    }

    /// Encodes with a caller-chosen boundary; the boundary must not occur in
    /// any part.
    pub fn encode_with_boundary(
        form: &SerializedForm,
        settings: &PayloadSettings,
        boundary: impl Into<String>,
    ) -> FormResult<Self> {
        let boundary = boundary.into();
        let mut body = Vec::new();

        push_str(&mut body, &format!("--{}{}", boundary, CRLF));
        push_str(
            &mut body,
            &format!(
                "Content-Disposition: form-data; name=\"{}\"{}",
                escape_quoted(&settings.data_field),
                CRLF
            ),
        );
        push_str(&mut body, &format!("Content-Type: application/json{}{}", CRLF, CRLF));
        push_str(&mut body, &form.data_json()?);
        push_str(&mut body, CRLF);

        for attachment in &form.attachments {
            push_str(&mut body, &format!("--{}{}", boundary, CRLF));
            push_str(
                &mut body,
                &format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"{}",
                    escape_quoted(&settings.attachment_field),
                    escape_quoted(&attachment.reference),
                    CRLF
                ),
            );
            let content_type = attachment
                .content_type
                .as_deref()
                .unwrap_or(DEFAULT_FILE_TYPE);
            push_str(&mut body, &format!("Content-Type: {}{}{}", content_type, CRLF, CRLF));
            body.extend_from_slice(&attachment.bytes);
            push_str(&mut body, CRLF);
        }
        push_str(&mut body, &format!("--{}--{}", boundary, CRLF));

        Ok(Self { boundary, body })
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value for the request's `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.body
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.body
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

fn push_str(body: &mut Vec<u8>, text: &str) {
    body.extend_from_slice(text.as_bytes());
}

fn escape_quoted(value: &str) -> String {
    value
        .chars()
        .filter(|c| *c != '\r' && *c != '\n')
        .map(|c| if c == '"' { "%22".to_string() } else { c.to_string() })
        .collect()
}
