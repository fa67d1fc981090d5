pub mod json_backend;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{serializer::SerializedForm, session::CancellationToken};
use crate::errors::FormResult;

/// Form definition as stored by the backend for one template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDocument {
    pub template: String,
    pub fields: Value,
    pub updated_at: DateTime<Utc>,
}

/// Backend collaborator serving form CRUD for templates.
///
/// Create and update receive the serialized JSON plus its attachments and
/// must check the cancellation token before committing anything.
pub trait FormBackend {
    fn fetch_form(&self, template: &str) -> FormResult<Option<FormDocument>>;
    fn create_form(
        &self,
        template: &str,
        form: &SerializedForm,
        cancel: &CancellationToken,
    ) -> FormResult<FormDocument>;
    fn update_form(
        &self,
        template: &str,
        form: &SerializedForm,
        cancel: &CancellationToken,
    ) -> FormResult<FormDocument>;
    fn delete_form(&self, template: &str) -> FormResult<()>;
    fn list_forms(&self) -> FormResult<Vec<String>>;
}

pub use json_backend::JsonFormStore;
