use chrono::Utc;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

use crate::{
    core::{serializer::SerializedForm, session::CancellationToken},
    errors::{FormError, FormResult},
    utils::{ensure_dir, write_atomic},
};

use super::{FormBackend, FormDocument};

const DOCUMENT_EXTENSION: &str = "json";
const FILES_SUFFIX: &str = "_files";

/// Filesystem-backed form store: one JSON document per template plus a
/// sibling directory holding that template's uploaded files.
#[derive(Debug, Clone)]
pub struct JsonFormStore {
    root: PathBuf,
}

impl JsonFormStore {
    pub fn new(root: PathBuf) -> FormResult<Self> {
        ensure_dir(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn document_path(&self, template: &str) -> PathBuf {
        self.root
            .join(format!("{}.{}", canonical_name(template), DOCUMENT_EXTENSION))
    }

    pub fn files_dir(&self, template: &str) -> PathBuf {
        self.root
            .join(format!("{}{}", canonical_name(template), FILES_SUFFIX))
    }

    pub fn attachment_path(&self, template: &str, reference: &str) -> PathBuf {
        self.files_dir(template).join(sanitize_file_name(reference))
    }

    fn write(
        &self,
        template: &str,
        form: &SerializedForm,
        cancel: &CancellationToken,
    ) -> FormResult<FormDocument> {
        cancel.check()?;
        if !form.data.is_array() {
            return Err(FormError::Payload("form data must be an array".into()));
        }
        if !form.attachments.is_empty() {
            ensure_dir(&self.files_dir(template))?;
        }
        for attachment in &form.attachments {
            cancel.check()?;
            let path = self.attachment_path(template, &attachment.reference);
            fs::write(&path, &attachment.bytes)?;
        }
        cancel.check()?;
        let document = FormDocument {
            template: template.to_string(),
            fields: form.data.clone(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&document)?;
        write_atomic(&self.document_path(template), &json)?;
        info!(
            template,
            attachments = form.attachments.len(),
            "form document written"
        );
        Ok(document)
    }
}

impl FormBackend for JsonFormStore {
    fn fetch_form(&self, template: &str) -> FormResult<Option<FormDocument>> {
        let path = self.document_path(template);
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&data)?))
    }

    fn create_form(
        &self,
        template: &str,
        form: &SerializedForm,
        cancel: &CancellationToken,
    ) -> FormResult<FormDocument> {
        if self.document_path(template).exists() {
            return Err(FormError::Backend(format!(
                "form for template `{}` already exists",
                template
            )));
        }
        self.write(template, form, cancel)
    }

    fn update_form(
        &self,
        template: &str,
        form: &SerializedForm,
        cancel: &CancellationToken,
    ) -> FormResult<FormDocument> {
        if !self.document_path(template).exists() {
            return Err(FormError::FormNotFound(template.to_string()));
        }
        self.write(template, form, cancel)
    }

    fn delete_form(&self, template: &str) -> FormResult<()> {
        let path = self.document_path(template);
        if !path.exists() {
            return Err(FormError::FormNotFound(template.to_string()));
        }
        fs::remove_file(&path)?;
        let files = self.files_dir(template);
        if files.exists() {
            fs::remove_dir_all(&files)?;
        }
        info!(template, "form document deleted");
        Ok(())
    }

    fn list_forms(&self) -> FormResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(DOCUMENT_EXTENSION) {
                continue;
            }
            let data = match fs::read_to_string(&path) {
                Ok(value) => value,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping unreadable form document");
                    continue;
                }
            };
            match serde_json::from_str::<FormDocument>(&data) {
                Ok(document) => names.push(document.template),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping malformed form document");
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

fn canonical_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '-' => c,
            _ => '_',
        })
        .collect();
    if sanitized.trim_matches('_').is_empty() {
        "form".into()
    } else {
        sanitized
    }
}

fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            _ => c,
        })
        .collect();
    match cleaned.trim_matches('.') {
        "" => "file".into(),
        _ => cleaned,
    }
}
