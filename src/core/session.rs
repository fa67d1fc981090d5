//! One form-edit session: the builder snapshot, pending file reads and the
//! submission lifecycle against a [`FormBackend`].

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::core::{
    builder::{Created, FormBuilder, FormCommand},
    file_reads::{FileReadTracker, FileTarget, ReadOutcome, ReadTicket},
    preview::{render_preview, PreviewDocument},
    serializer::{hydrate, serialize, SerializedForm},
    validation::{validate, ValidationReport},
};
use crate::domain::FileValue;
use crate::errors::{FormError, FormResult};
use crate::storage::{FormBackend, FormDocument};

/// Shared cancellation flag handed to backends for the duration of a call.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Returns `FormError::Cancelled` once the token has been cancelled.
    pub fn check(&self) -> FormResult<()> {
        if self.is_cancelled() {
            Err(FormError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Submitting { attempt: u32 },
    Succeeded { at: DateTime<Utc> },
    Failed { attempt: u32, message: String },
}

#[derive(Debug, Clone)]
pub struct SubmissionTracker {
    state: SubmissionState,
    attempts: u32,
}

impl Default for SubmissionTracker {
    fn default() -> Self {
        Self {
            state: SubmissionState::Idle,
            attempts: 0,
        }
    }
}

impl SubmissionTracker {
    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self.state, SubmissionState::Submitting { .. })
    }

    /// Enters `Submitting`; a second call before the first settles fails.
    pub fn begin(&mut self) -> FormResult<u32> {
        if self.is_in_flight() {
            return Err(FormError::SubmitInFlight);
        }
        self.attempts += 1;
        self.state = SubmissionState::Submitting {
            attempt: self.attempts,
        };
        Ok(self.attempts)
    }

    pub fn succeed(&mut self) {
        self.state = SubmissionState::Succeeded { at: Utc::now() };
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.state = SubmissionState::Failed {
            attempt: self.attempts,
            message: message.into(),
        };
    }

    /// Returns to `Idle` without counting the attempt as a failure.
    pub fn abandon(&mut self) {
        self.state = SubmissionState::Idle;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Create,
    Edit,
}

#[derive(Debug)]
pub struct EditSession {
    template: String,
    mode: SessionMode,
    builder: FormBuilder,
    reads: FileReadTracker,
    submission: SubmissionTracker,
    cancel: CancellationToken,
    report: Option<ValidationReport>,
    migrations: Vec<String>,
    dirty: bool,
}

impl EditSession {
    /// Starts an empty session that will create the form on submit.
    pub fn create(template: impl Into<String>) -> Self {
        let template = template.into();
        info!(template = %template, "opened create session");
        Self::with_builder(template, SessionMode::Create, FormBuilder::new(), Vec::new())
    }

    /// Starts a session hydrated from the stored form for `template`.
    pub fn open(backend: &dyn FormBackend, template: &str) -> FormResult<Self> {
        let document = backend
            .fetch_form(template)?
            .ok_or_else(|| FormError::FormNotFound(template.to_string()))?;
        let hydrated = hydrate(&document.fields)?;
        info!(
            template,
            fields = hydrated.fields.len(),
            migrations = hydrated.migrations.len(),
            "opened edit session"
        );
        Ok(Self::with_builder(
            template.to_string(),
            SessionMode::Edit,
            FormBuilder::from_fields(hydrated.fields),
            hydrated.migrations,
        ))
    }

    fn with_builder(
        template: String,
        mode: SessionMode,
        builder: FormBuilder,
        migrations: Vec<String>,
    ) -> Self {
        Self {
            template,
            mode,
            builder,
            reads: FileReadTracker::new(),
            submission: SubmissionTracker::default(),
            cancel: CancellationToken::new(),
            report: None,
            migrations,
            dirty: mode == SessionMode::Create,
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn builder(&self) -> &FormBuilder {
        &self.builder
    }

    pub fn migrations(&self) -> &[String] {
        &self.migrations
    }

    pub fn state(&self) -> &SubmissionState {
        self.submission.state()
    }

    pub fn last_report(&self) -> Option<&ValidationReport> {
        self.report.as_ref()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// True while the tree holds changes the backend has not accepted yet.
    /// A create session starts dirty since nothing is stored for it.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Applies a typed command; pending reads aimed at an overwritten slot
    /// are invalidated.
    pub fn apply(&mut self, command: FormCommand) -> FormResult<Created> {
        self.cancel.check()?;
        let overwritten = match &command {
            FormCommand::SetAttachment { field, .. } => Some(FileTarget::FieldAttachment(*field)),
            FormCommand::SetPairValue { entry, .. } => Some(FileTarget::PairValue(*entry)),
            _ => None,
        };
        let (next, created) = self.builder.apply_with_outcome(command)?;
        if let Some(target) = overwritten {
            self.reads.invalidate(target);
        }
        self.builder = next;
        self.dirty = true;
        Ok(created)
    }

    /// Runs index-addressed service calls against a working copy and keeps
    /// the result only when `edit` succeeds.
    pub fn edit<T>(
        &mut self,
        edit: impl FnOnce(&mut FormBuilder) -> FormResult<T>,
    ) -> FormResult<T> {
        self.cancel.check()?;
        let mut working = self.builder.clone();
        let value = edit(&mut working)?;
        self.builder = working;
        self.dirty = true;
        Ok(value)
    }

    pub fn begin_file_read(&mut self, target: FileTarget) -> FormResult<ReadTicket> {
        self.cancel.check()?;
        Ok(self.reads.begin(target))
    }

    /// Delivers a finished read. Returns `false` when the read was stale.
    pub fn finish_file_read(
        &mut self,
        ticket: ReadTicket,
        files: Vec<FileValue>,
    ) -> FormResult<bool> {
        if self.is_closed() {
            return Ok(false);
        }
        match self.reads.complete(ticket, files, &self.builder)? {
            ReadOutcome::Applied(next) => {
                self.builder = next;
                self.dirty = true;
                Ok(true)
            }
            ReadOutcome::Stale => Ok(false),
        }
    }

    pub fn pending_reads(&self) -> usize {
        self.reads.pending()
    }

    pub fn validate(&mut self) -> &ValidationReport {
        self.report.insert(validate(self.builder.fields()))
    }

    pub fn preview(&self) -> PreviewDocument {
        render_preview(self.builder.fields())
    }

    pub fn payload(&self) -> FormResult<SerializedForm> {
        serialize(self.builder.fields())
    }

    /// Validates, serializes and hands the form to `backend`. The tree is
    /// left untouched on every outcome so a failed submit can be retried.
    pub fn submit(&mut self, backend: &dyn FormBackend) -> FormResult<FormDocument> {
        self.cancel.check()?;
        let attempt = self.submission.begin()?;

        let report = validate(self.builder.fields());
        if !report.is_valid() {
            let summary = report.summary();
            self.report = Some(report);
            self.submission.abandon();
            warn!(template = %self.template, issues = %summary, "submit blocked by validation");
            return Err(FormError::Validation(summary));
        }
        self.report = Some(report);

        let result = serialize(self.builder.fields()).and_then(|payload| match self.mode {
            SessionMode::Create => backend.create_form(&self.template, &payload, &self.cancel),
            SessionMode::Edit => backend.update_form(&self.template, &payload, &self.cancel),
        });

        match result {
            Ok(document) => {
                self.submission.succeed();
                self.mode = SessionMode::Edit;
                self.dirty = false;
                info!(template = %self.template, attempt, "form submitted");
                Ok(document)
            }
            Err(err) => {
                self.submission.fail(err.to_string());
                warn!(template = %self.template, attempt, error = %err, "form submit failed");
                Err(err)
            }
        }
    }

    /// Tears the session down; later reads and backend checks see the
    /// cancellation.
    pub fn close(&mut self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        self.reads.cancel_all();
        info!(template = %self.template, "closed edit session");
    }
}

impl Drop for EditSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FieldProperty, FieldType};
    use std::cell::RefCell;

    #[derive(Default)]
    struct MemoryBackend {
        stored: RefCell<Option<FormDocument>>,
        fail_next: RefCell<bool>,
    }

    impl MemoryBackend {
        fn store(&self, template: &str, form: &SerializedForm) -> FormResult<FormDocument> {
            if self.fail_next.replace(false) {
                return Err(FormError::Backend("503 service unavailable".into()));
            }
            let document = FormDocument {
                template: template.into(),
                fields: form.data.clone(),
                updated_at: Utc::now(),
            };
            *self.stored.borrow_mut() = Some(document.clone());
            Ok(document)
        }
    }

    impl FormBackend for MemoryBackend {
        fn fetch_form(&self, _template: &str) -> FormResult<Option<FormDocument>> {
            Ok(self.stored.borrow().clone())
        }

        fn create_form(
            &self,
            template: &str,
            form: &SerializedForm,
            cancel: &CancellationToken,
        ) -> FormResult<FormDocument> {
            cancel.check()?;
            self.store(template, form)
        }

        fn update_form(
            &self,
            template: &str,
            form: &SerializedForm,
            cancel: &CancellationToken,
        ) -> FormResult<FormDocument> {
            cancel.check()?;
            self.store(template, form)
        }

        fn delete_form(&self, _template: &str) -> FormResult<()> {
            *self.stored.borrow_mut() = None;
            Ok(())
        }

        fn list_forms(&self) -> FormResult<Vec<String>> {
            Ok(self
                .stored
                .borrow()
                .iter()
                .map(|doc| doc.template.clone())
                .collect())
        }
    }

    fn named_text_field(session: &mut EditSession, name: &str) {
        let Created::Field(field) = session.apply(FormCommand::AddField).unwrap() else {
            panic!("field not created")
        };
        session
            .apply(FormCommand::SetProperty {
                field,
                property: FieldProperty::Name(name.into()),
            })
            .unwrap();
    }

    #[test]
    fn tracker_rejects_reentrant_submit() {
        let mut tracker = SubmissionTracker::default();
        assert_eq!(tracker.begin().unwrap(), 1);
        assert!(matches!(tracker.begin(), Err(FormError::SubmitInFlight)));
        tracker.fail("boom");
        assert_eq!(tracker.begin().unwrap(), 2);
    }

    #[test]
    fn validation_issues_keep_session_idle() {
        let backend = MemoryBackend::default();
        let mut session = EditSession::create("blog");
        session.apply(FormCommand::AddField).unwrap();
        let err = session.submit(&backend).unwrap_err();
        assert!(matches!(err, FormError::Validation(_)));
        assert_eq!(session.state(), &SubmissionState::Idle);
        assert_eq!(session.builder().len(), 1);
        assert!(backend.stored.borrow().is_none());
    }

    #[test]
    fn failed_submit_keeps_tree_for_retry() {
        let backend = MemoryBackend::default();
        *backend.fail_next.borrow_mut() = true;
        let mut session = EditSession::create("blog");
        named_text_field(&mut session, "Title");
        let before = session.builder().clone();

        assert!(session.submit(&backend).is_err());
        assert!(matches!(
            session.state(),
            SubmissionState::Failed { attempt: 1, .. }
        ));
        assert_eq!(session.builder(), &before);

        let document = session.submit(&backend).unwrap();
        assert_eq!(document.fields[0]["fieldName"], "Title");
        assert!(matches!(session.state(), SubmissionState::Succeeded { .. }));
        assert_eq!(session.mode(), SessionMode::Edit);
    }

    #[test]
    fn edits_after_submit_mark_session_dirty() {
        let backend = MemoryBackend::default();
        let mut session = EditSession::create("blog");
        assert!(session.is_dirty());
        named_text_field(&mut session, "Title");
        session.submit(&backend).unwrap();
        assert!(!session.is_dirty());

        named_text_field(&mut session, "Body");
        assert!(session.is_dirty());
        assert!(matches!(session.state(), SubmissionState::Succeeded { .. }));

        *backend.fail_next.borrow_mut() = true;
        assert!(session.submit(&backend).is_err());
        assert!(session.is_dirty());

        let reopened = EditSession::open(&backend, "blog").unwrap();
        assert!(!reopened.is_dirty());
    }

    #[test]
    fn reopened_session_hydrates_stored_form() {
        let backend = MemoryBackend::default();
        let mut session = EditSession::create("blog");
        named_text_field(&mut session, "Title");
        session
            .edit(|builder| {
                crate::core::services::FieldListService::set_field_property(
                    builder,
                    0,
                    FieldProperty::Type(FieldType::Textarea),
                )
            })
            .unwrap();
        session.submit(&backend).unwrap();

        let reopened = EditSession::open(&backend, "blog").unwrap();
        assert_eq!(reopened.mode(), SessionMode::Edit);
        assert_eq!(reopened.builder().fields()[0].field_type, FieldType::Textarea);
    }

    #[test]
    fn closed_session_rejects_work_and_drops_reads() {
        let backend = MemoryBackend::default();
        let mut session = EditSession::create("blog");
        named_text_field(&mut session, "Title");
        let field = session.builder().fields()[0].id;
        session
            .apply(FormCommand::SetProperty {
                field,
                property: FieldProperty::Type(FieldType::File),
            })
            .unwrap();
        let ticket = session
            .begin_file_read(FileTarget::FieldAttachment(field))
            .unwrap();
        session.close();

        assert!(!session
            .finish_file_read(ticket, vec![FileValue::new("a.pdf", vec![1])])
            .unwrap());
        assert!(matches!(session.submit(&backend), Err(FormError::Cancelled)));
        assert!(matches!(
            session.apply(FormCommand::AddField),
            Err(FormError::Cancelled)
        ));
    }

    #[test]
    fn direct_overwrite_invalidates_pending_read() {
        let mut session = EditSession::create("blog");
        named_text_field(&mut session, "Doc");
        let field = session.builder().fields()[0].id;
        session
            .apply(FormCommand::SetProperty {
                field,
                property: FieldProperty::Type(FieldType::File),
            })
            .unwrap();
        let ticket = session
            .begin_file_read(FileTarget::FieldAttachment(field))
            .unwrap();
        session
            .apply(FormCommand::SetAttachment {
                field,
                file: Some(FileValue::new("new.pdf", vec![2])),
            })
            .unwrap();
        assert!(!session
            .finish_file_read(ticket, vec![FileValue::new("old.pdf", vec![1])])
            .unwrap());
        let attachment = session.builder().fields()[0].attachment.as_ref().unwrap();
        assert_eq!(attachment.name, "new.pdf");
    }
}
