mod common;

use std::fs;
use std::path::Path;

use formdesk_core::{
    core::{
        builder::{FormBuilder, FormCommand, NodeTarget},
        serializer::serialize,
        session::{CancellationToken, EditSession, SessionMode, SubmissionState},
    },
    domain::{ChildKind, FieldProperty, FieldType, FileValue, KvValue},
    errors::FormError,
    storage::{FormBackend, JsonFormStore},
};
use serde_json::json;

use common::{add_field, add_node, add_pair, setup_store};

fn tmp_path_for(path: &Path) -> std::path::PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.tmp", existing),
        None => String::from("tmp"),
    };
    tmp.set_extension(ext);
    tmp
}

fn kit_builder() -> FormBuilder {
    let (builder, field) = add_field(&FormBuilder::new(), FieldType::NestedSelect, "Kit");
    let (builder, node) = add_node(&builder, field, NodeTarget::Root, ChildKind::Group, "Starter");
    let builder = builder
        .apply(FormCommand::SetPackage {
            node,
            is_package: true,
        })
        .unwrap();
    let (builder, _) = add_pair(
        &builder,
        node,
        "image",
        KvValue::File(FileValue::new("kit.png", b"png-bytes".to_vec())),
    );
    builder
}

#[test]
fn create_writes_document_and_attachments() {
    let store = setup_store();
    let form = serialize(kit_builder().fields()).unwrap();
    let document = store
        .create_form("Products", &form, &CancellationToken::new())
        .unwrap();

    assert_eq!(document.template, "Products");
    let stored = store.fetch_form("Products").unwrap().unwrap();
    assert_eq!(stored.fields, form.data);
    let bytes = fs::read(store.attachment_path("Products", "kit.png")).unwrap();
    assert_eq!(bytes, b"png-bytes".to_vec());
    assert_eq!(store.list_forms().unwrap(), vec!["Products".to_string()]);
}

#[test]
fn create_twice_and_update_missing_fail() {
    let store = setup_store();
    let token = CancellationToken::new();
    let form = serialize(kit_builder().fields()).unwrap();
    store.create_form("blog", &form, &token).unwrap();

    let err = store.create_form("blog", &form, &token).unwrap_err();
    assert!(matches!(err, FormError::Backend(_)));
    let err = store.update_form("news", &form, &token).unwrap_err();
    assert!(matches!(err, FormError::FormNotFound(name) if name == "news"));
}

#[test]
fn atomic_update_failure_preserves_original_document() {
    let store = setup_store();
    let token = CancellationToken::new();
    let form = serialize(kit_builder().fields()).unwrap();
    store.create_form("reliable", &form, &token).unwrap();
    let path = store.document_path("reliable");
    let original = fs::read_to_string(&path).unwrap();

    // A directory at the staging path makes the temp file creation fail.
    fs::create_dir_all(tmp_path_for(&path)).unwrap();
    let empty = serialize(&[]).unwrap();
    assert!(store.update_form("reliable", &empty, &token).is_err());
    assert_eq!(fs::read_to_string(&path).unwrap(), original);
}

#[test]
fn cancelled_token_prevents_any_write() {
    let store = setup_store();
    let token = CancellationToken::new();
    token.cancel();
    let form = serialize(kit_builder().fields()).unwrap();
    let err = store.create_form("blog", &form, &token).unwrap_err();
    assert!(matches!(err, FormError::Cancelled));
    assert!(store.fetch_form("blog").unwrap().is_none());
    assert!(!store.files_dir("blog").exists());
}

#[test]
fn delete_removes_document_and_files() {
    let store = setup_store();
    let form = serialize(kit_builder().fields()).unwrap();
    store
        .create_form("shop", &form, &CancellationToken::new())
        .unwrap();
    store.delete_form("shop").unwrap();
    assert!(store.fetch_form("shop").unwrap().is_none());
    assert!(!store.files_dir("shop").exists());
    assert!(matches!(
        store.delete_form("shop"),
        Err(FormError::FormNotFound(_))
    ));
}

#[test]
fn session_create_then_edit_round_trip() {
    let store = setup_store();
    let mut session = EditSession::create("products");
    session.apply(FormCommand::AddField).unwrap();
    let field = session.builder().fields()[0].id;
    session
        .apply(FormCommand::SetProperty {
            field,
            property: FieldProperty::Name("SKU".into()),
        })
        .unwrap();
    session.submit(&store).unwrap();
    assert!(matches!(session.state(), SubmissionState::Succeeded { .. }));
    session.close();

    let mut reopened = EditSession::open(&store, "products").unwrap();
    assert_eq!(reopened.mode(), SessionMode::Edit);
    assert_eq!(reopened.builder().fields()[0].field_name, "SKU");
    reopened.apply(FormCommand::AddField).unwrap();
    let added = reopened.builder().fields()[1].id;
    reopened
        .apply(FormCommand::SetProperty {
            field: added,
            property: FieldProperty::Name("Price".into()),
        })
        .unwrap();
    reopened.submit(&store).unwrap();

    let stored = store.fetch_form("products").unwrap().unwrap();
    assert_eq!(stored.fields[1]["fieldName"], json!("Price"));
}

fn file_field(session: &mut EditSession, name: &str, upload: FileValue) {
    session.apply(FormCommand::AddField).unwrap();
    let field = session.builder().fields().last().unwrap().id;
    for property in [
        FieldProperty::Name(name.into()),
        FieldProperty::Type(FieldType::File),
    ] {
        session
            .apply(FormCommand::SetProperty { field, property })
            .unwrap();
    }
    session
        .apply(FormCommand::SetAttachment {
            field,
            file: Some(upload),
        })
        .unwrap();
}

#[test]
fn new_upload_never_overwrites_stored_file_of_same_name() {
    let store = setup_store();
    let mut session = EditSession::create("gallery");
    file_field(&mut session, "Cover", FileValue::new("photo.png", b"OLD".to_vec()));
    session.submit(&store).unwrap();
    session.close();

    let mut reopened = EditSession::open(&store, "gallery").unwrap();
    file_field(&mut reopened, "Banner", FileValue::new("photo.png", b"NEW".to_vec()));
    reopened.submit(&store).unwrap();

    let stored = store.fetch_form("gallery").unwrap().unwrap();
    assert_eq!(stored.fields[0]["file"], json!("photo.png"));
    assert_eq!(stored.fields[1]["file"], json!("photo-2.png"));
    assert_eq!(
        fs::read(store.attachment_path("gallery", "photo.png")).unwrap(),
        b"OLD".to_vec()
    );
    assert_eq!(
        fs::read(store.attachment_path("gallery", "photo-2.png")).unwrap(),
        b"NEW".to_vec()
    );
}

#[test]
fn open_missing_template_reports_not_found() {
    let store: JsonFormStore = setup_store();
    let err = EditSession::open(&store, "ghost").unwrap_err();
    assert!(matches!(err, FormError::FormNotFound(name) if name == "ghost"));
}
