//! Request wrapper against the fake XML-RPC endpoint, with the SQLite store
//! and the filesystem file source.

mod common;

use std::sync::Arc;

use tempfile::TempDir;

use common::FakeVendor;
use ithenticate_bridge::client::XmlRpcClient;
use ithenticate_bridge::config::Credentials;
use ithenticate_bridge::file_source::FsFileSource;
use ithenticate_bridge::ithenticate_core::entity::{Author, ContentEntity, FileRef, Profile};
use ithenticate_bridge::ithenticate_core::models::DocumentRecord;
use ithenticate_bridge::ithenticate_core::notice::{NoticeLevel, RecordingNotifier};
use ithenticate_bridge::ithenticate_core::vendor::{VendorClient, VendorError};
use ithenticate_bridge::ithenticate_core::wrapper::{RequestWrapper, WrapperError};
use ithenticate_bridge::sqlite_store::SqliteStore;
use ithenticate_bridge::xmlrpc::Value;
use ithenticate_bridge::{db, migrate};

const PAPER: &[u8] = b"%PDF-1.4 fake paper";

fn credentials(fake: &FakeVendor, password: &str) -> Credentials {
    Credentials {
        username: common::USERNAME.to_string(),
        password: password.to_string(),
        api_url: fake.url.clone(),
    }
}

struct Harness {
    _tmp: TempDir,
    fake: FakeVendor,
    wrapper: RequestWrapper,
    notifier: Arc<RecordingNotifier>,
}

async fn harness() -> Harness {
    let fake = FakeVendor::start();
    let tmp = TempDir::new().unwrap();

    let files = tmp.path().join("files");
    std::fs::create_dir_all(files.join("papers")).unwrap();
    std::fs::write(files.join("papers/paper.pdf"), PAPER).unwrap();

    let pool = db::connect_path(&tmp.path().join("data/ithen.sqlite"))
        .await
        .unwrap();
    migrate::create_schema(&pool).await.unwrap();

    let client = XmlRpcClient::login(&credentials(&fake, common::PASSWORD), 5)
        .await
        .unwrap();
    let notifier = Arc::new(RecordingNotifier::new());
    let wrapper = RequestWrapper::new(
        Arc::new(client),
        Arc::new(SqliteStore::new(pool)),
        Arc::new(FsFileSource::new(files)),
        notifier.clone(),
        77,
    );

    Harness {
        _tmp: tmp,
        fake,
        wrapper,
        notifier,
    }
}

fn paper(entity_id: i64) -> ContentEntity {
    ContentEntity::node("paper", entity_id, "On Rust")
        .with_revision(3)
        .with_file(FileRef {
            fid: 11,
            filename: "paper.pdf".to_string(),
            uri: "papers/paper.pdf".to_string(),
        })
        .with_authors(vec![
            Author {
                first_name: Some("Alan".to_string()),
                last_name: Some("Turing".to_string()),
                types: vec![],
            },
            Author {
                first_name: Some("Ada".to_string()),
                last_name: Some("Lovelace".to_string()),
                types: vec!["corresponding".to_string()],
            },
        ])
        .with_owner(Profile {
            first_name: Some("Grace".to_string()),
            last_name: Some("Hopper".to_string()),
        })
}

#[tokio::test]
async fn test_login_exposes_sid() {
    let h = harness().await;
    assert_eq!(h.wrapper.get_sid(), common::SID);
}

#[tokio::test]
async fn test_login_with_wrong_password_fails() {
    let fake = FakeVendor::start();
    let result = XmlRpcClient::login(&credentials(&fake, "wrong"), 5).await;
    match result {
        Err(VendorError::Api { status, message }) => {
            assert_eq!(status, 401);
            assert!(message.contains("Invalid username or password"));
        }
        Err(other) => panic!("expected API error, got {:?}", other),
        Ok(client) => panic!("login unexpectedly succeeded with sid {}", client.sid()),
    }
}

#[tokio::test]
async fn test_submit_uploads_file_and_stores_document_id() {
    let h = harness().await;

    let record = h.wrapper.submit_document(&paper(7)).await.unwrap();
    assert_eq!(record.document_id(), Some(common::FIRST_DOCUMENT_ID));
    assert_eq!(record.revision_id(), Some(3));

    let adds = h.fake.state.calls("document.add");
    assert_eq!(adds.len(), 1);
    let params = &adds[0].params;
    assert_eq!(params.get("folder").and_then(Value::as_i64), Some(77));
    assert_eq!(params.get("submit_to").and_then(Value::as_i64), Some(1));
    let upload = &params.get("uploads").and_then(Value::as_array).unwrap()[0];
    assert_eq!(upload.get("title").and_then(Value::as_str), Some("On Rust"));
    assert_eq!(upload.get("author_first").and_then(Value::as_str), Some("Ada"));
    assert_eq!(
        upload.get("author_last").and_then(Value::as_str),
        Some("Lovelace")
    );
    assert_eq!(
        upload.get("filename").and_then(Value::as_str),
        Some("paper.pdf")
    );
    assert_eq!(upload.get("upload"), Some(&Value::Base64(PAPER.to_vec())));

    let stored = DocumentRecord::load_by_document_id(h.wrapper.store(), common::FIRST_DOCUMENT_ID)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, record);
}

fn uploaded_name(h: &Harness) -> (Option<String>, Option<String>) {
    let adds = h.fake.state.calls("document.add");
    let upload = &adds[0].params.get("uploads").and_then(Value::as_array).unwrap()[0];
    let field = |name: &str| upload.get(name).and_then(Value::as_str).map(str::to_string);
    (field("author_first"), field("author_last"))
}

#[tokio::test]
async fn test_owner_is_submitter_without_author_collection() {
    let h = harness().await;
    let mut entity = paper(8);
    entity.authors = None;

    h.wrapper.submit_document(&entity).await.unwrap();

    assert_eq!(
        uploaded_name(&h),
        (Some("Grace".to_string()), Some("Hopper".to_string()))
    );
}

#[tokio::test]
async fn test_authors_without_corresponding_send_empty_names() {
    let h = harness().await;
    let mut entity = paper(8);
    entity.authors = Some(vec![Author {
        first_name: Some("Alan".to_string()),
        last_name: Some("Turing".to_string()),
        types: vec![],
    }]);

    h.wrapper.submit_document(&entity).await.unwrap();

    assert_eq!(
        uploaded_name(&h),
        (Some(String::new()), Some(String::new()))
    );
}

#[tokio::test]
async fn test_second_submit_reuses_stored_record() {
    let h = harness().await;
    let first = h.wrapper.submit_document(&paper(7)).await.unwrap();
    h.notifier.take();

    let second = h.wrapper.submit_document(&paper(7)).await.unwrap();
    assert_eq!(second, first);
    assert_eq!(h.fake.state.calls("document.add").len(), 1);

    let notices = h.notifier.take();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Status);
}

#[tokio::test]
async fn test_submit_with_missing_file_fails_without_upload() {
    let h = harness().await;
    let mut entity = paper(9);
    entity.file = Some(FileRef {
        fid: 12,
        filename: "gone.pdf".to_string(),
        uri: "papers/gone.pdf".to_string(),
    });

    let err = h.wrapper.submit_document(&entity).await.unwrap_err();
    assert!(matches!(
        err,
        WrapperError::FileNotFound {
            entity_id: 9,
            fid: 12
        }
    ));
    assert!(h.fake.state.calls("document.add").is_empty());
}

#[tokio::test]
async fn test_pending_check_follows_vendor_flag() {
    let h = harness().await;
    let record = h.wrapper.submit_document(&paper(7)).await.unwrap();
    let document_id = record.document_id().unwrap();

    assert!(h
        .wrapper
        .check_is_document_report_pending(document_id)
        .await
        .unwrap());

    h.fake.state.set_pending(false);
    assert!(!h
        .wrapper
        .check_is_document_report_pending(document_id)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_report_data_waits_for_pending_report() {
    let h = harness().await;
    let record = h.wrapper.submit_document(&paper(7)).await.unwrap();
    h.notifier.take();

    let unchanged = h.wrapper.get_report_data(record.clone()).await.unwrap();
    assert_eq!(unchanged, record);
    let notices = h.notifier.take();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Warning);
    assert!(h.fake.state.calls("report.get").is_empty());
}

#[tokio::test]
async fn test_report_data_fills_score_report_id_and_url() {
    let h = harness().await;
    let record = h.wrapper.submit_document(&paper(7)).await.unwrap();
    let document_id = record.document_id().unwrap();
    h.fake.state.set_pending(false);

    let updated = h.wrapper.get_report_data(record).await.unwrap();
    let report_id = document_id + common::REPORT_OFFSET;
    assert_eq!(updated.percent_match(), Some(common::PERCENT_MATCH));
    assert_eq!(updated.report_id(), Some(report_id));
    assert_eq!(
        updated.report_url(),
        Some(format!("https://fake.test/report/{}", report_id).as_str())
    );
    assert_eq!(updated.document_id(), Some(document_id));

    let stored = DocumentRecord::load_by_report_id(h.wrapper.store(), report_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, updated);
}

#[tokio::test]
async fn test_report_data_surfaces_field_errors() {
    let h = harness().await;
    let mut record = DocumentRecord::new("node", "paper", 10, None);
    record.set_document_id(common::MISSING_DOCUMENT);
    record.save(h.wrapper.store()).await.unwrap();

    let unchanged = h.wrapper.get_report_data(record.clone()).await.unwrap();
    assert_eq!(unchanged, record);

    let notices = h.notifier.take();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
    assert_eq!(notices[0].message, "id: Document does not exist");
}
