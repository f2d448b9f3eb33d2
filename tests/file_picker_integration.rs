//! Integration tests for the LMS file browser.
//!
//! These tests drive `LmsFilePicker` against mock "list files" endpoints,
//! including authorization and stale-response races.

mod support;

use std::time::Duration;

use futures_util::future::join;
use lms_launch_core::{
    ApiCallSpec, AuthWindowError, FileEntry, LmsFilePicker, PickerAction, PickerStatus,
};
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use support::{FAST_POLL, FakePopupHost, TEST_TOKEN, api_client};

fn listing_spec() -> ApiCallSpec {
    ApiCallSpec::new("/api/blackboard/courses/c1/files")
        .with_auth_url("/api/blackboard/oauth/authorize")
}

fn folder_json(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "display_name": name,
        "type": "Folder",
        "contents": {"path": format!("/api/blackboard/folders/{id}")}
    })
}

fn file_json(id: &str, name: &str) -> Value {
    json!({"id": id, "display_name": name, "type": "File"})
}

async fn mount_listing(server: &MockServer, listing_path: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(listing_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn picker(server: &MockServer, host: std::sync::Arc<FakePopupHost>) -> LmsFilePicker {
    LmsFilePicker::new(api_client(server), host, listing_spec())
        .unwrap()
        .with_poll_interval(FAST_POLL)
}

fn folder_entry(id: &str, name: &str) -> FileEntry {
    serde_json::from_value(folder_json(id, name)).unwrap()
}

#[tokio::test]
async fn test_load_lists_root_folder() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        "/api/blackboard/courses/c1/files",
        json!([file_json("f1", "Syllabus.pdf"), folder_json("d1", "Week 1")]),
    )
    .await;

    let picker = picker(&server, FakePopupHost::new(0));
    assert_eq!(picker.status(), PickerStatus::Fetching { is_reload: false });
    picker.load().await;

    let PickerStatus::Fetched { files } = picker.status() else {
        panic!("expected fetched, got {:?}", picker.status());
    };
    assert_eq!(files.len(), 2);

    let view = picker.view();
    assert_eq!(view.breadcrumbs, vec!["Files"]);
    assert_eq!(view.primary_action, Some(PickerAction::Select));
    assert!(!view.action_enabled, "nothing selected yet");
}

#[tokio::test]
async fn test_select_and_confirm_file() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        "/api/blackboard/courses/c1/files",
        json!([file_json("blackboard://content-resource/_1_1/", "Notes.pdf")]),
    )
    .await;

    let picker = picker(&server, FakePopupHost::new(0));
    picker.load().await;

    assert!(!picker.select("missing"));
    assert!(picker.select("blackboard://content-resource/_1_1/"));
    assert!(picker.view().action_enabled);

    let chosen = picker.confirm().await.unwrap();
    assert_eq!(chosen.display_name, "Notes.pdf");
}

#[tokio::test]
async fn test_empty_folder_offers_reload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/blackboard/courses/c1/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&server)
        .await;

    let picker = picker(&server, FakePopupHost::new(0));
    picker.load().await;

    let view = picker.view();
    assert_eq!(view.status, PickerStatus::Fetched { files: vec![] });
    assert_eq!(view.primary_action, Some(PickerAction::Reload));
    assert!(view.action_enabled);

    picker.reload().await;
    assert_eq!(picker.status(), PickerStatus::Fetched { files: vec![] });
}

#[tokio::test]
async fn test_opening_folder_fetches_children_and_extends_breadcrumbs() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        "/api/blackboard/courses/c1/files",
        json!([folder_json("d1", "Week 1")]),
    )
    .await;
    mount_listing(
        &server,
        "/api/blackboard/folders/d1",
        json!([file_json("f2", "Reading.pdf")]),
    )
    .await;

    let picker = picker(&server, FakePopupHost::new(0));
    picker.load().await;
    assert!(picker.select("d1"));
    assert_eq!(picker.view().primary_action, Some(PickerAction::Open));

    assert_eq!(picker.confirm().await, None, "folders are opened, not emitted");
    assert_eq!(picker.current_folder().id, "d1");
    assert_eq!(picker.view().breadcrumbs, vec!["Files", "Week 1"]);
    let PickerStatus::Fetched { files } = picker.status() else {
        panic!("expected fetched");
    };
    assert_eq!(files[0].id, "f2");
}

#[tokio::test]
async fn test_stale_folder_response_is_discarded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/blackboard/folders/a"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([file_json("a1", "From A.pdf")]))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    mount_listing(
        &server,
        "/api/blackboard/folders/b",
        json!([file_json("b1", "From B.pdf")]),
    )
    .await;

    let picker = picker(&server, FakePopupHost::new(0));
    let folder_a = folder_entry("a", "A");
    let folder_b = folder_entry("b", "B");

    join(picker.navigate_to(&folder_a), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        picker.navigate_to(&folder_b).await;
    })
    .await;

    let PickerStatus::Fetched { files } = picker.status() else {
        panic!("expected fetched, got {:?}", picker.status());
    };
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].id, "b1");
    assert_eq!(picker.current_folder().id, "b");
}

#[tokio::test]
async fn test_authorization_failure_then_authorize() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/blackboard/courses/c1/files"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({})))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_listing(
        &server,
        "/api/blackboard/courses/c1/files",
        json!([file_json("f1", "Syllabus.pdf")]),
    )
    .await;

    let host = FakePopupHost::new(2);
    let picker = picker(&server, host.clone());
    picker.load().await;

    assert_eq!(picker.status(), PickerStatus::Authorizing { is_retry: false });
    assert_eq!(picker.view().primary_action, Some(PickerAction::Authorize));

    picker.authorize().await.unwrap();

    assert!(matches!(picker.status(), PickerStatus::Fetched { .. }));
    assert_eq!(host.open_count(), 1);
    let popup_url = &host.opened_urls()[0];
    assert_eq!(popup_url.path(), "/api/blackboard/oauth/authorize");
    assert!(
        popup_url
            .query_pairs()
            .any(|(key, value)| key == "authorization" && value == TEST_TOKEN)
    );
}

#[tokio::test]
async fn test_repeated_authorization_failure_offers_try_again() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/blackboard/courses/c1/files"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({})))
        .expect(3)
        .mount(&server)
        .await;

    let host = FakePopupHost::new(1);
    let picker = picker(&server, host.clone());
    picker.load().await;
    picker.authorize().await.unwrap();

    assert_eq!(picker.status(), PickerStatus::Authorizing { is_retry: true });
    assert_eq!(picker.view().primary_action, Some(PickerAction::TryAgain));

    picker.retry().await.unwrap();
    assert_eq!(picker.status(), PickerStatus::Authorizing { is_retry: true });
    assert_eq!(host.open_count(), 2);
}

#[tokio::test]
async fn test_generic_error_keeps_details_and_retries_by_fetching() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/blackboard/courses/c1/files"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"message": "Blackboard is down"})),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_listing(&server, "/api/blackboard/courses/c1/files", json!([])).await;

    let host = FakePopupHost::new(0);
    let picker = picker(&server, host.clone());
    picker.load().await;

    let PickerStatus::Error { error } = picker.status() else {
        panic!("expected error, got {:?}", picker.status());
    };
    assert_eq!(error.server_message.as_deref(), Some("Blackboard is down"));
    assert_eq!(picker.view().primary_action, Some(PickerAction::TryAgain));

    picker.retry().await.unwrap();
    assert_eq!(picker.status(), PickerStatus::Fetched { files: vec![] });
    assert_eq!(host.open_count(), 0, "generic errors do not open the popup");
}

#[tokio::test]
async fn test_blocked_popup_keeps_authorizing_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/blackboard/courses/c1/files"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let picker = picker(&server, FakePopupHost::blocking());
    picker.load().await;

    let err = picker.authorize().await.unwrap_err();
    assert!(matches!(err, AuthWindowError::WindowCreation { .. }));
    assert_eq!(picker.status(), PickerStatus::Authorizing { is_retry: false });
}
