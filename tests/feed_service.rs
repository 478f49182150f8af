//! Integration tests for the feed service: pagination, search arbitration,
//! restore, retry fallback, and the category handoff between processes.
//!
//! Each test runs against its own wiremock server standing in for the blog API.

use blogfeed::api::ApiClient;
use blogfeed::blog::{BlogService, Category, Mode, SearchCriteria, ServiceOptions, CATEGORIES_KEY};
use blogfeed::transfer::TransferState;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn titles(n: usize) -> Value {
    json!((0..n)
        .map(|i| json!({ "title": format!("Post {i}") }))
        .collect::<Vec<_>>())
}

fn seeded_transfer() -> TransferState {
    let transfer = TransferState::new();
    transfer
        .set(
            &CATEGORIES_KEY,
            &vec![Category {
                id: json!(1),
                name: "A".into(),
                extra: Default::default(),
            }],
        )
        .unwrap();
    transfer
}

fn service(server: &MockServer, transfer: TransferState, page_size: u32) -> BlogService {
    let client = ApiClient::new(&server.uri()).unwrap();
    BlogService::new(
        client,
        transfer,
        ServiceOptions {
            page_size,
            max_retries: 3,
        },
    )
}

async fn mount_page(server: &MockServer, limit: &str, count: usize) {
    Mock::given(method("GET"))
        .and(path("/article/list"))
        .and(query_param("index", "1"))
        .and(query_param("limit", limit))
        .respond_with(ResponseTemplate::new(200).set_body_json(titles(count)))
        .mount(server)
        .await;
}

// ============================================================================
// Pagination
// ============================================================================

#[tokio::test]
async fn test_end_to_end_two_pages_without_growth() {
    let server = MockServer::start().await;
    mount_page(&server, "5", 5).await;
    mount_page(&server, "10", 5).await;

    let service = service(&server, seeded_transfer(), 5);

    service.request_list(None).await;
    assert!(!service.exhausted().get());
    assert_eq!(service.cursor().index(), 2);

    service.request_list(None).await;
    assert!(service.exhausted().get());
    assert_eq!(service.cursor().index(), 2);
    assert_eq!(service.feed().get().len(), 5);
}

#[tokio::test]
async fn test_cursor_grows_until_exhaustion_then_latches() {
    let server = MockServer::start().await;
    mount_page(&server, "5", 5).await;
    mount_page(&server, "10", 10).await;
    mount_page(&server, "15", 12).await;
    mount_page(&server, "20", 12).await;

    let service = service(&server, seeded_transfer(), 5);

    let mut indices = Vec::new();
    for _ in 0..3 {
        service.request_next_page().await;
        indices.push(service.cursor().index());
        assert!(!service.exhausted().get());
    }
    assert_eq!(indices, vec![2, 3, 4]);

    service.request_next_page().await;
    assert!(service.exhausted().get());
    assert_eq!(service.cursor().index(), 4);

    service.request_next_page().await;
    assert!(service.exhausted().get(), "exhaustion stays latched");
    assert_eq!(service.cursor().index(), 4);
    assert_eq!(service.articles().get().len(), 12);
}

#[tokio::test]
async fn test_browse_failure_retries_three_times_then_empties() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/article/list"))
        .respond_with(ResponseTemplate::new(500))
        .expect(4) // Initial request + 3 retries
        .mount(&server)
        .await;

    let service = service(&server, seeded_transfer(), 5);
    service.request_list(None).await;

    assert!(service.feed().get().is_empty());
    assert!(!service.is_loading().get());
}

#[tokio::test]
async fn test_browse_recovers_within_retry_budget() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/article/list"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_page(&server, "5", 5).await;

    let service = service(&server, seeded_transfer(), 5);
    service.request_list(None).await;

    assert_eq!(service.feed().get().len(), 5);
    assert_eq!(service.cursor().index(), 2);
}

// ============================================================================
// Search arbitration
// ============================================================================

#[tokio::test]
async fn test_title_criteria_searches_once_without_browsing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/article/search"))
        .and(query_param("title", "x"))
        .respond_with(ResponseTemplate::new(200).set_body_json(titles(2)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/article/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(titles(5)))
        .expect(0)
        .mount(&server)
        .await;

    let service = service(&server, seeded_transfer(), 5);
    service.update_criteria(SearchCriteria::title("x"));
    service.request_list(Some(SearchCriteria::title("x"))).await;

    assert_eq!(service.mode(), Mode::Searching);
    assert_eq!(service.feed().get().len(), 2);
}

#[tokio::test]
async fn test_cleared_criteria_resume_browsing_from_current_cursor() {
    let server = MockServer::start().await;
    mount_page(&server, "5", 5).await;
    Mock::given(method("GET"))
        .and(path("/article/list"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(titles(10)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/article/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(titles(1)))
        .mount(&server)
        .await;

    let service = service(&server, seeded_transfer(), 5);
    service.request_list(None).await;
    assert_eq!(service.cursor().index(), 2);

    service.update_criteria(SearchCriteria::title("x"));
    service.request_list(Some(SearchCriteria::title("x"))).await;
    assert_eq!(service.feed().get().len(), 1);

    service.update_criteria(SearchCriteria::title(""));
    service.request_list(None).await;

    assert_eq!(service.mode(), Mode::Browsing);
    assert_eq!(service.cursor().index(), 3);
    assert_eq!(service.feed().get().len(), 10);
}

#[tokio::test]
async fn test_feed_channel_switches_with_mode() {
    let server = MockServer::start().await;
    mount_page(&server, "5", 5).await;
    Mock::given(method("GET"))
        .and(path("/article/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(titles(2)))
        .mount(&server)
        .await;

    let service = service(&server, seeded_transfer(), 5);
    let mut feed = service.feed().subscribe();

    service.request_list(None).await;
    assert_eq!(feed.borrow_and_update().len(), 5);

    service.update_criteria(SearchCriteria::category("0"));
    service.request_list(Some(SearchCriteria::category("0"))).await;
    assert_eq!(feed.borrow_and_update().len(), 2);
    assert_eq!(service.articles().get().len(), 5, "browse window kept aside");
}

// ============================================================================
// Restore
// ============================================================================

#[tokio::test]
async fn test_restore_resets_browse_state_but_keeps_categories() {
    let server = MockServer::start().await;
    mount_page(&server, "5", 5).await;

    let service = service(&server, seeded_transfer(), 5);
    service.request_list(None).await;
    service.update_criteria(SearchCriteria::category("1"));

    service.restore();

    assert_eq!(service.cursor().index(), 1);
    assert!(service.articles().get().is_empty());
    assert!(service.feed().get().is_empty());
    assert_eq!(service.criteria(), SearchCriteria::default());
    let categories = service.categories().get().unwrap();
    assert_eq!(categories[0].name, "A");
}

// ============================================================================
// Category handoff
// ============================================================================

#[tokio::test]
async fn test_prepopulated_categories_adopted_without_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/category"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let transfer = TransferState::from_json(r#"{"categories":[{"id":1,"name":"A"}]}"#).unwrap();
    let service = service(&server, transfer, 5);

    let categories = service.categories().get().expect("adopted synchronously");
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].id, json!(1));
    assert_eq!(categories[0].name, "A");
}

#[tokio::test]
async fn test_categories_fetched_once_across_handoff() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/category"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "id": 7, "name": "Rust" }])),
        )
        .expect(1)
        .mount(&server)
        .await;

    // Server-side render pass
    let server_state = TransferState::new();
    let server_service = service(&server, server_state.clone(), 5);
    let fetched = server_service.wait_for_categories().await;
    assert_eq!(fetched[0].name, "Rust");
    assert!(server_state.has_key(&CATEGORIES_KEY));

    // Client bootstrap from the shipped payload
    let payload = server_state.to_json().unwrap();
    let client_state = TransferState::from_json(&payload).unwrap();
    let client_service = service(&server, client_state, 5);

    let adopted = client_service.categories().get().unwrap();
    assert_eq!(adopted, fetched);
}

#[tokio::test]
async fn test_string_category_ids_are_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/category"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "id": "5c1a", "name": "A" }])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let transfer = TransferState::new();
    let service = service(&server, transfer.clone(), 5);

    let categories = service.wait_for_categories().await;
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].id_text(), "5c1a");
    let stored = transfer.get(&CATEGORIES_KEY).unwrap();
    assert_eq!(stored[0].id, json!("5c1a"));
}

#[tokio::test]
async fn test_category_failure_falls_back_to_empty_after_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/category"))
        .respond_with(ResponseTemplate::new(500))
        .expect(4)
        .mount(&server)
        .await;

    let transfer = TransferState::new();
    let service = service(&server, transfer.clone(), 5);

    assert!(service.wait_for_categories().await.is_empty());
    assert_eq!(transfer.get(&CATEGORIES_KEY), Some(Vec::new()));
}
