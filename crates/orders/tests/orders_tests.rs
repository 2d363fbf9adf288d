use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use digitradex_auth::{Session, SessionStore};
use digitradex_orders::{FilterCriteria, ListBrowser, OrdersClient, OrdersError, OrdersOptions};

fn client_for(server: &MockServer) -> OrdersClient {
    let session = SessionStore::new();
    session.init(Session {
        token: "test_token".to_string(),
        user: None,
    });
    OrdersClient::new(
        &server.uri(),
        reqwest::Client::new(),
        session,
        OrdersOptions::default(),
    )
}

fn header(id: i64, po_number: &str, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "status": status,
        "manager": "山田",
        "customer": "Acme Corp",
        "poNumber": po_number,
        "productName": "Widget A, Widget B",
        "quantity": "200",
        "unitPrice": "5",
        "amount": "1000",
        "memo": ""
    })
}

async fn mount_list(server: &MockServer, po_list: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/po/list"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "po_list": po_list
            })),
        )
        .mount(server)
        .await;
}

async fn mount_products(server: &MockServer, po_id: i64, products: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/api/po/{}/products", po_id)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "products": products
            })),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_load_expands_rows_per_product() {
    let server = MockServer::start().await;
    mount_list(
        &server,
        json!([header(1, "PO-001", "手配前"), header(2, "PO-002", "手配中")]),
    )
    .await;
    mount_products(
        &server,
        1,
        json!([
            {"id": 10, "po_id": 1, "product_name": "Widget A", "quantity": "100", "unit_price": "5", "subtotal": "500"},
            {"id": 11, "po_id": 1, "product_name": "Widget B", "quantity": "100", "unit_price": "5", "subtotal": "500"}
        ]),
    )
    .await;
    mount_products(
        &server,
        2,
        json!([
            {"id": 12, "po_id": 2, "product_name": "Gadget", "quantity": "30", "unit_price": "2", "subtotal": "60"}
        ]),
    )
    .await;

    let client = client_for(&server);
    let report = client.load().await.unwrap();

    assert!(report.failures.is_empty());
    assert_eq!(report.rows.len(), 3);
    // ヘッダー順が保たれる
    assert_eq!(report.rows[0].id(), 1);
    assert_eq!(report.rows[0].product_name, "Widget A");
    assert!(report.rows[0].is_main_row);
    assert!(!report.rows[1].is_main_row);
    assert_eq!(report.rows[2].id(), 2);
    assert_eq!(report.rows[2].product_name, "Gadget");
}

#[tokio::test]
async fn test_load_falls_back_when_detail_fetch_fails() {
    let server = MockServer::start().await;
    mount_list(&server, json!([header(1, "PO-001", "手配前")])).await;
    Mock::given(method("GET"))
        .and(path("/api/po/1/products"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let report = client.load().await.unwrap();

    // ヘッダーの製品名から再構成され、失敗は集約される
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, 1);
    assert_eq!(report.rows.len(), 2);
    assert_eq!(report.rows[0].product_name, "Widget A");
    assert_eq!(report.rows[0].quantity, "100");
    assert_eq!(report.rows[0].amount, "500");
}

#[tokio::test]
async fn test_load_rejects_malformed_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/po/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": false })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    match client.load().await {
        Err(OrdersError::ApiError(message)) => {
            assert!(message.contains("正しいデータ形式"));
        }
        other => panic!("expected ApiError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_filter_and_reset_restores_full_list() {
    let server = MockServer::start().await;
    mount_list(
        &server,
        json!([
            header(1, "PO-001", "手配前"),
            header(2, "PO-002", "手配中"),
            header(3, "PO-003", "手配中")
        ]),
    )
    .await;
    for id in 1..=3 {
        mount_products(&server, id, json!([])).await;
    }

    let client = client_for(&server);
    let mut browser = ListBrowser::new(client);
    browser.refresh().await.unwrap();
    let full_count = browser.view().rows().len();

    browser.view_mut().apply_filters(FilterCriteria {
        status: "手配中".to_string(),
        ..Default::default()
    });
    assert!(browser.view().rows().len() < full_count);
    assert!(browser
        .view()
        .rows()
        .iter()
        .all(|row| row.po.status == "手配中"));

    browser.view_mut().reset_filters();
    assert_eq!(browser.view().rows().len(), full_count);
    assert_eq!(browser.view().page(), 1);
}

#[tokio::test]
async fn test_status_edit_reverts_on_failure() {
    let server = MockServer::start().await;
    mount_list(&server, json!([header(1, "PO-001", "手配前")])).await;
    mount_products(&server, 1, json!([])).await;
    Mock::given(method("PATCH"))
        .and(path("/api/po/1/status"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut browser = ListBrowser::new(client);
    browser.refresh().await.unwrap();

    let result = browser.change_status(1, "手配済").await;
    assert!(result.is_err());
    // 失敗したら元のステータスへ戻る
    assert_eq!(browser.view().rows()[0].po.status, "手配前");
}

#[tokio::test]
async fn test_status_edit_applies_on_success() {
    let server = MockServer::start().await;
    mount_list(&server, json!([header(1, "PO-001", "手配前")])).await;
    mount_products(&server, 1, json!([])).await;
    Mock::given(method("PATCH"))
        .and(path("/api/po/1/status"))
        .and(body_json(json!({ "status": "手配済" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut browser = ListBrowser::new(client);
    browser.refresh().await.unwrap();

    browser.change_status(1, "手配済").await.unwrap();
    assert_eq!(browser.view().rows()[0].po.status, "手配済");
}

#[tokio::test]
async fn test_memo_edit_requires_success_flag() {
    let server = MockServer::start().await;
    mount_list(&server, json!([header(1, "PO-001", "手配前")])).await;
    mount_products(&server, 1, json!([])).await;
    Mock::given(method("PUT"))
        .and(path("/api/po/1/memo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": false })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut browser = ListBrowser::new(client);
    browser.refresh().await.unwrap();

    let result = browser.edit_memo(1, "至急確認").await;
    assert!(result.is_err());
    assert_eq!(browser.view().rows()[0].po.memo, "");
}

#[tokio::test]
async fn test_memo_edit_applies_on_success() {
    let server = MockServer::start().await;
    mount_list(&server, json!([header(1, "PO-001", "手配前")])).await;
    mount_products(&server, 1, json!([])).await;
    Mock::given(method("PUT"))
        .and(path("/api/po/1/memo"))
        .and(body_json(json!({ "memo": "至急確認" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut browser = ListBrowser::new(client);
    browser.refresh().await.unwrap();

    browser.edit_memo(1, "至急確認").await.unwrap();
    assert_eq!(browser.view().rows()[0].po.memo, "至急確認");
}

#[tokio::test]
async fn test_edit_unknown_id_fails_without_request() {
    let server = MockServer::start().await;
    mount_list(&server, json!([header(1, "PO-001", "手配前")])).await;
    mount_products(&server, 1, json!([])).await;

    let client = client_for(&server);
    let mut browser = ListBrowser::new(client);
    browser.refresh().await.unwrap();

    match browser.change_status(99, "手配済").await {
        Err(OrdersError::UnknownId(99)) => {}
        other => panic!("expected UnknownId, got {:?}", other),
    }
}

#[tokio::test]
async fn test_bulk_delete_reloads_list() {
    let server = MockServer::start().await;
    mount_products(&server, 1, json!([])).await;
    mount_products(&server, 2, json!([])).await;
    // 初回は2件、削除後の再取得では1件だけ返す
    Mock::given(method("GET"))
        .and(path("/api/po/list"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "po_list": [header(1, "PO-001", "手配前"), header(2, "PO-002", "手配中")]
            })),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/po/list"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "po_list": [header(1, "PO-001", "手配前")]
            })),
        )
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/po/delete"))
        .and(body_json(json!({ "ids": [2] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut browser = ListBrowser::new(client);
    browser.refresh().await.unwrap();
    browser.view_mut().toggle_select(2);

    let deleted = browser.delete_selected().await.unwrap();
    assert_eq!(deleted, 1);
    assert!(browser.view().rows().iter().all(|row| row.id() != 2));
    assert_eq!(browser.view().selected_count(), 0);
}

#[tokio::test]
async fn test_delete_without_selection_is_rejected() {
    let server = MockServer::start().await;
    mount_list(&server, json!([header(1, "PO-001", "手配前")])).await;
    mount_products(&server, 1, json!([])).await;

    let client = client_for(&server);
    let mut browser = ListBrowser::new(client);
    browser.refresh().await.unwrap();

    match browser.delete_selected().await {
        Err(OrdersError::ValidationError(message)) => {
            assert!(message.contains("選択"));
        }
        other => panic!("expected ValidationError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_browser_honors_configured_page_size() {
    let server = MockServer::start().await;
    mount_list(&server, json!([header(1, "PO-001", "手配前")])).await;
    let products: Vec<serde_json::Value> = (1..=12)
        .map(|n| {
            json!({
                "id": n,
                "po_id": 1,
                "product_name": format!("Item {}", n),
                "quantity": "1",
                "unit_price": "1",
                "subtotal": "1"
            })
        })
        .collect();
    mount_products(&server, 1, json!(products)).await;

    let session = SessionStore::new();
    session.init(Session {
        token: "test_token".to_string(),
        user: None,
    });
    let client = OrdersClient::new(
        &server.uri(),
        reqwest::Client::new(),
        session,
        OrdersOptions::default().with_page_size(3),
    );

    let mut browser = ListBrowser::new(client);
    browser.refresh().await.unwrap();

    assert_eq!(browser.view().rows().len(), 12);
    assert_eq!(browser.view().total_pages(), 4);
    assert_eq!(browser.view().current_rows().len(), 3);
}

#[tokio::test]
async fn test_requests_fail_without_session() {
    let server = MockServer::start().await;
    let client = OrdersClient::new(
        &server.uri(),
        reqwest::Client::new(),
        SessionStore::new(),
        OrdersOptions::default(),
    );

    assert!(matches!(client.list().await, Err(OrdersError::AuthError(_))));
}
