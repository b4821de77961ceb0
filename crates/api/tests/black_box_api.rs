use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};

use storefront_api::app::errors::GENERIC_ERROR_MESSAGE;
use storefront_api::app::SharedStore;
use storefront_catalog::{
    Category, CategoryDetail, CategoryName, NewProduct, ProductChanges, ProductDetail,
    ProductUpdateOutcome, Tag, TagDetail, TagName,
};
use storefront_core::{CategoryId, ProductId, TagId};
use storefront_infra::{CatalogStore, InMemoryCatalogStore, StoreError, StoreResult};

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(Arc::new(InMemoryCatalogStore::new())).await
    }

    async fn spawn_with(store: SharedStore) -> Self {
        // Same router as prod, bound to an ephemeral port.
        let app = storefront_api::app::build_app(store);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Store whose backend is unreachable: every call fails with `Backend`.
struct UnreachableStore;

fn backend_down<T>() -> StoreResult<T> {
    Err(StoreError::Backend("connection refused to 10.0.0.5:5432".to_string()))
}

#[async_trait]
impl CatalogStore for UnreachableStore {
    async fn list_products(&self) -> StoreResult<Vec<ProductDetail>> {
        backend_down()
    }

    async fn get_product(&self, _id: ProductId) -> StoreResult<Option<ProductDetail>> {
        backend_down()
    }

    async fn create_product(&self, _input: NewProduct) -> StoreResult<ProductDetail> {
        backend_down()
    }

    async fn update_product(
        &self,
        _id: ProductId,
        _changes: ProductChanges,
    ) -> StoreResult<ProductUpdateOutcome> {
        backend_down()
    }

    async fn delete_product(&self, _id: ProductId) -> StoreResult<u64> {
        backend_down()
    }

    async fn list_categories(&self) -> StoreResult<Vec<CategoryDetail>> {
        backend_down()
    }

    async fn get_category(&self, _id: CategoryId) -> StoreResult<Option<CategoryDetail>> {
        backend_down()
    }

    async fn create_category(&self, _name: CategoryName) -> StoreResult<Category> {
        backend_down()
    }

    async fn update_category(&self, _id: CategoryId, _name: CategoryName) -> StoreResult<u64> {
        backend_down()
    }

    async fn delete_category(&self, _id: CategoryId) -> StoreResult<u64> {
        backend_down()
    }

    async fn list_tags(&self) -> StoreResult<Vec<TagDetail>> {
        backend_down()
    }

    async fn get_tag(&self, _id: TagId) -> StoreResult<Option<TagDetail>> {
        backend_down()
    }

    async fn create_tag(&self, _name: TagName) -> StoreResult<Tag> {
        backend_down()
    }

    async fn update_tag(&self, _id: TagId, _name: TagName) -> StoreResult<u64> {
        backend_down()
    }

    async fn delete_tag(&self, _id: TagId) -> StoreResult<u64> {
        backend_down()
    }
}

async fn post_json(client: &reqwest::Client, url: String, body: Value) -> (StatusCode, Value) {
    let res = client.post(url).json(&body).send().await.unwrap();
    let status = res.status();
    (status, res.json().await.unwrap())
}

async fn put_json(client: &reqwest::Client, url: String, body: Value) -> (StatusCode, Value) {
    let res = client.put(url).json(&body).send().await.unwrap();
    let status = res.status();
    (status, res.json().await.unwrap())
}

async fn get_json(client: &reqwest::Client, url: String) -> (StatusCode, Value) {
    let res = client.get(url).send().await.unwrap();
    let status = res.status();
    (status, res.json().await.unwrap())
}

/// Seed one category and the given tag names; returns (category id, tag ids).
async fn seed(client: &reqwest::Client, srv: &TestServer, tags: &[&str]) -> (i64, Vec<i64>) {
    let (status, category) = post_json(
        client,
        srv.url("/api/categories"),
        json!({ "category_name": "Shorts" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let mut tag_ids = Vec::new();
    for name in tags {
        let (status, tag) =
            post_json(client, srv.url("/api/tags"), json!({ "tag_name": name })).await;
        assert_eq!(status, StatusCode::OK);
        tag_ids.push(tag["id"].as_i64().unwrap());
    }

    (category["id"].as_i64().unwrap(), tag_ids)
}

fn tag_ids_of(product: &Value) -> Vec<i64> {
    let mut ids: Vec<i64> = product["tags"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_i64().unwrap())
        .collect();
    ids.sort();
    ids
}

#[tokio::test]
async fn health_is_ok_and_requests_get_an_id() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn create_product_with_category_and_tags() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (category_id, tags) = seed(&client, &srv, &["rock music", "pop music", "blue"]).await;

    let (status, created) = post_json(
        &client,
        srv.url("/api/products"),
        json!({
            "product_name": "Basketball",
            "price": 200.0,
            "stock": 3,
            "category_id": category_id,
            "tagIds": [tags[0], tags[2]]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = created["id"].as_i64().unwrap();

    let (status, fetched) = get_json(&client, srv.url(&format!("/api/products/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["product_name"], "Basketball");
    assert_eq!(fetched["stock"], 3);
    assert_eq!(fetched["category"]["category_name"], "Shorts");
    assert_eq!(tag_ids_of(&fetched), vec![tags[0], tags[2]]);

    let (_, category) =
        get_json(&client, srv.url(&format!("/api/categories/{category_id}"))).await;
    assert_eq!(category["products"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn empty_tag_list_creates_no_associations_and_stock_defaults() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (status, created) = post_json(
        &client,
        srv.url("/api/products"),
        json!({ "product_name": "Plain Cap", "price": 9.99, "tagIds": [] }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["stock"], 10);
    assert!(created["tags"].as_array().unwrap().is_empty());
    assert!(created["category"].is_null());
}

#[tokio::test]
async fn update_reconciles_tags_and_reports_the_diff() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (_, tags) = seed(&client, &srv, &["a", "b", "c", "d"]).await;

    let (_, created) = post_json(
        &client,
        srv.url("/api/products"),
        json!({ "product_name": "Vinyl", "price": 12.0, "tagIds": [tags[0], tags[1], tags[2]] }),
    )
    .await;
    let id = created["id"].as_i64().unwrap();

    let (status, outcome) = put_json(
        &client,
        srv.url(&format!("/api/products/{id}")),
        json!({ "price": 14.5, "tagIds": [tags[1], tags[2], tags[3]] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let created_tags: Vec<i64> = outcome["created"]
        .as_array()
        .unwrap()
        .iter()
        .map(|pt| pt["tag_id"].as_i64().unwrap())
        .collect();
    let removed_tags: Vec<i64> = outcome["removed"]
        .as_array()
        .unwrap()
        .iter()
        .map(|pt| pt["tag_id"].as_i64().unwrap())
        .collect();
    assert_eq!(created_tags, vec![tags[3]]);
    assert_eq!(removed_tags, vec![tags[0]]);

    let (_, fetched) = get_json(&client, srv.url(&format!("/api/products/{id}"))).await;
    assert_eq!(fetched["price"], 14.5);
    assert_eq!(tag_ids_of(&fetched), vec![tags[1], tags[2], tags[3]]);

    // Same desired set again is a no-op.
    let (status, outcome) = put_json(
        &client,
        srv.url(&format!("/api/products/{id}")),
        json!({ "tagIds": [tags[3], tags[2], tags[1]] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(outcome["created"].as_array().unwrap().is_empty());
    assert!(outcome["removed"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn failed_update_leaves_product_unchanged() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (_, tags) = seed(&client, &srv, &["a"]).await;

    let (_, created) = post_json(
        &client,
        srv.url("/api/products"),
        json!({ "product_name": "Lamp", "price": 30.0, "tagIds": [tags[0]] }),
    )
    .await;
    let id = created["id"].as_i64().unwrap();

    let (status, body) = put_json(
        &client,
        srv.url(&format!("/api/products/{id}")),
        json!({ "product_name": "Renamed", "tagIds": [tags[0], 9999] }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());

    let (_, fetched) = get_json(&client, srv.url(&format!("/api/products/{id}"))).await;
    assert_eq!(fetched["product_name"], "Lamp");
    assert_eq!(tag_ids_of(&fetched), vec![tags[0]]);
}

#[tokio::test]
async fn update_of_missing_product_is_not_found() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (status, _) = put_json(
        &client,
        srv.url("/api/products/4242"),
        json!({ "price": 1.0 }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_reports_row_count() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (_, created) = post_json(
        &client,
        srv.url("/api/products"),
        json!({ "product_name": "Mug", "price": 4.0 }),
    )
    .await;
    let id = created["id"].as_i64().unwrap();

    let res = client
        .delete(srv.url(&format!("/api/products/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<u64>().await.unwrap(), 1);

    let res = client
        .delete(srv.url(&format!("/api/products/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<u64>().await.unwrap(), 0);
}

#[tokio::test]
async fn lookups_distinguish_missing_from_malformed() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (status, body) = get_json(&client, srv.url("/api/products/77")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, body) = get_json(&client, srv.url("/api/tags/abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_id");
}

#[tokio::test]
async fn invalid_bodies_are_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (status, _) = post_json(&client, srv.url("/api/products"), json!({ "price": 3.0 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = post_json(
        &client,
        srv.url("/api/products"),
        json!({ "product_name": "Bad", "price": -1.0 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, _) = post_json(
        &client,
        srv.url("/api/categories"),
        json!({ "category_name": "" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deleting_a_category_detaches_its_products() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (category_id, _) = seed(&client, &srv, &[]).await;

    let (_, created) = post_json(
        &client,
        srv.url("/api/products"),
        json!({ "product_name": "Cargo Shorts", "price": 29.99, "category_id": category_id }),
    )
    .await;
    let id = created["id"].as_i64().unwrap();

    let res = client
        .delete(srv.url(&format!("/api/categories/{category_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.json::<u64>().await.unwrap(), 1);

    let (status, fetched) = get_json(&client, srv.url(&format!("/api/products/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(fetched["category_id"].is_null());
    assert!(fetched["category"].is_null());
}

#[tokio::test]
async fn renaming_a_tag_reports_updated_rows() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (_, tags) = seed(&client, &srv, &["old"]).await;

    let (status, body) = put_json(
        &client,
        srv.url(&format!("/api/tags/{}", tags[0])),
        json!({ "tag_name": "new" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "updated": 1 }));

    let (_, tag) = get_json(&client, srv.url(&format!("/api/tags/{}", tags[0]))).await;
    assert_eq!(tag["tag_name"], "new");
    assert!(tag["products"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_tag_on_create_persists_nothing() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (status, body) = post_json(
        &client,
        srv.url("/api/products"),
        json!({ "product_name": "Ghost", "price": 5.0, "tagIds": [9999] }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "constraint_violation");

    let (status, products) = get_json(&client, srv.url("/api/products")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(products, json!([]));
}

#[tokio::test]
async fn backend_failure_on_read_is_a_generic_500() {
    let srv = TestServer::spawn_with(Arc::new(UnreachableStore)).await;
    let client = reqwest::Client::new();

    let (status, body) = get_json(&client, srv.url("/api/products")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], GENERIC_ERROR_MESSAGE);
    assert!(!body.to_string().contains("10.0.0.5"));
}

#[tokio::test]
async fn backend_failure_on_write_is_a_400_with_the_backend_message() {
    let srv = TestServer::spawn_with(Arc::new(UnreachableStore)).await;
    let client = reqwest::Client::new();

    let (status, body) = post_json(
        &client,
        srv.url("/api/products"),
        json!({ "product_name": "Mug", "price": 4.0 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "database_error");
    assert!(body["message"].as_str().unwrap().contains("connection refused"));
}

#[tokio::test]
async fn backend_failure_on_delete_is_a_generic_500() {
    let srv = TestServer::spawn_with(Arc::new(UnreachableStore)).await;
    let client = reqwest::Client::new();

    for path in ["/api/products/1", "/api/categories/1", "/api/tags/1"] {
        let res = client.delete(srv.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR, "{path}");
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["message"], GENERIC_ERROR_MESSAGE);
    }
}
