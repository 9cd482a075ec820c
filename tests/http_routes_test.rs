use actix_web::{ http::StatusCode, test, App };
use async_trait::async_trait;
use serde_json::{ json, Value as JsonValue };
use std::sync::Arc;

use tablecrud::db::StorageResult;
use tablecrud::models::TableDef;
use tablecrud::server::{ build_tables, configure_app, TablesConfig };
use tablecrud::{
    FieldValue,
    MemoryGateway,
    Paginated,
    PaginationParams,
    Record,
    StorageError,
    StorageGateway,
};

/// Gateway whose every call fails, standing in for an unreachable database
struct FailingGateway;

fn unreachable_db() -> StorageError {
    StorageError::Rejected("connection refused".to_string())
}

#[async_trait]
impl StorageGateway for FailingGateway {
    async fn select_paginated(
        &self,
        _table: &TableDef,
        _filter: &Record,
        _params: PaginationParams
    ) -> StorageResult<Paginated<Record>> {
        Err(unreachable_db())
    }

    async fn select_one(&self, _table: &TableDef, _filter: &Record) -> StorageResult<Option<Record>> {
        Err(unreachable_db())
    }

    async fn insert(&self, _table: &TableDef, _records: Vec<Record>) -> StorageResult<Vec<Record>> {
        Err(unreachable_db())
    }

    async fn update(
        &self,
        _table: &TableDef,
        _changes: Vec<(FieldValue, Record)>
    ) -> StorageResult<Vec<Record>> {
        Err(unreachable_db())
    }

    async fn delete(&self, _table: &TableDef, _filter: &Record) -> StorageResult<u64> {
        Err(unreachable_db())
    }
}

macro_rules! users_app {
    ($gateway:expr) => {
        {
            let gateway: Arc<dyn StorageGateway> = $gateway;
            let tables = build_tables(&TablesConfig::users_default(), gateway).unwrap();
            test::init_service(App::new().configure(move |cfg| configure_app(cfg, &tables))).await
        }
    };
}

#[actix_web::test]
async fn test_liveness_probe() {
    let app = users_app!(Arc::new(MemoryGateway::new()));

    let req = test::TestRequest::get().uri("/").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: JsonValue = test::read_body_json(resp).await;
    assert_eq!(body, json!({"message": "Server Running"}));
}

#[actix_web::test]
async fn test_users_crud_flow() {
    let app = users_app!(Arc::new(MemoryGateway::new()));

    let req = test::TestRequest::post()
        .uri("/api/v1/user/create")
        .set_json(json!({"data": [{"name": "Ann"}, {"name": "Bob", "email": "bob@example.com"}]}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: JsonValue = test::read_body_json(resp).await;
    assert_eq!(
        body,
        json!([
            {"id": 1, "name": "Ann", "email": null},
            {"id": 2, "name": "Bob", "email": "bob@example.com"}
        ])
    );

    let req = test::TestRequest::get().uri("/api/v1/user/all?perPage=1&currentPage=2").to_request();
    let body: JsonValue = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"], json!([{"id": 2, "name": "Bob", "email": "bob@example.com"}]));
    assert_eq!(body["pagination"]["total"], 2);
    assert_eq!(body["pagination"]["lastPage"], 2);
    assert_eq!(body["pagination"]["perPage"], 1);

    let req = test::TestRequest::post()
        .uri("/api/v1/user/getPaginated")
        .set_json(json!({"paginationParams": {"perPage": 5}}))
        .to_request();
    let body: JsonValue = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["pagination"]["currentPage"], 1);

    let req = test::TestRequest::get().uri("/api/v1/user/one?name=Ann").to_request();
    let body: JsonValue = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["id"], 1);

    let req = test::TestRequest::put()
        .uri("/api/v1/user/update")
        .set_json(json!({"data": {"id": 1, "email": "ann@example.com"}}))
        .to_request();
    let body: JsonValue = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!([{"id": 1, "name": "Ann", "email": "ann@example.com"}]));

    let req = test::TestRequest::post()
        .uri("/api/v1/user/getOne")
        .set_json(json!({"requestParams": {"email": "ann@example.com"}}))
        .to_request();
    let body: JsonValue = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["name"], "Ann");

    let req = test::TestRequest::delete().uri("/api/v1/user/delete?id=1").to_request();
    let body: JsonValue = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({"deleted": true, "outcome": "deleted"}));

    let req = test::TestRequest::delete().uri("/api/v1/user/delete?id=1").to_request();
    let body: JsonValue = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({"deleted": false, "outcome": "not_found"}));

    let req = test::TestRequest::post().uri("/api/v1/user/getAll").set_json(json!({})).to_request();
    let body: JsonValue = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["pagination"]["total"], 1);
}

#[actix_web::test]
async fn test_delete_with_bad_identifier_reports_failure() {
    let app = users_app!(Arc::new(MemoryGateway::new()));

    for uri in ["/api/v1/user/delete", "/api/v1/user/delete?id=abc"] {
        let req = test::TestRequest::delete().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: JsonValue = test::read_body_json(resp).await;
        assert_eq!(body, json!({"deleted": false, "outcome": "failed"}));
    }
}

#[actix_web::test]
async fn test_storage_failures_respond_500_except_delete() {
    let app = users_app!(Arc::new(FailingGateway));

    let requests = vec![
        test::TestRequest::get().uri("/api/v1/user/all").to_request(),
        test::TestRequest::get().uri("/api/v1/user/one?id=1").to_request(),
        test::TestRequest::post().uri("/api/v1/user/getAll").set_json(json!({})).to_request(),
        test::TestRequest::post()
            .uri("/api/v1/user/getOne")
            .set_json(json!({"requestParams": {"id": 1}}))
            .to_request(),
        test::TestRequest::post()
            .uri("/api/v1/user/create")
            .set_json(json!({"data": {"name": "Ann"}}))
            .to_request(),
        test::TestRequest::put()
            .uri("/api/v1/user/update")
            .set_json(json!({"data": {"id": 1, "name": "Ann"}}))
            .to_request()
    ];

    for req in requests {
        let path = req.uri().path().to_string();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR, "{}", path);
        let body: JsonValue = test::read_body_json(resp).await;
        assert_eq!(body, json!({"message": "connection refused"}), "{}", path);
    }

    let req = test::TestRequest::delete().uri("/api/v1/user/delete?id=1").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: JsonValue = test::read_body_json(resp).await;
    assert_eq!(body, json!({"deleted": false, "outcome": "failed"}));
}

#[actix_web::test]
async fn test_unknown_route_under_mount_is_404() {
    let app = users_app!(Arc::new(MemoryGateway::new()));

    let req = test::TestRequest::get().uri("/api/v1/user/everything").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
