use actix_web::{ error, web, HttpRequest, HttpResponse, Scope };
use serde::{ Deserialize, Serialize };
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;

use super::error::{ CrudResult, ErrorBody };
use super::instance::CrudInstance;
use crate::models::{ OneOrMany, PageRequest, Record, TableDef, Usage };

/// Query string of `GET /all`; values stay raw so bad numbers fall back to defaults
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub current_page: Option<String>,
    pub per_page: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedBody {
    #[serde(default)]
    pub pagination_params: Option<PageRequest>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterBody {
    #[serde(default)]
    pub request_params: Option<JsonValue>,
}

#[derive(Debug, Deserialize)]
pub struct DataBody {
    pub data: OneOrMany<JsonValue>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
    pub outcome: &'static str,
}

impl CrudInstance {
    /// HTTP routing table for this table, mounted under `path`
    pub fn scope(&self, path: &str) -> Scope {
        web::scope(path)
            .app_data(web::Data::new(self.clone()))
            .app_data(web::JsonConfig::default().error_handler(json_error))
            .app_data(web::QueryConfig::default().error_handler(query_error))
            .route("/all", web::get().to(list_all))
            .route("/one", web::get().to(get_one_by_query))
            .route("/getAll", web::post().to(get_paginated))
            .route("/getPaginated", web::post().to(get_paginated))
            .route("/getOne", web::post().to(get_one))
            .route("/create", web::post().to(create))
            .route("/update", web::put().to(update))
            .route("/delete", web::delete().to(delete))
    }
}

/// Extractor failures get the same `{message}` body as every other failure
fn bad_request<E: fmt::Debug + fmt::Display + 'static>(err: E) -> error::Error {
    let response = HttpResponse::BadRequest().json(ErrorBody { message: err.to_string() });
    error::InternalError::from_response(err, response).into()
}

fn json_error(err: error::JsonPayloadError, _req: &HttpRequest) -> error::Error {
    bad_request(err)
}

fn query_error(err: error::QueryPayloadError, _req: &HttpRequest) -> error::Error {
    bad_request(err)
}

/// Convert request body values into records of `table`
fn records_from_json(
    table: &TableDef,
    data: OneOrMany<JsonValue>,
    strip_identifier: bool
) -> CrudResult<Vec<Record>> {
    data.into_vec()
        .into_iter()
        .map(|mut value| -> CrudResult<Record> {
            if strip_identifier {
                if let Some(object) = value.as_object_mut() {
                    object.remove(table.identifier());
                }
            }
            Ok(table.schema().record_from_json(&value, Usage::Write)?)
        })
        .collect()
}

fn record_or_empty(record: Option<Record>) -> HttpResponse {
    match record {
        Some(record) => HttpResponse::Ok().json(record),
        None => HttpResponse::Ok().finish(),
    }
}

async fn list_all(
    instance: web::Data<CrudInstance>,
    query: web::Query<PageQuery>
) -> CrudResult<HttpResponse> {
    let request = PageRequest::from_query(query.current_page.as_deref(), query.per_page.as_deref());
    let page = instance.list(request).await?;
    Ok(HttpResponse::Ok().json(page))
}

async fn get_one_by_query(
    instance: web::Data<CrudInstance>,
    query: web::Query<HashMap<String, String>>
) -> CrudResult<HttpResponse> {
    let filter = instance.table().schema().record_from_text(&query)?;
    let record = instance.get_data(filter).await?;
    Ok(record_or_empty(record))
}

async fn get_paginated(
    instance: web::Data<CrudInstance>,
    body: web::Json<PaginatedBody>
) -> CrudResult<HttpResponse> {
    let request = body.into_inner().pagination_params.unwrap_or_default();
    let page = instance.list(request).await?;
    Ok(HttpResponse::Ok().json(page))
}

async fn get_one(
    instance: web::Data<CrudInstance>,
    body: web::Json<FilterBody>
) -> CrudResult<HttpResponse> {
    let filter = match body.into_inner().request_params {
        Some(params) => instance.table().schema().record_from_json(&params, Usage::Filter)?,
        None => Record::new(),
    };
    let record = instance.get_data(filter).await?;
    Ok(record_or_empty(record))
}

async fn create(
    instance: web::Data<CrudInstance>,
    body: web::Json<DataBody>
) -> CrudResult<HttpResponse> {
    let records = records_from_json(instance.table(), body.into_inner().data, true)?;
    let inserted = instance.add_data(records).await?;
    Ok(HttpResponse::Created().json(inserted))
}

async fn update(
    instance: web::Data<CrudInstance>,
    body: web::Json<DataBody>
) -> CrudResult<HttpResponse> {
    let records = records_from_json(instance.table(), body.into_inner().data, false)?;
    let updated = instance.update_data(records).await?;
    Ok(HttpResponse::Ok().json(updated))
}

/// Always answers 200; the outcome says whether anything was removed
async fn delete(
    instance: web::Data<CrudInstance>,
    query: web::Query<HashMap<String, String>>
) -> HttpResponse {
    let raw = query.get(instance.table().identifier()).map(String::as_str);
    let outcome = instance.delete_by_text(raw).await;
    HttpResponse::Ok().json(DeleteResponse {
        deleted: outcome.is_deleted(),
        outcome: outcome.label(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crud::TableDescriptor;
    use crate::db::{ MockStorageGateway, StorageError };
    use crate::models::{ ColumnDef, ColumnKind, FieldValue, Paginated, PaginationParams, TableSchema };
    use actix_web::{ http::StatusCode, test, App };
    use serde_json::json;
    use std::sync::Arc;

    fn users(gateway: MockStorageGateway) -> CrudInstance {
        let descriptor = TableDescriptor::new(
            "Users",
            "id",
            TableSchema::new(
                vec![ColumnDef::new("id", ColumnKind::Integer), ColumnDef::new("name", ColumnKind::Text)]
            )
        );
        CrudInstance::new(descriptor, Arc::new(gateway)).unwrap()
    }

    #[actix_web::test]
    async fn test_create_responds_201_with_inserted_rows() {
        let mut gateway = MockStorageGateway::new();
        gateway
            .expect_insert()
            .withf(|_, records| records == &vec![Record::new().with("name", "Ann")])
            .returning(|_, _| Ok(vec![Record::new().with("id", 1i64).with("name", "Ann")]));

        let app = test::init_service(App::new().service(users(gateway).scope("/api/v1/user"))).await;
        let req = test::TestRequest::post()
            .uri("/api/v1/user/create")
            .set_json(json!({"data": {"id": "ignored", "name": "Ann"}}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: JsonValue = test::read_body_json(resp).await;
        assert_eq!(body, json!([{"id": 1, "name": "Ann"}]));
    }

    #[actix_web::test]
    async fn test_storage_failure_responds_500_with_message() {
        let mut gateway = MockStorageGateway::new();
        gateway
            .expect_select_paginated()
            .returning(|_, _, _| Err(StorageError::Rejected("relation \"Users\" does not exist".to_string())));

        let app = test::init_service(App::new().service(users(gateway).scope("/users"))).await;
        let req = test::TestRequest::get().uri("/users/all?currentPage=2").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: JsonValue = test::read_body_json(resp).await;
        assert_eq!(body, json!({"message": "relation \"Users\" does not exist"}));
    }

    #[actix_web::test]
    async fn test_get_all_query_strings_are_parsed() {
        let mut gateway = MockStorageGateway::new();
        gateway
            .expect_select_paginated()
            .withf(|_, _, params| *params == PaginationParams { current_page: 2, per_page: 10 })
            .returning(|_, _, params| Ok(Paginated::new(Vec::new(), params, 3)));

        let app = test::init_service(App::new().service(users(gateway).scope("/users"))).await;
        let req = test::TestRequest::get().uri("/users/all?currentPage=2&perPage=abc").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body: JsonValue = test::read_body_json(resp).await;
        assert_eq!(body["pagination"]["currentPage"], 2);
        assert_eq!(body["pagination"]["total"], 3);
    }

    #[actix_web::test]
    async fn test_get_one_without_match_responds_200_with_empty_body() {
        let mut gateway = MockStorageGateway::new();
        gateway
            .expect_select_one()
            .withf(|_, filter| filter == &Record::new().with("name", "Ann"))
            .returning(|_, _| Ok(None));

        let app = test::init_service(App::new().service(users(gateway).scope("/users"))).await;
        let req = test::TestRequest::post()
            .uri("/users/getOne")
            .set_json(json!({"requestParams": {"name": "Ann"}}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert!(test::read_body(resp).await.is_empty());
    }

    #[actix_web::test]
    async fn test_delete_failure_responds_200_not_deleted() {
        let mut gateway = MockStorageGateway::new();
        gateway
            .expect_delete()
            .withf(|_, filter| filter.get("id") == Some(&FieldValue::Integer(1)))
            .returning(|_, _| Err(StorageError::Rejected("connection reset".to_string())));

        let app = test::init_service(App::new().service(users(gateway).scope("/users"))).await;
        let req = test::TestRequest::delete().uri("/users/delete?id=1").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body: JsonValue = test::read_body_json(resp).await;
        assert_eq!(body, json!({"deleted": false, "outcome": "failed"}));
    }

    #[actix_web::test]
    async fn test_invalid_input_responds_400_with_message() {
        let app = test::init_service(
            App::new().service(users(MockStorageGateway::new()).scope("/users"))
        ).await;

        let req = test::TestRequest::put()
            .uri("/users/update")
            .set_json(json!({"data": [{"id": 1, "nickname": "A"}]}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: JsonValue = test::read_body_json(resp).await;
        assert_eq!(body, json!({"message": "unknown column: nickname"}));

        let req = test::TestRequest::post()
            .uri("/users/create")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: JsonValue = test::read_body_json(resp).await;
        assert!(body["message"].is_string());
    }
}
