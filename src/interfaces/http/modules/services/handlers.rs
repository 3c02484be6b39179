//! Service catalog REST API handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use super::dto::{ServiceListQuery, ServiceRequest, ServiceResponse};
use crate::interfaces::http::common::{domain_error, ApiError, ApiResponse, ApiResult, ValidatedJson};
use crate::interfaces::http::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/services",
    tag = "Services",
    params(ServiceListQuery),
    responses(
        (status = 200, description = "Service catalog", body = ApiResponse<Vec<ServiceResponse>>)
    )
)]
pub async fn list_services(
    State(state): State<AppState>,
    Query(query): Query<ServiceListQuery>,
) -> ApiResult<Vec<ServiceResponse>> {
    let services = state
        .ledger
        .catalog()
        .list(!query.include_inactive)
        .await
        .map_err(domain_error)?;
    Ok(Json(ApiResponse::success(
        services.into_iter().map(Into::into).collect(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/services/{id}",
    tag = "Services",
    params(("id" = i32, Path, description = "Service ID")),
    responses(
        (status = 200, description = "Service details", body = ApiResponse<ServiceResponse>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_service(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<ServiceResponse> {
    let service = state.ledger.catalog().get(id).await.map_err(domain_error)?;
    Ok(Json(ApiResponse::success(service.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/services",
    tag = "Admin",
    security(("bearer_auth" = [])),
    request_body = ServiceRequest,
    responses(
        (status = 201, description = "Created", body = ApiResponse<ServiceResponse>),
        (status = 422, description = "Invalid data")
    )
)]
pub async fn create_service(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<ServiceRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ServiceResponse>>), ApiError> {
    let created = state
        .ledger
        .catalog()
        .create(request.to_new_offering())
        .await
        .map_err(domain_error)?;
    info!(service_id = created.id, name = %created.name, "Service offering created");
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created.into()))))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/services/{id}",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Service ID")),
    request_body = ServiceRequest,
    responses(
        (status = 200, description = "Updated", body = ApiResponse<ServiceResponse>),
        (status = 404, description = "Not found"),
        (status = 422, description = "Invalid data")
    )
)]
pub async fn update_service(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ValidatedJson(request): ValidatedJson<ServiceRequest>,
) -> ApiResult<ServiceResponse> {
    let catalog = state.ledger.catalog();
    let mut updated = catalog
        .update(id, request.to_new_offering())
        .await
        .map_err(domain_error)?;
    if let Some(active) = request.is_active {
        if active != updated.is_active {
            updated = catalog.set_active(id, active).await.map_err(domain_error)?;
        }
    }
    Ok(Json(ApiResponse::success(updated.into())))
}
