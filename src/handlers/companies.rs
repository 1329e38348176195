// src/handlers/companies.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    models::project::Project,
    services::requests::RequestFeedQuery,
};

// GET /api/companies/{id}/requests
#[utoipa::path(
    get,
    path = "/api/companies/{id}/requests",
    tag = "Companies",
    params(
        ("id" = Uuid, Path, description = "ID da empresa"),
        RequestFeedQuery
    ),
    responses(
        (status = 200, description = "Projetos visíveis para a empresa", body = Vec<Project>),
        (status = 400, description = "Empresa sem categoria"),
        (status = 404, description = "Empresa não encontrada")
    )
)]
pub async fn list_requests(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<RequestFeedQuery>,
) -> Result<Json<Vec<Project>>, AppError> {
    let projects = app_state
        .request_service
        .company_requests(id, query)
        .await?;
    Ok(Json(projects))
}

// PUT /api/companies/{id}/interests/{project_id}
#[utoipa::path(
    put,
    path = "/api/companies/{id}/interests/{project_id}",
    tag = "Companies",
    params(
        ("id" = Uuid, Path, description = "ID da empresa"),
        ("project_id" = Uuid, Path, description = "ID do projeto")
    ),
    responses(
        (status = 201, description = "Interesse registrado"),
        (status = 204, description = "Interesse já estava registrado"),
        (status = 404, description = "Projeto ou empresa não encontrado")
    )
)]
pub async fn show_interest(
    State(app_state): State<AppState>,
    Path((company_id, project_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    let added = app_state
        .request_service
        .show_interest(project_id, company_id)
        .await?;

    Ok(if added {
        StatusCode::CREATED
    } else {
        StatusCode::NO_CONTENT
    })
}
