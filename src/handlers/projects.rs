// src/handlers/projects.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    models::{
        company::AvailableCompany,
        project::{FinishTransition, NewProject, Project, ProjectTimeline},
    },
    services::{
        matching::{MatchReport, MatchRequest},
        requests::CompanySearchQuery,
    },
};

// =============================================================================
//  CICLO DE VIDA
// =============================================================================

// POST /api/projects
#[utoipa::path(
    post,
    path = "/api/projects",
    tag = "Projects",
    request_body = NewProject,
    responses(
        (status = 201, description = "Projeto criado", body = Project),
        (status = 400, description = "Dados inválidos")
    )
)]
pub async fn create_project(
    State(app_state): State<AppState>,
    Json(payload): Json<NewProject>,
) -> Result<impl IntoResponse, AppError> {
    let project = app_state.project_service.create_project(payload).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

// POST /api/projects/{id}/moderate
#[utoipa::path(
    post,
    path = "/api/projects/{id}/moderate",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "ID do projeto")),
    responses(
        (status = 200, description = "Projeto moderado e oferecido às empresas", body = MatchReport),
        (status = 404, description = "Projeto não encontrado"),
        (status = 409, description = "Projeto fora do estado esperado")
    )
)]
pub async fn moderate_project(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchReport>, AppError> {
    let report = app_state.project_service.mark_as_moderated(id).await?;
    Ok(Json(report))
}

// POST /api/projects/{id}/start
#[utoipa::path(
    post,
    path = "/api/projects/{id}/start",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "ID do projeto")),
    responses(
        (status = 200, description = "Projeto ativo", body = Project),
        (status = 409, description = "Projeto fora do estado esperado")
    )
)]
pub async fn start_project(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Project>, AppError> {
    let project = app_state.project_service.start_project(id).await?;
    Ok(Json(project))
}

// GET /api/projects/{id}/timeline
#[utoipa::path(
    get,
    path = "/api/projects/{id}/timeline",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "ID do projeto")),
    responses(
        (status = 200, description = "Linha do tempo do projeto", body = ProjectTimeline),
        (status = 404, description = "Projeto não encontrado")
    )
)]
pub async fn get_timeline(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProjectTimeline>, AppError> {
    let timeline = app_state.project_service.timeline(id).await?;
    Ok(Json(timeline))
}

// =============================================================================
//  MATCHING
// =============================================================================

// POST /api/projects/{id}/match
#[utoipa::path(
    post,
    path = "/api/projects/{id}/match",
    tag = "Matching",
    request_body = MatchRequest,
    params(("id" = Uuid, Path, description = "ID do projeto")),
    responses(
        (status = 200, description = "Resultado do match", body = MatchReport),
        (status = 400, description = "Projeto sem categoria"),
        (status = 404, description = "Projeto ou empresa não encontrado")
    )
)]
pub async fn match_project(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<MatchRequest>,
) -> Result<Json<MatchReport>, AppError> {
    let report = app_state.match_service.match_project(id, request).await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DirectedSendPayload {
    #[validate(length(min = 1, message = "Informe ao menos uma empresa"))]
    pub company_ids: Vec<Uuid>,
    #[serde(default)]
    pub notify_only_opted_in: Option<bool>,
}

// POST /api/projects/{id}/send
#[utoipa::path(
    post,
    path = "/api/projects/{id}/send",
    tag = "Matching",
    request_body = DirectedSendPayload,
    params(("id" = Uuid, Path, description = "ID do projeto")),
    responses(
        (status = 200, description = "Envio direcionado concluído", body = MatchReport),
        (status = 404, description = "Projeto ou empresa não encontrado")
    )
)]
pub async fn send_to_companies(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DirectedSendPayload>,
) -> Result<Json<MatchReport>, AppError> {
    payload.validate()?;

    let mut request = MatchRequest::directed(payload.company_ids);
    if let Some(only_opted_in) = payload.notify_only_opted_in {
        request.notify_only_opted_in = only_opted_in;
    }

    let report = app_state.match_service.match_project(id, request).await?;
    Ok(Json(report))
}

// GET /api/projects/{id}/companies
#[utoipa::path(
    get,
    path = "/api/projects/{id}/companies",
    tag = "Matching",
    params(
        ("id" = Uuid, Path, description = "ID do projeto"),
        CompanySearchQuery
    ),
    responses(
        (status = 200, description = "Empresas disponíveis para o projeto", body = Vec<AvailableCompany>),
        (status = 400, description = "Projeto sem categoria"),
        (status = 404, description = "Projeto não encontrado")
    )
)]
pub async fn list_available_companies(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<CompanySearchQuery>,
) -> Result<Json<Vec<AvailableCompany>>, AppError> {
    let companies = app_state
        .request_service
        .available_companies(id, query)
        .await?;
    Ok(Json(companies))
}

// =============================================================================
//  CONFIRMAÇÃO DE FIM
// =============================================================================

// POST /api/projects/{id}/finish/company
#[utoipa::path(
    post,
    path = "/api/projects/{id}/finish/company",
    tag = "Finish",
    params(("id" = Uuid, Path, description = "ID do projeto")),
    responses(
        (status = 200, description = "Confirmação da empresa registrada", body = FinishTransition),
        (status = 404, description = "Projeto não encontrado"),
        (status = 409, description = "Projeto não está ativo")
    )
)]
pub async fn finish_by_company(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FinishTransition>, AppError> {
    let transition = app_state.finish_service.confirm_finish_by_company(id).await?;
    Ok(Json(transition))
}

// POST /api/projects/{id}/finish/customer
#[utoipa::path(
    post,
    path = "/api/projects/{id}/finish/customer",
    tag = "Finish",
    params(("id" = Uuid, Path, description = "ID do projeto")),
    responses(
        (status = 200, description = "Confirmação do cliente registrada", body = FinishTransition),
        (status = 404, description = "Projeto não encontrado"),
        (status = 409, description = "Projeto não está ativo")
    )
)]
pub async fn finish_by_customer(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FinishTransition>, AppError> {
    let transition = app_state.finish_service.confirm_finish_by_customer(id).await?;
    Ok(Json(transition))
}
