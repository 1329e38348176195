// src/docs.rs

use utoipa::OpenApi;

use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Projects ---
        handlers::projects::create_project,
        handlers::projects::moderate_project,
        handlers::projects::start_project,
        handlers::projects::get_timeline,

        // --- Matching ---
        handlers::projects::match_project,
        handlers::projects::send_to_companies,
        handlers::projects::list_available_companies,

        // --- Finish ---
        handlers::projects::finish_by_company,
        handlers::projects::finish_by_customer,

        // --- Companies ---
        handlers::companies::list_requests,
        handlers::companies::show_interest,
    ),
    components(
        schemas(
            // --- Projects ---
            models::project::ProjectProgress,
            models::project::ProjectStatus,
            models::project::DesiredStartDate,
            models::project::Project,
            models::project::NewProject,
            models::project::ProjectTimeline,
            models::quote::QuoteTimes,

            // --- Finish ---
            models::project::FinishSide,
            models::project::FinishState,
            models::project::FinishOutcome,
            models::project::FinishTransition,

            // --- Matching ---
            services::interest::InterestMode,
            services::matching::MatchRequest,
            services::matching::MatchReport,
            models::notification::FanOutReport,
            models::notification::DispatchFailure,
            models::company::AvailableCompany,
            models::company::QuoteFlags,
            handlers::projects::DirectedSendPayload,
        )
    ),
    tags(
        (name = "Projects", description = "Ciclo de vida do projeto"),
        (name = "Matching", description = "Elegibilidade e oferta de projetos às empresas"),
        (name = "Finish", description = "Confirmação de fim pelos dois lados"),
        (name = "Companies", description = "Feed de pedidos e interesse das empresas")
    )
)]
pub struct ApiDoc;
