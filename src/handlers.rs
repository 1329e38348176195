pub mod companies;
pub mod projects;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::config::AppState;

pub fn router(app_state: AppState) -> Router {
    let project_routes = Router::new()
        .route("/", post(projects::create_project))
        .route("/{id}/moderate", post(projects::moderate_project))
        .route("/{id}/start", post(projects::start_project))
        .route("/{id}/timeline", get(projects::get_timeline))
        .route("/{id}/match", post(projects::match_project))
        .route("/{id}/send", post(projects::send_to_companies))
        .route("/{id}/companies", get(projects::list_available_companies))
        .route("/{id}/finish/company", post(projects::finish_by_company))
        .route("/{id}/finish/customer", post(projects::finish_by_customer));

    let company_routes = Router::new()
        .route("/{id}/requests", get(companies::list_requests))
        .route("/{id}/interests/{project_id}", put(companies::show_interest));

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/projects", project_routes)
        .nest("/api/companies", company_routes)
        .with_state(app_state)
}
