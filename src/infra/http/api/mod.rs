pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod state;

pub use state::ApiState;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, post, put},
};

use crate::cache::{CachedRoute, ReadThroughState, read_through};
use crate::infra::http::RouterState;

/// Routes mounted under `/api`.
pub fn build_api_router(state: RouterState) -> Router<RouterState> {
    let api = state.api.clone();

    let list_cache = ReadThroughState::new(api.cache.clone(), CachedRoute::JOB_LIST);
    let detail_cache = ReadThroughState::new(api.cache.clone(), CachedRoute::JOB_DETAIL);

    let public = Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
        .route(
            "/job-get",
            get(handlers::list_jobs).route_layer(axum_middleware::from_fn_with_state(
                list_cache,
                read_through,
            )),
        )
        .route(
            "/job-get/{id}",
            get(handlers::get_job).route_layer(axum_middleware::from_fn_with_state(
                detail_cache,
                read_through,
            )),
        );

    let authenticated = Router::new()
        .route("/logout", post(handlers::logout))
        .route("/job-create", post(handlers::create_job))
        .route("/update-job", put(handlers::update_job_by_query))
        .route("/update-job/{id}", put(handlers::update_job))
        .route("/delete-job", delete(handlers::delete_job_by_query))
        .route("/delete-job/{id}", delete(handlers::delete_job))
        .route(
            "/upload",
            post(handlers::upload_resume).layer(DefaultBodyLimit::max(api.max_upload_bytes)),
        )
        .route("/delete/{id}", delete(handlers::delete_resume))
        .route_layer(axum_middleware::from_fn_with_state(
            api,
            middleware::require_auth,
        ));

    Router::new().nest("/api", public.merge(authenticated))
}
