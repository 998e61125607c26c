use anyhow::Result;
use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Method, Request},
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{debug_span, info, Span};
use ulid::Ulid;
use utoipa::OpenApi;

pub mod config;
pub mod session;
pub mod users;

mod handlers;

use config::ServiceConfig;
use session::SessionStore;
use users::UserDirectory;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::authenticate::authenticate,
        handlers::pin_entry::pin_entry,
        handlers::pin_entry::pin_submit,
    ),
    components(
        schemas(
            handlers::health::Health,
            handlers::authenticate::AuthenticateRequest,
            handlers::authenticate::AuthEvent,
            handlers::authenticate::Tenant,
            handlers::authenticate::Organization,
        )
    ),
    tags(
        (name = "health", description = "Service health"),
        (name = "flow", description = "PIN based authentication flow API"),
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Everything the handlers share: static configuration, the flow session
/// store, and the user database loaded at startup.
#[derive(Debug)]
pub struct AppState {
    pub config: ServiceConfig,
    pub sessions: SessionStore,
    pub users: UserDirectory,
}

/// router
/// # Errors
/// Returns an error if the server fails to start
pub async fn new(port: u16, state: AppState) -> Result<()> {
    let state = Arc::new(state);

    let cors = CorsLayer::new()
        // allow `GET` and `POST` when accessing the resource
        .allow_methods([Method::GET, Method::POST])
        // allow requests from any origin
        .allow_origin(Any);

    let app = Router::new()
        .route("/api/authenticate", post(handlers::authenticate))
        .route("/api/pin-entry", get(handlers::pin_entry))
        .route("/api/pin-submit", post(handlers::pin_submit))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(state.clone())),
        )
        .route(
            "/api/health",
            get(handlers::health).options(handlers::health),
        )
        .layer(Extension(state));

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

// span
fn make_span(request: &Request<Body>) -> Span {
    let headers = request.headers();
    let path = request.uri().path();
    let request_id = headers
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http-request", path, ?headers, request_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_documents_the_flow_surface() {
        let doc = openapi();
        let paths = &doc.paths.paths;

        for path in [
            "/api/health",
            "/api/authenticate",
            "/api/pin-entry",
            "/api/pin-submit",
        ] {
            assert!(paths.contains_key(path), "missing path {path}");
        }
    }
}
