//! The authenticate callback: create-or-resolve a flow.
//!
//! The identity platform calls this endpoint twice per flow. The first call
//! registers the flow and answers `INCOMPLETE` with a redirect to the
//! PIN-entry page; the follow-up call reports `SUCCESS` or `FAILED` depending
//! on what the PIN submission did to the flow in between.

use crate::api::{
    config::AuthMode,
    session::{FlowStatus, RegisterOutcome, SessionRecord},
    AppState,
};
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticateRequest {
    /// Opaque identifier correlating the attempt across requests.
    #[serde(default)]
    pub flow_id: String,
    #[serde(default)]
    pub event: AuthEvent,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AuthEvent {
    #[serde(default)]
    pub tenant: Tenant,
    pub organization: Option<Organization>,
    /// Only consulted in `second_factor` mode, where the platform already
    /// knows who is authenticating.
    #[schema(value_type = Object)]
    pub user: Option<Value>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct Tenant {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct Organization {
    pub id: String,
}

#[utoipa::path(
    post,
    path= "/api/authenticate",
    request_body = AuthenticateRequest,
    responses (
        (status = 200, description = "INCOMPLETE with a redirect on first call, SUCCESS or FAILED afterwards", content_type = "application/json"),
        (status = 400, description = "Missing flowId"),
    ),
    tag = "flow",
)]
#[instrument(skip(state, payload))]
pub async fn authenticate(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<AuthenticateRequest>,
) -> impl IntoResponse {
    if payload.flow_id.is_empty() {
        warn!("authenticate called without a flowId");

        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "actionStatus": "ERROR",
                "errorMessage": "missingFlowId",
                "errorDescription": "Flow ID is required.",
            })),
        );
    }

    let flow_id = payload.flow_id;
    let event = payload.event;

    // The inbound user is only trusted as a second factor hint.
    let user = if state.config.auth_mode == AuthMode::SecondFactor {
        event.user
    } else {
        None
    };

    let record = SessionRecord::new(
        event.tenant.name,
        event.organization.map(|organization| organization.id),
        user,
    );

    match state.sessions.register(&flow_id, record).await {
        RegisterOutcome::Created => {
            let url = match state.config.pin_entry_url(&flow_id) {
                Ok(url) => url,
                Err(err) => {
                    error!("Failed to build PIN-entry URL: {err:#}");

                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({
                            "actionStatus": "ERROR",
                            "errorMessage": "internalError",
                            "errorDescription": "Unable to build the PIN-entry redirect.",
                        })),
                    );
                }
            };

            info!(flow_id = %flow_id, "registered new authentication flow");

            (
                StatusCode::OK,
                Json(json!({
                    "actionStatus": "INCOMPLETE",
                    "operations": [{ "op": "redirect", "url": url }],
                })),
            )
        }

        RegisterOutcome::Existing(session) => match session.status {
            FlowStatus::Success => {
                info!(flow_id = %flow_id, "flow resolved successfully");

                (
                    StatusCode::OK,
                    Json(json!({
                        "actionStatus": "SUCCESS",
                        "data": { "user": session.user },
                    })),
                )
            }

            // Pending flows report FAILED as well: the platform asked for an
            // outcome before the PIN verification happened.
            FlowStatus::Pending | FlowStatus::Failed => {
                warn!(flow_id = %flow_id, status = ?session.status, "flow did not resolve to a user");

                (
                    StatusCode::OK,
                    Json(json!({
                        "actionStatus": "FAILED",
                        "failureReason": "userNotFound",
                        "failureDescription": "Unable to find user for given credentials.",
                    })),
                )
            }
        },
    }
}
