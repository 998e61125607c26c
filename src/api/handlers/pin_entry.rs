//! PIN-entry page and PIN submission.
//!
//! `GET /api/pin-entry` serves the form for a live flow; `POST /api/pin-submit`
//! verifies the submitted PIN against the `AUTH_MODE` selected user database
//! and drives the flow to its terminal state. The identity platform observes
//! the outcome on its next authenticate call.

use crate::api::{config::AuthMode, handlers::valid_pin, session::FlowStatus, AppState};
use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Form,
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;

const INVALID_FLOW: &str = "Invalid or expired Flow ID.";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinEntryParams {
    #[serde(default)]
    pub flow_id: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PinSubmission {
    #[serde(default)]
    pub flow_id: String,
    #[schema(value_type = String)]
    pub pin: SecretString,
}

#[utoipa::path(
    get,
    path= "/api/pin-entry",
    params(
        ("flowId" = String, Query, description = "Flow identifier issued by the authenticate callback"),
    ),
    responses (
        (status = 200, description = "PIN entry page", content_type = "text/html"),
        (status = 400, description = "Empty or unknown flowId"),
    ),
    tag = "flow",
)]
#[instrument(skip(state))]
pub async fn pin_entry(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<PinEntryParams>,
) -> Response {
    if params.flow_id.is_empty() || !state.sessions.contains(&params.flow_id).await {
        warn!(flow_id = %params.flow_id, "pin-entry requested for unknown flow");
        return (StatusCode::BAD_REQUEST, INVALID_FLOW).into_response();
    }

    Html(pin_form(&params.flow_id)).into_response()
}

#[utoipa::path(
    post,
    path= "/api/pin-submit",
    responses (
        (status = 200, description = "PIN accepted, flow resolved", content_type = "text/html"),
        (status = 400, description = "Unknown flow or malformed PIN"),
        (status = 401, description = "PIN rejected, flow failed"),
    ),
    tag = "flow",
)]
#[instrument(skip(state, form))]
pub async fn pin_submit(
    Extension(state): Extension<Arc<AppState>>,
    Form(form): Form<PinSubmission>,
) -> Response {
    let flow_id = &form.flow_id;

    let Some(session) = state.sessions.get(flow_id).await else {
        warn!(flow_id = %flow_id, "pin submitted for unknown flow");
        return (StatusCode::BAD_REQUEST, INVALID_FLOW).into_response();
    };

    // Terminal flows cannot be resubmitted.
    if session.status != FlowStatus::Pending {
        warn!(flow_id = %flow_id, status = ?session.status, "pin submitted for resolved flow");
        return (StatusCode::BAD_REQUEST, INVALID_FLOW).into_response();
    }

    let pin = form.pin.expose_secret();
    if !valid_pin(pin) {
        // Malformed input does not consume the flow, the user may retry.
        return (
            StatusCode::BAD_REQUEST,
            Html(retry_page(flow_id, "The PIN must be 4 to 8 digits.")),
        )
            .into_response();
    }

    let mode = state.config.auth_mode;
    let verified = match mode {
        AuthMode::SecondFactor => second_factor_user(&state, session.user.as_ref(), pin),
        _ => state.users.find_by_pin(mode, pin).map(|user| user.claims()),
    };

    match verified {
        Some(claims) => {
            if !state.sessions.complete(flow_id, claims).await {
                // The flow expired or resolved between the read and the write.
                warn!(flow_id = %flow_id, "flow vanished before completion");
                return (StatusCode::BAD_REQUEST, INVALID_FLOW).into_response();
            }

            info!(flow_id = %flow_id, "pin verified, flow completed");

            match state.config.provider_return_url(flow_id) {
                Ok(url) => Html(success_page(&url)).into_response(),
                Err(err) => {
                    error!("Failed to build provider return URL: {err:#}");
                    (StatusCode::INTERNAL_SERVER_ERROR, "Internal error.").into_response()
                }
            }
        }

        None => {
            state.sessions.fail(flow_id).await;
            warn!(flow_id = %flow_id, "pin rejected, flow failed");

            (StatusCode::UNAUTHORIZED, Html(failure_page())).into_response()
        }
    }
}

/// Second factor: the flow already carries the user from the authenticate
/// event; the PIN must belong to that same user in the directory.
fn second_factor_user(state: &AppState, stored: Option<&Value>, pin: &str) -> Option<Value> {
    let stored = stored?;
    let username = stored
        .get("username")
        .and_then(Value::as_str)
        .or_else(|| stored.get("id").and_then(Value::as_str))?;

    state
        .users
        .find_by_username(AuthMode::SecondFactor, username)
        .filter(|user| user.pin_matches(pin))
        .map(|user| user.claims())
}

fn pin_form(flow_id: &str) -> String {
    let flow_id = escape_html(flow_id);
    format!(
        r#"<!DOCTYPE html>
<html>
  <head><title>PIN verification</title></head>
  <body>
    <h1>Enter your PIN</h1>
    <form method="post" action="/api/pin-submit">
      <input type="hidden" name="flowId" value="{flow_id}"/>
      <label for="pin">PIN</label>
      <input type="password" name="pin" id="pin" inputmode="numeric" autocomplete="one-time-code" autofocus/>
      <button type="submit">Verify</button>
    </form>
  </body>
</html>
"#
    )
}

fn retry_page(flow_id: &str, reason: &str) -> String {
    let flow_id = escape_html(flow_id);
    let reason = escape_html(reason);
    format!(
        r#"<!DOCTYPE html>
<html>
  <head><title>PIN verification</title></head>
  <body>
    <p>{reason}</p>
    <p><a href="/api/pin-entry?flowId={flow_id}">Try again</a></p>
  </body>
</html>
"#
    )
}

fn success_page(return_url: &str) -> String {
    let return_url = escape_html(return_url);
    format!(
        r#"<!DOCTYPE html>
<html>
  <head><title>PIN verified</title></head>
  <body>
    <h1>PIN verified</h1>
    <p>You can now <a href="{return_url}">return to your application</a>.</p>
  </body>
</html>
"#
    )
}

fn failure_page() -> String {
    r#"<!DOCTYPE html>
<html>
  <head><title>PIN rejected</title></head>
  <body>
    <h1>PIN rejected</h1>
    <p>Unable to find user for given credentials.</p>
  </body>
</html>
"#
    .to_string()
}

// The flow id is caller supplied and lands in HTML attributes.
fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());

    for character in input.chars() {
        match character {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(character),
        }
    }

    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{
        config::ServiceConfig,
        session::{SessionRecord, SessionStore},
        users::UserDirectory,
    };
    use serde_json::json;

    const USERS: &str = r#"{
        "federated": [
            {"id": "u-1", "username": "ana", "pin": "1234", "email": "ana@example.com"}
        ],
        "internal": [
            {"id": "u-3", "username": "carol", "pin": "5678"}
        ]
    }"#;

    fn state(auth_mode: AuthMode) -> Arc<AppState> {
        let config =
            ServiceConfig::new(auth_mode, "http://localhost:3000", "https://localhost:9443")
                .expect("config");

        Arc::new(AppState {
            config,
            sessions: SessionStore::new(),
            users: UserDirectory::from_inline(USERS).expect("users"),
        })
    }

    async fn register(state: &AppState, flow_id: &str, user: Option<Value>) {
        state
            .sessions
            .put(flow_id, SessionRecord::new("acme".to_string(), None, user))
            .await;
    }

    fn submission(flow_id: &str, pin: &str) -> PinSubmission {
        PinSubmission {
            flow_id: flow_id.to_string(),
            pin: SecretString::from(pin.to_string()),
        }
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        String::from_utf8(bytes.to_vec()).expect("utf8")
    }

    #[tokio::test]
    async fn pin_entry_rejects_empty_and_unknown_flows() {
        let state = state(AuthMode::Federated);

        for flow_id in ["", "unknown"] {
            let response = pin_entry(
                Extension(state.clone()),
                Query(PinEntryParams {
                    flow_id: flow_id.to_string(),
                }),
            )
            .await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(body_text(response).await, INVALID_FLOW);
        }
    }

    #[tokio::test]
    async fn pin_entry_serves_the_form() {
        let state = state(AuthMode::Federated);
        register(&state, "f1", None).await;

        let response = pin_entry(
            Extension(state),
            Query(PinEntryParams {
                flow_id: "f1".to_string(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains(r#"action="/api/pin-submit""#));
        assert!(body.contains(r#"value="f1""#));
    }

    #[tokio::test]
    async fn pin_entry_escapes_the_flow_id() {
        let state = state(AuthMode::Federated);
        register(&state, "<script>", None).await;

        let response = pin_entry(
            Extension(state),
            Query(PinEntryParams {
                flow_id: "<script>".to_string(),
            }),
        )
        .await;

        let body = body_text(response).await;
        assert!(!body.contains("<script>"));
        assert!(body.contains("&lt;script&gt;"));
    }

    #[tokio::test]
    async fn correct_pin_completes_the_flow() {
        let state = state(AuthMode::Federated);
        register(&state, "f1", None).await;

        let response = pin_submit(Extension(state.clone()), Form(submission("f1", "1234"))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response)
            .await
            .contains("https://localhost:9443/commonauth?flowId=f1"));

        let session = state.sessions.get("f1").await.expect("record");
        assert_eq!(session.status, FlowStatus::Success);
        assert_eq!(
            session.user.as_ref().and_then(|user| user["username"].as_str()),
            Some("ana")
        );
    }

    #[tokio::test]
    async fn wrong_pin_fails_the_flow() {
        let state = state(AuthMode::Federated);
        register(&state, "f1", None).await;

        let response = pin_submit(Extension(state.clone()), Form(submission("f1", "9999"))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let session = state.sessions.get("f1").await.expect("record");
        assert_eq!(session.status, FlowStatus::Failed);

        // Terminal: resubmitting the right PIN no longer helps.
        let response = pin_submit(Extension(state), Form(submission("f1", "1234"))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn internal_pin_is_rejected_in_federated_mode() {
        let state = state(AuthMode::Federated);
        register(&state, "f1", None).await;

        // carol's PIN exists only in the internal list.
        let response = pin_submit(Extension(state), Form(submission("f1", "5678"))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_pin_leaves_the_flow_pending() {
        let state = state(AuthMode::Federated);
        register(&state, "f1", None).await;

        let response = pin_submit(Extension(state.clone()), Form(submission("f1", "12"))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let session = state.sessions.get("f1").await.expect("record");
        assert_eq!(session.status, FlowStatus::Pending);
    }

    #[tokio::test]
    async fn unknown_flow_is_rejected() {
        let state = state(AuthMode::Federated);

        let response = pin_submit(Extension(state), Form(submission("missing", "1234"))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn second_factor_checks_the_bound_user() {
        let state = state(AuthMode::SecondFactor);

        register(&state, "f1", Some(json!({"username": "ana"}))).await;
        let response = pin_submit(Extension(state.clone()), Form(submission("f1", "1234"))).await;
        assert_eq!(response.status(), StatusCode::OK);

        // carol's PIN does not belong to ana.
        register(&state, "f2", Some(json!({"username": "ana"}))).await;
        let response = pin_submit(Extension(state.clone()), Form(submission("f2", "5678"))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        // No bound user at all: nothing to verify against.
        register(&state, "f3", None).await;
        let response = pin_submit(Extension(state), Form(submission("f3", "1234"))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
