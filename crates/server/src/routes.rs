use std::sync::Arc;

use axum::{
    body::{self, Body},
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::post,
    Form, Router,
};
use chrono::Utc;
use secrecy::SecretString;
use slashspot_core::config::SlackConfig;
use slashspot_core::Registry;
use slashspot_slack::messages;
use slashspot_slack::{
    normalize_spot_command, CommandRouter, RegistryCommandService, SignatureVerifier,
    SlashCommandPayload, SIGNATURE_HEADER, TIMESTAMP_HEADER,
};
use tracing::{error, info, warn};

/// Slash command bodies are small form posts; anything larger is refused.
const MAX_COMMAND_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct CommandState {
    router: Arc<CommandRouter<RegistryCommandService>>,
    verifier: Arc<SignatureVerifier>,
    command: Arc<str>,
}

impl CommandState {
    pub fn new(slack: &SlackConfig, registry: Arc<Registry>) -> Self {
        Self::with_secret(
            slack.signing_secret.clone(),
            slack.max_request_age_secs,
            &slack.command,
            registry,
        )
    }

    pub fn with_secret(
        signing_secret: SecretString,
        max_request_age_secs: u64,
        command: &str,
        registry: Arc<Registry>,
    ) -> Self {
        Self {
            router: Arc::new(CommandRouter::new(RegistryCommandService::new(registry))),
            verifier: Arc::new(SignatureVerifier::new(signing_secret, max_request_age_secs)),
            command: Arc::from(command),
        }
    }
}

pub fn router(state: CommandState) -> Router {
    Router::new()
        .route("/command", post(command))
        .route_layer(middleware::from_fn_with_state(state.clone(), verify_signature))
        .with_state(state)
}

/// Rejects requests whose Slack signature does not match the raw body, then
/// hands the buffered body on to the handler.
async fn verify_signature(
    State(state): State<CommandState>,
    request: Request,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = match body::to_bytes(body, MAX_COMMAND_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(error) => {
            warn!(
                event_name = "system.http.body_rejected",
                correlation_id = "command",
                error = %error,
                "slash command body could not be read"
            );
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        }
    };

    let header = |name: &str| parts.headers.get(name).and_then(|value| value.to_str().ok());
    let verified = state.verifier.verify(
        header(TIMESTAMP_HEADER),
        header(SIGNATURE_HEADER),
        &bytes,
        Utc::now(),
    );
    if let Err(error) = verified {
        warn!(
            event_name = "system.http.signature_rejected",
            correlation_id = "command",
            error = %error,
            "slash command signature rejected"
        );
        return StatusCode::UNAUTHORIZED.into_response();
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

async fn command(
    State(state): State<CommandState>,
    Form(payload): Form<SlashCommandPayload>,
) -> Response {
    let envelope = match normalize_spot_command(payload, &state.command) {
        Ok(envelope) => envelope,
        Err(error) => {
            warn!(
                event_name = "system.http.command_rejected",
                correlation_id = "command",
                error = %error,
                "slash command rejected"
            );
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let request_id = envelope.request_id.clone();
    let user_id = envelope.user_id.clone();
    match state.router.route(envelope).await {
        Ok(reply) => {
            info!(
                event_name = "system.http.command_handled",
                correlation_id = %request_id,
                user_id = %user_id,
                "slash command handled"
            );
            (StatusCode::OK, reply).into_response()
        }
        Err(error) => {
            error!(
                event_name = "system.http.command_failed",
                correlation_id = %request_id,
                user_id = %user_id,
                error = %error,
                "slash command failed"
            );
            (StatusCode::INTERNAL_SERVER_ERROR, messages::STORAGE_UNAVAILABLE).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{self, Body},
        http::{header, Request, StatusCode},
        Router,
    };
    use chrono::{NaiveDate, Utc};
    use slashspot_core::{DateClock, Registry};
    use slashspot_slack::{messages, SignatureVerifier, SIGNATURE_HEADER, TIMESTAMP_HEADER};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::{router, CommandState};

    const SECRET: &str = "test-signing-secret";

    fn app(dir: &TempDir) -> Router {
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).expect("valid date");
        let registry =
            Registry::open(dir.path(), "spots.json", DateClock::fixed(today)).expect("open");
        let state =
            CommandState::with_secret(SECRET.to_string().into(), 300, "/spot", Arc::new(registry));
        router(state)
    }

    fn form(command: &str, text: &str) -> String {
        format!(
            "token=t&team_id=T1&channel_id=C1&user_id=U1&user_name=slackuser\
             &command={}&text={}&trigger_id=trig-1",
            command.replace('/', "%2F"),
            text.replace(' ', "+")
        )
    }

    fn signed(body: String, secret: &str) -> Request<Body> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = SignatureVerifier::new(secret.to_string().into(), 300)
            .sign(&timestamp, body.as_bytes())
            .expect("sign");

        Request::builder()
            .method("POST")
            .uri("/command")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(TIMESTAMP_HEADER, timestamp)
            .header(SIGNATURE_HEADER, signature)
            .body(Body::from(body))
            .expect("request")
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
        let response = app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, String::from_utf8(bytes.to_vec()).expect("utf8"))
    }

    #[tokio::test]
    async fn signed_commands_round_trip_through_the_registry() {
        let dir = TempDir::new().expect("tempdir");
        let app = app(&dir);

        let (status, body) = send(&app, signed(form("/spot", "register B2"), SECRET)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, messages::registered("B2"));

        send(&app, signed(form("/spot", "reg B1"), SECRET)).await;
        let (status, body) = send(&app, signed(form("/spot", "find"), SECRET)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "The following spots are available today: B1,B2");
    }

    #[tokio::test]
    async fn replies_are_plain_text() {
        let dir = TempDir::new().expect("tempdir");
        let app = app(&dir);

        let response =
            app.clone().oneshot(signed(form("/spot", "help"), SECRET)).await.expect("response");

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(content_type.starts_with("text/plain"), "{content_type}");
    }

    #[tokio::test]
    async fn bad_signatures_are_unauthorized() {
        let dir = TempDir::new().expect("tempdir");
        let app = app(&dir);

        let (status, _) = send(&app, signed(form("/spot", "drop all"), "wrong-secret")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let unsigned = Request::builder()
            .method("POST")
            .uri("/command")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form("/spot", "find")))
            .expect("request");
        let (status, _) = send(&app, unsigned).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn stale_timestamps_are_unauthorized() {
        let dir = TempDir::new().expect("tempdir");
        let app = app(&dir);
        let body = form("/spot", "find");
        let timestamp = (Utc::now().timestamp() - 3_600).to_string();
        let signature = SignatureVerifier::new(SECRET.to_string().into(), 300)
            .sign(&timestamp, body.as_bytes())
            .expect("sign");

        let request = Request::builder()
            .method("POST")
            .uri("/command")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(TIMESTAMP_HEADER, timestamp)
            .header(SIGNATURE_HEADER, signature)
            .body(Body::from(body))
            .expect("request");

        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn other_slash_commands_are_bad_requests() {
        let dir = TempDir::new().expect("tempdir");
        let app = app(&dir);

        let (status, _) = send(&app, signed(form("/quote", "new"), SECRET)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
