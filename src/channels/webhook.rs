//! Inbound webhook — the HTTP edge Twilio delivers WhatsApp messages to.
//!
//! Replies are sent out-of-band through the `Notifier`, so the webhook
//! answers with an empty TwiML document. Only persistence failures surface
//! as request failures; everything else is handled inside the engine.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;
use tracing::error;

use crate::channels::whatsapp::normalize_identity;
use crate::engine::ConversationEngine;

/// The fields we use from Twilio's form-encoded webhook payload.
#[derive(Debug, Deserialize)]
pub struct InboundForm {
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "Body", default)]
    pub body: String,
}

const EMPTY_TWIML: &str = r#"<?xml version="1.0" encoding="UTF-8"?><Response></Response>"#;

async fn whatsapp_inbound(
    State(engine): State<Arc<ConversationEngine>>,
    Form(form): Form<InboundForm>,
) -> impl IntoResponse {
    let identity = normalize_identity(&form.from);

    match engine.handle_inbound(&identity, &form.body).await {
        Ok(()) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/xml")],
            EMPTY_TWIML,
        )
            .into_response(),
        Err(e) => {
            error!(identity, error = %e, "Inbound handling failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn healthz() -> impl IntoResponse {
    "ok"
}

/// Build the webhook routes.
pub fn webhook_routes(engine: Arc<ConversationEngine>) -> Router {
    Router::new()
        .route("/whatsapp", post(whatsapp_inbound))
        .route("/healthz", get(healthz))
        .with_state(engine)
}
