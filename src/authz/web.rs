use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::trace::TraceLayer;

use crate::authz::engine::AccessEngine;
use crate::authz::types::{
    AuthorizeRequest, AuthorizeResponse, Caller, Decision, HttpVerb, RuleView, RulesResponse,
};

pub fn router(engine: Arc<AccessEngine>) -> Router {
    Router::new()
        .route("/v1/authorize", post(handle_authorize))
        .route("/v1/rules", get(handle_rules))
        .route("/healthz", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(engine)
}

async fn handle_authorize(
    State(engine): State<Arc<AccessEngine>>,
    Json(req): Json<AuthorizeRequest>,
) -> impl IntoResponse {
    let decision = match req.method.parse::<HttpVerb>() {
        Ok(verb) => {
            let caller = Caller::with_roles(req.roles).permissions(req.permissions);
            engine.decide(verb, &req.path, &req.base_path, &caller)
        }
        Err(e) => {
            tracing::debug!(error = %e, "denying request with unsupported verb");
            Decision::UnsupportedVerb
        }
    };
    Json(AuthorizeResponse {
        allowed: decision.is_granted(),
        decision,
    })
}

async fn handle_rules(State(engine): State<Arc<AccessEngine>>) -> impl IntoResponse {
    let mut always_grant_roles: Vec<String> =
        engine.always_grant_roles().iter().cloned().collect();
    always_grant_roles.sort();
    let rules = engine
        .rules()
        .map(|(kind, rule)| RuleView {
            kind,
            rule: rule.clone(),
        })
        .collect();
    Json(RulesResponse {
        always_grant_roles,
        rules,
    })
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
