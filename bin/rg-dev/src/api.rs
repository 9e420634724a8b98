//! HTTP surface of the development server

use std::sync::Arc;

use anyhow::{bail, Context};
use axum::{
    extract::{Path, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use rg_authz::{RolesGroup, RolesLayer, RolesManager};
use rg_common::{InvalidRole, PrincipalId};
use rg_config::{check_route_paths, RouteRule};
use rg_store::{AssociationStore, RoleAssociation, StoreError};
use serde_json::json;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::auth::HeaderPrincipalSource;
use crate::roles::AppRole;

pub type Store = Arc<dyn AssociationStore<AppRole>>;
pub type Manager = RolesManager<AppRole, Store>;

/// Paths served by the server itself; route rules may not claim them
const RESERVED_PATHS: &[&str] = &["/health", "/metrics"];

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<Manager>,
}

/// API error, rendered as `{ "error", "message" }`
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    InvalidRole(#[from] InvalidRole),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            ApiError::InvalidRole(_) | ApiError::Store(StoreError::InvalidRole(_)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            }
            ApiError::Store(StoreError::MissingPrincipalId) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            }
            ApiError::Store(StoreError::DuplicateRole { .. }) => (StatusCode::CONFLICT, "DUPLICATE"),
            ApiError::Store(StoreError::RoleNotFound { .. }) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Store(e) => {
                error!(error = %e, "Role store failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "STORE_ERROR")
            }
        };

        let body = json!({
            "error": error_type,
            "message": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}

/// Assemble the full router: open endpoints, admin-only role management, and
/// one guarded route per rule.
pub fn build_router(
    manager: Arc<Manager>,
    source: HeaderPrincipalSource,
    rules: &[RouteRule],
    metrics: Option<PrometheusHandle>,
) -> anyhow::Result<Router> {
    let state = AppState {
        manager: manager.clone(),
    };

    let admin = Router::new()
        .route("/principals/{id}/roles", get(list_roles))
        .route(
            "/principals/{id}/roles/{role}",
            axum::routing::post(add_role).delete(remove_role),
        )
        .route_layer(RolesLayer::new(
            RolesGroup::single(AppRole::Admin),
            manager.clone(),
            source.clone(),
        ))
        .with_state(state);

    let mut app = Router::new()
        .route("/health", get(health_handler))
        .merge(admin);

    if let Some(handle) = metrics {
        app = app.route("/metrics", get(move || async move { handle.render() }));
    }

    // Router::route panics on paths it cannot mount
    check_route_paths(rules).context("route rules cannot be mounted")?;

    for rule in rules {
        if RESERVED_PATHS.contains(&rule.path.as_str()) || rule.path.starts_with("/principals/") {
            bail!("route rule path {} collides with a built-in endpoint", rule.path);
        }

        let group = RolesGroup::<AppRole>::from_names(&rule.include, &rule.exclude)
            .with_context(|| format!("route rule for {}", rule.path))?;
        if group.is_unsatisfiable() {
            warn!(path = %rule.path, "Route rule can never be satisfied");
        }

        info!(
            path = %rule.path,
            include = ?rule.include,
            exclude = ?rule.exclude,
            "Guarding route"
        );

        let guarded = Router::new()
            .route(&rule.path, get(guarded_handler))
            .route_layer(RolesLayer::new(group, manager.clone(), source.clone()));
        app = app.merge(guarded);
    }

    Ok(app)
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "UP",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn guarded_handler(uri: Uri) -> Json<serde_json::Value> {
    Json(json!({
        "path": uri.path(),
        "access": "granted",
    }))
}

async fn list_roles(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<RoleAssociation<AppRole>>>, ApiError> {
    let roles = state.manager.roles_of(&PrincipalId::new(id)).await?;
    Ok(Json(roles))
}

async fn add_role(
    State(state): State<AppState>,
    Path((id, role)): Path<(String, String)>,
) -> Result<(StatusCode, Json<RoleAssociation<AppRole>>), ApiError> {
    let role: AppRole = role.parse()?;
    let association = state.manager.add_role(&PrincipalId::new(id), role).await?;
    Ok((StatusCode::CREATED, Json(association)))
}

async fn remove_role(
    State(state): State<AppState>,
    Path((id, role)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let role: AppRole = role.parse()?;
    state.manager.remove_role(&PrincipalId::new(id), role).await?;
    Ok(StatusCode::NO_CONTENT)
}
