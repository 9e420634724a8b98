//! Authorization Gate
//!
//! Guards a request with a [`RolesGroup`]. The gate asks its [`PrincipalSource`]
//! who is calling, then asks its [`RolesEvaluator`] whether that principal
//! satisfies the group. A request with no principal is rejected without
//! touching the store.
//!
//! [`AuthorizationGate::decide`] is framework free. [`RolesLayer`] wraps the
//! gate as tower middleware for axum routers:
//!
//! ```rust,ignore
//! let members = RolesGroupBuilder::empty()
//!     .include(AppRole::Confirmed)
//!     .exclude(AppRole::Unconfirmed)
//!     .build();
//!
//! let app = Router::new()
//!     .route("/members", get(members_handler))
//!     .route_layer(RolesLayer::new(members, manager.clone(), HeaderPrincipalSource));
//! ```

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use axum::{
    http::{request::Parts, Request, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use rg_common::{Principal, RoleIdentifier};
use rg_store::StoreError;
use serde::Serialize;
use thiserror::Error;
use tower::{Layer, Service};
use tracing::{debug, error, info};

use crate::{RolesEvaluator, RolesGroup};

/// Supplies the authenticated principal of a request, if any
#[async_trait]
pub trait PrincipalSource: Send + Sync {
    type Principal: Principal + 'static;

    async fn current_principal(&self, parts: &Parts) -> Option<Self::Principal>;
}

/// Reads the principal from request extensions, where an upstream
/// authentication layer has put it
pub struct ExtensionPrincipalSource<P>(PhantomData<fn() -> P>);

impl<P> ExtensionPrincipalSource<P> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<P> Default for ExtensionPrincipalSource<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Clone for ExtensionPrincipalSource<P> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

#[async_trait]
impl<P> PrincipalSource for ExtensionPrincipalSource<P>
where
    P: Principal + Clone + 'static,
{
    type Principal = P;

    async fn current_principal(&self, parts: &Parts) -> Option<P> {
        parts.extensions.get::<P>().cloned()
    }
}

/// Why a request was turned away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// No principal could be established
    Unauthenticated,
    /// The principal does not satisfy the roles group
    Unauthorized,
}

/// Outcome of gating one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied(Denial),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

/// Gate failure, rendered as a JSON error response
#[derive(Error, Debug)]
pub enum Rejection {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Principal does not satisfy the required roles")]
    Unauthorized,

    #[error("Role evaluation failed: {0}")]
    Store(#[from] StoreError),
}

impl From<Denial> for Rejection {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::Unauthenticated => Rejection::Unauthenticated,
            Denial::Unauthorized => Rejection::Unauthorized,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            Rejection::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", self.to_string())
            }
            Rejection::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", self.to_string()),
            Rejection::Store(e) => {
                error!(error = %e, "Authorization could not be evaluated");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORE_ERROR",
                    "Authorization could not be evaluated".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse { error: code, message })).into_response()
    }
}

/// Per-route authorization decision point
pub struct AuthorizationGate<R: RoleIdentifier, E, A> {
    group: RolesGroup<R>,
    evaluator: E,
    source: A,
}

impl<R, E, A> AuthorizationGate<R, E, A>
where
    R: RoleIdentifier,
    E: RolesEvaluator<R>,
    A: PrincipalSource,
{
    pub fn new(group: RolesGroup<R>, evaluator: E, source: A) -> Self {
        Self {
            group,
            evaluator,
            source,
        }
    }

    pub fn roles_group(&self) -> &RolesGroup<R> {
        &self.group
    }

    /// Decide one request. Store failures are returned as errors and never
    /// turned into an allow or a deny.
    pub async fn decide(&self, parts: &Parts) -> Result<Decision, StoreError> {
        let Some(principal) = self.source.current_principal(parts).await else {
            debug!(path = %parts.uri.path(), "No principal on request");
            return Ok(Decision::Denied(Denial::Unauthenticated));
        };

        if self.evaluator.satisfies(&principal, &self.group).await? {
            Ok(Decision::Allowed)
        } else {
            info!(
                path = %parts.uri.path(),
                principal_id = ?principal.principal_id(),
                "Principal rejected by roles group"
            );
            Ok(Decision::Denied(Denial::Unauthorized))
        }
    }

    /// [`decide`](Self::decide), with denials folded into [`Rejection`] and the
    /// outcome counted
    pub async fn check(&self, parts: &Parts) -> Result<(), Rejection> {
        let outcome = self.decide(parts).await;

        let label = match &outcome {
            Ok(Decision::Allowed) => "allowed",
            Ok(Decision::Denied(Denial::Unauthorized)) => "unauthorized",
            Ok(Decision::Denied(Denial::Unauthenticated)) => "unauthenticated",
            Err(_) => "error",
        };
        metrics::counter!("rolegate_gate_decisions_total", "outcome" => label).increment(1);

        match outcome? {
            Decision::Allowed => Ok(()),
            Decision::Denied(denial) => Err(denial.into()),
        }
    }
}

/// Tower layer that puts an [`AuthorizationGate`] in front of a service
pub struct RolesLayer<R: RoleIdentifier, E, A> {
    gate: Arc<AuthorizationGate<R, E, A>>,
}

impl<R, E, A> RolesLayer<R, E, A>
where
    R: RoleIdentifier,
    E: RolesEvaluator<R>,
    A: PrincipalSource,
{
    pub fn new(group: RolesGroup<R>, evaluator: E, source: A) -> Self {
        Self::from_gate(Arc::new(AuthorizationGate::new(group, evaluator, source)))
    }

    pub fn from_gate(gate: Arc<AuthorizationGate<R, E, A>>) -> Self {
        Self { gate }
    }
}

impl<R: RoleIdentifier, E, A> Clone for RolesLayer<R, E, A> {
    fn clone(&self) -> Self {
        Self {
            gate: self.gate.clone(),
        }
    }
}

impl<S, R: RoleIdentifier, E, A> Layer<S> for RolesLayer<R, E, A> {
    type Service = RolesService<S, R, E, A>;

    fn layer(&self, inner: S) -> Self::Service {
        RolesService {
            inner,
            gate: self.gate.clone(),
        }
    }
}

pub struct RolesService<S, R: RoleIdentifier, E, A> {
    inner: S,
    gate: Arc<AuthorizationGate<R, E, A>>,
}

impl<S: Clone, R: RoleIdentifier, E, A> Clone for RolesService<S, R, E, A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            gate: self.gate.clone(),
        }
    }
}

impl<S, B, R, E, A> Service<Request<B>> for RolesService<S, R, E, A>
where
    S: Service<Request<B>, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
    R: RoleIdentifier,
    E: RolesEvaluator<R> + 'static,
    A: PrincipalSource + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let gate = self.gate.clone();

        // Hand the service that was polled ready to the future
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let (parts, body) = req.into_parts();
            match gate.check(&parts).await {
                Ok(()) => inner.call(Request::from_parts(parts, body)).await,
                Err(rejection) => Ok(rejection.into_response()),
            }
        })
    }
}
