//! Trusted-header authentication
//!
//! Dev only: whatever sits in front of the server is trusted to have
//! authenticated the caller and put its id in the configured header.

use async_trait::async_trait;
use axum::http::{request::Parts, HeaderName};
use rg_authz::PrincipalSource;
use rg_common::PrincipalId;

#[derive(Debug, Clone)]
pub struct HeaderPrincipalSource {
    header: HeaderName,
}

impl HeaderPrincipalSource {
    pub fn new(header: &str) -> anyhow::Result<Self> {
        Ok(Self {
            header: HeaderName::from_bytes(header.as_bytes())?,
        })
    }
}

#[async_trait]
impl PrincipalSource for HeaderPrincipalSource {
    type Principal = PrincipalId;

    async fn current_principal(&self, parts: &Parts) -> Option<PrincipalId> {
        parts
            .headers
            .get(&self.header)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(PrincipalId::new)
    }
}
