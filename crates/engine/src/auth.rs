// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent identity verification (HS256 bearer tokens)

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tb_core::AgentId;
use thiserror::Error;

/// Why a credential was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("missing credential")]
    Missing,
    #[error("malformed credential")]
    Malformed,
    #[error("credential expired")]
    Expired,
    #[error("credential signature invalid")]
    SignatureInvalid,
}

impl AuthError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Malformed => "malformed",
            Self::Expired => "expired",
            Self::SignatureInvalid => "signature_invalid",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    agent_id: String,
    iat: i64,
    exp: i64,
}

/// A verified agent identity.
///
/// Only obtainable from [`TokenVerifier::verify`], so holding one proves the
/// caller presented a valid credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    agent_id: AgentId,
}

impl Identity {
    pub(crate) fn new(agent_id: AgentId) -> Self {
        Self { agent_id }
    }

    pub fn agent_id(&self) -> &AgentId {
        &self.agent_id
    }
}

/// Verifies presented credentials against the shared signing secret
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);
        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Check a credential, accepting an optional `Bearer ` prefix
    pub fn verify(&self, credential: Option<&str>) -> Result<Identity, AuthError> {
        let token = credential
            .map(|c| c.trim())
            .map(|c| c.strip_prefix("Bearer ").unwrap_or(c).trim())
            .filter(|c| !c.is_empty())
            .ok_or(AuthError::Missing)?;

        let data = jsonwebtoken::decode::<Claims>(token, &self.key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                ErrorKind::InvalidSignature => AuthError::SignatureInvalid,
                _ => AuthError::Malformed,
            },
        )?;

        if data.claims.agent_id.trim().is_empty() {
            return Err(AuthError::Malformed);
        }
        Ok(Identity::new(AgentId::new(data.claims.agent_id)))
    }
}

/// Mints credentials with the shared signing secret (operator side)
#[derive(Clone)]
pub struct TokenIssuer {
    key: EncodingKey,
}

impl TokenIssuer {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: EncodingKey::from_secret(secret),
        }
    }

    /// Token for `agent_id` valid for `ttl` from now
    pub fn issue(
        &self,
        agent_id: &AgentId,
        ttl: chrono::Duration,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue_at(agent_id, Utc::now(), ttl)
    }

    pub fn issue_at(
        &self,
        agent_id: &AgentId,
        issued_at: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = Claims {
            agent_id: agent_id.to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.key)
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
