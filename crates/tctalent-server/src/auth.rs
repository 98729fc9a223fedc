// Copyright (C) 2025 Talent Catalog contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Bearer token authentication.
//!
//! Tokens are HS256 JWTs signed with `TC_JWT_SECRET`. They are issued by the
//! login service; this server only verifies them.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tctalent_core::model::Role;
use tctalent_core::services::Actor;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// Token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub role: Role,
    /// Set when the user is a candidate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_id: Option<i64>,
    /// Expiry, epoch seconds.
    pub exp: i64,
}

/// Keys for signing and verifying tokens.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Sign `claims`.
    pub fn encode(&self, claims: &Claims) -> Result<String, jsonwebtoken::errors::Error> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
    }

    pub fn decode(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation).map(|t| t.claims)
    }
}

/// Any authenticated user.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub role: Role,
    pub candidate_id: Option<i64>,
    pub partner_id: Option<i64>,
}

impl AuthUser {
    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.user_id,
            role: self.role,
            partner_id: self.partner_id,
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::invalid_session("Not logged in"))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::invalid_session("Expected a bearer token"))?;

        let claims = state.jwt.decode(token.trim()).map_err(|e| {
            debug!(error = %e, "Rejected token");
            ApiError::InvalidCredentials("Invalid or expired token".to_string())
        })?;
        let user_id = claims
            .sub
            .parse()
            .map_err(|_| ApiError::InvalidCredentials("Invalid token subject".to_string()))?;

        // Role and partner come from the user record, not the token
        let user = state
            .services
            .persistence
            .get_user(user_id)
            .await?
            .ok_or_else(|| {
                debug!(user_id, "Token for unknown user");
                ApiError::invalid_session("Unknown user")
            })?;

        Ok(Self {
            user_id: user.id,
            role: user.role,
            candidate_id: claims.candidate_id,
            partner_id: user.partner_id,
        })
    }
}

/// A staff user allowed on the admin API.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role == Role::User || user.candidate_id.is_some() {
            return Err(ApiError::unauthorised("Admin access required"));
        }
        Ok(Self(user))
    }
}

/// A candidate logged in to the portal.
#[derive(Debug, Clone)]
pub struct CandidateUser {
    pub user_id: i64,
    pub candidate_id: i64,
}

impl FromRequestParts<AppState> for CandidateUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        let candidate_id = user
            .candidate_id
            .ok_or_else(|| ApiError::invalid_session("Not logged in as a candidate"))?;
        Ok(Self {
            user_id: user.user_id,
            candidate_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(exp: i64) -> Claims {
        Claims {
            sub: "12".to_string(),
            role: Role::Admin,
            candidate_id: None,
            partner_id: Some(3),
            exp,
        }
    }

    #[test]
    fn test_round_trip() {
        let keys = JwtKeys::new("secret");
        let exp = chrono::Utc::now().timestamp() + 600;
        let token = keys.encode(&claims(exp)).unwrap();
        assert_eq!(keys.decode(&token).unwrap(), claims(exp));
    }

    #[test]
    fn test_rejects_wrong_secret_and_expired() {
        let keys = JwtKeys::new("secret");
        let exp = chrono::Utc::now().timestamp() + 600;
        let other = JwtKeys::new("other").encode(&claims(exp)).unwrap();
        assert!(keys.decode(&other).is_err());

        let expired = keys.encode(&claims(1_000)).unwrap();
        assert!(keys.decode(&expired).is_err());
    }

    #[test]
    fn test_claims_json_shape() {
        let json = serde_json::to_value(claims(99)).unwrap();
        assert_eq!(json["role"], "admin");
        assert_eq!(json["partnerId"], 3);
        assert!(json.get("candidateId").is_none());
    }
}
