//! Admin authentication.
//!
//! A single shared admin password, checked at login; a successful login
//! issues a short-lived HS256 session token validated by the admin
//! middleware on every back-office request.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Session token lifetime
const TOKEN_TTL_HOURS: i64 = 24;

/// JWT claims for an admin session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject, always "admin"
    pub sub: String,
    /// Expiration (unix seconds)
    pub exp: i64,
    /// Issued at (unix seconds)
    pub iat: i64,
}

/// Admin authentication service
pub struct AuthService {
    admin_password: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthService {
    pub fn new(admin_password: String, jwt_secret: &str) -> Self {
        Self {
            admin_password,
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
        }
    }

    /// Check the admin password and issue a session token.
    pub fn login(&self, password: &str) -> Result<String> {
        if password != self.admin_password {
            return Err(AppError::Authentication("Invalid password".into()));
        }

        let now = Utc::now();
        let claims = Claims {
            sub: "admin".into(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Validate a session token and return its claims.
    pub fn validate(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|_| AppError::Authentication("Invalid or expired token".into()))?;
        Ok(data.claims)
    }
}
