use crate::config::SessionConfig;
use crate::error::{AppError, AppResult};
use crate::utils::generate_nonce;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String, // user_id
    pub phone: String,
    pub nonce: u32,
    pub exp: i64,
    pub iat: i64,
}

impl SessionClaims {
    pub fn user_id(&self) -> AppResult<i64> {
        match self.sub.parse::<i64>() {
            Ok(id) if id > 0 => Ok(id),
            _ => Err(AppError::AuthError("Invalid session token".to_string())),
        }
    }
}

/// Issues and checks the opaque `session_token` handed out after a
/// successful verification. Tokens are HS256-signed and carry an expiry.
#[derive(Clone)]
pub struct SessionIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expires_in: i64,
}

impl SessionIssuer {
    pub fn new(secret: &str, expires_in: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expires_in,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(&config.secret, config.expires_in)
    }

    pub fn issue(&self, user_id: i64, phone: &str) -> AppResult<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.expires_in);

        let claims = SessionClaims {
            sub: user_id.to_string(),
            phone: phone.to_string(),
            nonce: generate_nonce(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(AppError::JwtError)
    }

    /// Any failure (missing, malformed, bad signature, expired) is reported
    /// as an auth error so callers answer 401, never 500.
    pub fn decode(&self, token: Option<&str>) -> AppResult<SessionClaims> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::AuthError("Missing session token".to_string()))?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let claims = decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                log::debug!("Rejected session token: {e}");
                AppError::AuthError("Invalid session token".to_string())
            })?;

        claims.user_id()?;
        Ok(claims)
    }

    pub fn expires_in(&self) -> i64 {
        self.expires_in
    }
}
