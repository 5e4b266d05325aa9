// Session tokens: HS256 JWTs carried in the `token` cookie
use axum::http::{header, HeaderMap};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Cookie that carries the session token.
pub const TOKEN_COOKIE: &str = "token";

/// Lifetime of a token minted at signin.
pub const SESSION_MINUTES: i64 = 60;

/// Lifetime of a token minted by the refresh endpoint.
pub const REFRESH_MINUTES: i64 = 5;

#[derive(Debug, Error)]
pub enum TokenError {
    /// No session cookie on the request at all.
    #[error("No session token")]
    MissingToken,
    /// A cookie header was present but could not be read.
    #[error("Malformed cookie header")]
    MalformedCookie,
    /// Signature did not verify, or the token is outside its validity window.
    #[error("Invalid session token")]
    Rejected,
    /// The token is not something we ever issued.
    #[error("Malformed session token")]
    Malformed,
    /// Signing failed; the key is unusable.
    #[error("Token signing failed: {0}")]
    Signing(String),
}

/// JWT claims for a session.
///
/// `sid` identifies the signin session itself and is what playlist edit
/// leases are keyed on; it stays stable across token refreshes. `purpose`
/// echoes the optional `X-Authentication-Type` request header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub sid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
}

impl Claims {
    /// Claims for a fresh signin: new session id, full session lifetime.
    pub fn new(subject: impl Into<String>, purpose: Option<String>) -> Self {
        Self {
            sub: subject.into(),
            exp: (Utc::now() + Duration::minutes(SESSION_MINUTES)).timestamp(),
            sid: Uuid::new_v4().to_string(),
            purpose,
        }
    }

    /// The same session on a short leash: identity and session id are kept,
    /// only the expiry is reset to the refresh window.
    pub fn refreshed(&self) -> Self {
        Self {
            exp: (Utc::now() + Duration::minutes(REFRESH_MINUTES)).timestamp(),
            ..self.clone()
        }
    }
}

/// Issues and verifies session tokens with a single symmetric key.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenService {
    pub fn new(signing_key: &str) -> Self {
        // zero leeway: a token one second past its expiry is already invalid
        let mut validation = Validation::default();
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(signing_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(signing_key.as_bytes()),
            validation,
        }
    }

    /// Sign a token for the given claims.
    pub fn issue(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|err| TokenError::Signing(err.to_string()))
    }

    /// Extract and verify the session token from the request headers.
    ///
    /// The error variant picks the client-facing status: missing or rejected
    /// tokens are an authentication problem, unreadable cookies and garbage
    /// tokens are a malformed request.
    pub fn check(&self, headers: &HeaderMap) -> Result<Claims, TokenError> {
        let token = find_token_cookie(headers)?;

        match decode::<Claims>(&token, &self.decoding_key, &self.validation) {
            Ok(data) => Ok(data.claims),
            Err(err) => match err.kind() {
                ErrorKind::InvalidSignature
                | ErrorKind::ExpiredSignature
                | ErrorKind::ImmatureSignature => Err(TokenError::Rejected),
                _ => Err(TokenError::Malformed),
            },
        }
    }
}

/// Render the Set-Cookie value for a session token.
pub fn session_cookie(token: &str, expires_at: i64) -> String {
    let expires = DateTime::<Utc>::from_timestamp(expires_at, 0).unwrap_or_else(Utc::now);
    format!(
        "{}={}; Path=/; Expires={}; HttpOnly",
        TOKEN_COOKIE,
        token,
        expires.format("%a, %d %b %Y %H:%M:%S GMT")
    )
}

fn find_token_cookie(headers: &HeaderMap) -> Result<String, TokenError> {
    let mut saw_unreadable = false;

    for value in headers.get_all(header::COOKIE) {
        let Ok(raw) = value.to_str() else {
            saw_unreadable = true;
            continue;
        };
        for pair in raw.split(';') {
            if let Some((name, token)) = pair.trim().split_once('=') {
                if name == TOKEN_COOKIE {
                    return Ok(token.to_string());
                }
            }
        }
    }

    if saw_unreadable {
        Err(TokenError::MalformedCookie)
    } else {
        Err(TokenError::MissingToken)
    }
}
