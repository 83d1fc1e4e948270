use jiff::Timestamp;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::models::User;

const SECONDS_PER_HOUR: i64 = 3600;

/// Token type enumeration
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Short-lived token for API authentication
    Access,
    /// Long-lived token for obtaining new access tokens
    Refresh,
}

/// JWT claims carrying the user's identity
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub token_type: TokenType,
    /// Unique token id; two tokens issued in the same second still differ
    pub jti: String,
    /// Issued at (seconds since the Unix epoch)
    pub iat: i64,
    /// Expiration time (seconds since the Unix epoch)
    pub exp: i64,
}

impl Claims {
    pub fn new(user: &User, token_type: TokenType, expiration_hours: i64) -> Self {
        let iat = Timestamp::now().as_second();

        Self {
            sub: user.id.to_string(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            token_type,
            jti: Uuid::new_v4().to_string(),
            iat,
            exp: iat + expiration_hours * SECONDS_PER_HOUR,
        }
    }

    /// The user id carried in `sub`
    pub fn user_id(&self) -> Result<i32, TokenError> {
        self.sub
            .parse()
            .map_err(|_| TokenError::Invalid(format!("subject '{}' is not a user id", self.sub)))
    }
}

/// An access/refresh token pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tokens {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("invalid token type: expected {expected:?}, got {actual:?}")]
    WrongType {
        expected: TokenType,
        actual: TokenType,
    },

    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            _ => TokenError::Invalid(e.to_string()),
        }
    }
}

/// Issues and validates signed tokens for users.
pub trait TokenIssuer: Send + Sync {
    /// Signs a short-lived access token.
    fn issue_access(&self, user: &User) -> Result<String, TokenError>;

    /// Signs a fresh access/refresh pair.
    fn issue(&self, user: &User) -> Result<Tokens, TokenError>;

    /// Decodes `token`, checking signature, expiry and type.
    fn validate(&self, token: &str, expected: TokenType) -> Result<Claims, TokenError>;
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiration_hours: i64,
}

impl SigningKeys {
    fn new(secret: &str, expiration_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiration_hours,
        }
    }
}

/// HS256 token issuer with separate access and refresh secrets
pub struct JwtIssuer {
    access: SigningKeys,
    refresh: SigningKeys,
    validation: Validation,
}

impl JwtIssuer {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            access: SigningKeys::new(&config.access_secret, config.access_token_expiration),
            refresh: SigningKeys::new(&config.refresh_secret, config.refresh_token_expiration),
            validation: Validation::default(),
        }
    }

    fn keys(&self, token_type: TokenType) -> &SigningKeys {
        match token_type {
            TokenType::Access => &self.access,
            TokenType::Refresh => &self.refresh,
        }
    }

    fn sign(&self, user: &User, token_type: TokenType) -> Result<String, TokenError> {
        let keys = self.keys(token_type);
        let claims = Claims::new(user, token_type, keys.expiration_hours);

        encode(&Header::default(), &claims, &keys.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }
}

impl TokenIssuer for JwtIssuer {
    fn issue_access(&self, user: &User) -> Result<String, TokenError> {
        self.sign(user, TokenType::Access)
    }

    fn issue(&self, user: &User) -> Result<Tokens, TokenError> {
        Ok(Tokens {
            access_token: self.sign(user, TokenType::Access)?,
            refresh_token: self.sign(user, TokenType::Refresh)?,
        })
    }

    fn validate(&self, token: &str, expected: TokenType) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.keys(expected).decoding, &self.validation)?.claims;

        if claims.token_type != expected {
            return Err(TokenError::WrongType {
                expected,
                actual: claims.token_type,
            });
        }

        Ok(claims)
    }
}
