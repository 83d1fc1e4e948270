use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppResult;
use crate::use_cases::{LoginPort, LoginResult, SignUpPort};
use crate::utils::Tokens;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "Password must be between 8 and 128 characters"))]
    pub password: String,
}

impl LoginRequest {
    pub fn into_port(self) -> AppResult<LoginPort> {
        self.validate()?;

        Ok(LoginPort {
            email: self.email,
            password: self.password,
        })
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "Password must be between 8 and 128 characters"))]
    pub password: String,
    #[serde(default)]
    #[validate(length(max = 50, message = "First name must be at most 50 characters"))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 50, message = "Last name must be at most 50 characters"))]
    pub last_name: String,
}

impl SignUpRequest {
    pub fn into_port(self) -> AppResult<SignUpPort> {
        self.validate()?;

        Ok(SignUpPort {
            email: self.email,
            password: self.password,
            first_name: self.first_name,
            last_name: self.last_name,
        })
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(range(min = 1, message = "User id must be positive"))]
    pub user_id: i32,
    #[validate(length(min = 1, message = "Refresh token cannot be empty"))]
    pub refresh_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
}

impl From<LoginResult> for LoginResponse {
    fn from(result: LoginResult) -> Self {
        Self {
            access_token: result.access_token,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokensResponse {
    pub access_token: String,
    pub refresh_token: String,
}

impl From<Tokens> for TokensResponse {
    fn from(tokens: Tokens) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        }
    }
}
