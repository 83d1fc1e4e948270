//! Request boundary.
//!
//! Controllers turn request DTOs into use-case ports, await the resulting
//! task once and convert its error into [`AppError`](crate::error::AppError).

mod auth_controller;
mod dto;

pub use auth_controller::AuthController;
pub use dto::{LoginRequest, LoginResponse, RefreshRequest, SignUpRequest, TokensResponse};
