//! Credential primitives: argon2 hashing and signed JWTs.

pub mod jwt;
pub mod password;

pub use jwt::{Claims, JwtIssuer, TokenError, TokenIssuer, TokenType, Tokens};
pub use password::{Argon2Hashing, PasswordError, PasswordHashing};
