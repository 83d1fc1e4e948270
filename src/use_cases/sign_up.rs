use serde::Deserialize;

use crate::models::NewUser;
use crate::monad::Task;
use crate::services::{AuthError, AuthService};
use crate::use_cases::UseCase;
use crate::utils::Tokens;

/// Registration data, with the password in plain text.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SignUpPort {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<SignUpPort> for NewUser {
    fn from(port: SignUpPort) -> Self {
        NewUser {
            email: port.email,
            password: port.password,
            first_name: port.first_name,
            last_name: port.last_name,
        }
    }
}

/// Registers a user and returns their first token pair.
#[derive(Clone)]
pub struct SignUpUseCase {
    auth: AuthService,
}

impl SignUpUseCase {
    pub fn new(auth: AuthService) -> Self {
        Self { auth }
    }
}

impl UseCase for SignUpUseCase {
    type Port = SignUpPort;
    type Output = Tokens;
    type Error = AuthError;

    fn execute(&self, port: SignUpPort) -> Task<Tokens, AuthError> {
        self.auth.sign_up(port.into())
    }
}
