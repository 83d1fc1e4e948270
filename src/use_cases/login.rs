use serde::{Deserialize, Serialize};

use crate::monad::Task;
use crate::services::{AuthError, AuthService};
use crate::use_cases::UseCase;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginPort {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginResult {
    pub access_token: String,
}

/// Exchanges credentials for an access token.
#[derive(Clone)]
pub struct LoginUseCase {
    auth: AuthService,
}

impl LoginUseCase {
    pub fn new(auth: AuthService) -> Self {
        Self { auth }
    }
}

impl UseCase for LoginUseCase {
    type Port = LoginPort;
    type Output = LoginResult;
    type Error = AuthError;

    fn execute(&self, port: LoginPort) -> Task<LoginResult, AuthError> {
        self.auth
            .login(&port.email, &port.password)
            .pipe(|access_token| LoginResult { access_token })
    }
}
