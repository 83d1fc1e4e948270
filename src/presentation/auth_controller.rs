use std::time::Instant;

use tracing::Instrument;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::User;
use crate::presentation::dto::{
    LoginRequest, LoginResponse, RefreshRequest, SignUpRequest, TokensResponse,
};
use crate::services::AuthService;
use crate::use_cases::{LoginUseCase, SignUpUseCase, UseCase};

/// Authentication endpoints.
///
/// Each method awaits its task exactly once through `result_to_promise` and
/// converts the domain error into [`AppError`](crate::error::AppError).
#[derive(Clone)]
pub struct AuthController {
    login: LoginUseCase,
    sign_up: SignUpUseCase,
    auth: AuthService,
}

impl AuthController {
    pub fn new(auth: AuthService) -> Self {
        Self {
            login: LoginUseCase::new(auth.clone()),
            sign_up: SignUpUseCase::new(auth.clone()),
            auth,
        }
    }

    pub async fn login(&self, request: LoginRequest) -> AppResult<LoginResponse> {
        in_request_span("login", async {
            let port = request.into_port()?;
            let result = self.login.execute(port).result_to_promise().await?;
            Ok::<_, AppError>(result.into())
        })
        .await
    }

    pub async fn sign_up(&self, request: SignUpRequest) -> AppResult<TokensResponse> {
        in_request_span("sign_up", async {
            let port = request.into_port()?;
            let tokens = self.sign_up.execute(port).result_to_promise().await?;
            Ok::<_, AppError>(tokens.into())
        })
        .await
    }

    pub async fn refresh(&self, request: RefreshRequest) -> AppResult<TokensResponse> {
        in_request_span("refresh", async {
            request.validate()?;
            let tokens = self
                .auth
                .refresh_tokens(request.user_id, &request.refresh_token)
                .result_to_promise()
                .await?;
            Ok::<_, AppError>(tokens.into())
        })
        .await
    }

    /// Signs out the owner of `access_token`.
    pub async fn sign_out(&self, access_token: &str) -> AppResult<()> {
        let auth = self.auth.clone();
        let task = self
            .auth
            .authenticate(access_token)
            .pipe_task(move |user| auth.sign_out(user.id));

        in_request_span("sign_out", async { Ok::<_, AppError>(task.result_to_promise().await?) }).await
    }

    /// The user `access_token` belongs to.
    pub async fn me(&self, access_token: &str) -> AppResult<User> {
        let task = self.auth.authenticate(access_token);
        in_request_span("me", async { Ok::<_, AppError>(task.result_to_promise().await?) }).await
    }
}

/// Runs one request inside a span carrying a fresh request id, and logs its
/// outcome and duration.
async fn in_request_span<T, F>(operation: &'static str, request: F) -> AppResult<T>
where
    F: std::future::Future<Output = AppResult<T>>,
{
    let span = tracing::info_span!("request", operation, request_id = %Uuid::new_v4());

    async move {
        tracing::info!("request received");
        let start = Instant::now();
        let result = request.await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(_) => tracing::info!(duration_ms, "request completed"),
            Err(error) => tracing::warn!(%error, duration_ms, "request failed"),
        }
        result
    }
    .instrument(span)
    .await
}
