use std::sync::Arc;

use anyhow::Context;
use pledge_rs::config::ConfigLoader;
use pledge_rs::logger::init_logger;
use pledge_rs::presentation::{AuthController, LoginRequest, RefreshRequest, SignUpRequest};
use pledge_rs::repositories::InMemoryUserRepository;
use pledge_rs::services::AuthService;
use pledge_rs::utils::{Argon2Hashing, JwtIssuer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let loader = ConfigLoader::new()?;
    let settings = loader.load().context("failed to load configuration")?;

    init_logger(settings.logger.clone().into_logger_config()?)?;

    tracing::info!(
        name = %settings.application.name,
        version = pledge_rs::pkg_version(),
        environment = %loader.environment(),
        "starting"
    );

    let hasher = Argon2Hashing::new(&settings.password)?;
    let issuer = JwtIssuer::new(&settings.jwt);
    let auth = AuthService::new(
        Arc::new(InMemoryUserRepository::new()),
        Arc::new(hasher),
        Arc::new(issuer),
    );
    let controller = AuthController::new(auth);

    let tokens = controller
        .sign_up(SignUpRequest {
            email: "ada@example.com".to_string(),
            password: "analytical-engine".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
        })
        .await?;

    let login = controller
        .login(LoginRequest {
            email: "ada@example.com".to_string(),
            password: "analytical-engine".to_string(),
        })
        .await?;

    let user = controller.me(&login.access_token).await?;
    tracing::info!(user_id = user.id, name = %user.full_name(), "signed up and logged in");

    let refreshed = controller
        .refresh(RefreshRequest {
            user_id: user.id,
            refresh_token: tokens.refresh_token,
        })
        .await?;
    controller.sign_out(&refreshed.access_token).await?;

    tracing::info!("done");
    Ok(())
}
