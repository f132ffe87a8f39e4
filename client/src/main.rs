//! Demo driver for the client core.
//!
//! Runs a scripted session against the in-memory backend: restore, tracked
//! operations, navigation, a realtime balance update and logout. Set
//! `CLIENT_BACKEND=api` to start against the configured REST gateway instead.
//! Variables may also be set in a `.env` file in the working directory.

use std::time::Duration;

use client::app::{App, Screen};
use client::core::config::ClientConfig;
use client::core::error::{RemoteError, Result};
use client::services::{api, memory::MemoryBackend};
use serde_json::json;
use shared::{AuthSession, UserProfile};

#[tokio::main]
async fn main() {
    // Before logging init: RUST_LOG may come from the file
    let env_file = client::core::config::load_env_file(".env");
    let _log_guard = client::debug::init();
    match env_file {
        Ok(true) => tracing::info!("Loaded .env"),
        Ok(false) => {}
        Err(e) => tracing::warn!(error = %e, "Ignoring .env"),
    }

    if let Err(e) = run().await {
        tracing::error!(error = %e, "Client demo failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = ClientConfig::from_env()?;
    config.validate()?;

    if std::env::var("CLIENT_BACKEND").as_deref() == Ok("api") {
        return run_against_api(config).await;
    }
    run_scripted(config).await
}

async fn run_against_api(config: ClientConfig) -> Result<()> {
    let (_api, providers) = api::connect(&config)?;
    let app = App::new(providers, config);

    let restored = app.start().await;
    tracing::info!(restored, screen = %app.navigation_state().screen, "Started against REST gateway");
    app.shutdown().await;
    Ok(())
}

async fn run_scripted(config: ClientConfig) -> Result<()> {
    let backend = seed_backend();
    let app = App::new(backend.providers(), config);
    let mut feedback = app.subscribe_feedback();

    tokio::spawn(async move {
        while feedback.changed().await.is_ok() {
            let state = feedback.borrow_and_update().clone();
            tracing::info!(
                phase = ?state.phase,
                message = state.message.as_deref().unwrap_or(""),
                failure_streak = state.failure_streak,
                "Feedback"
            );
        }
    });

    let restored = app.start().await;
    let snapshot = app.session_snapshot();
    tracing::info!(
        restored,
        user = snapshot.user_id.as_deref().unwrap_or("-"),
        balance = snapshot.profile.as_ref().and_then(|p| p.balance).unwrap_or_default(),
        "Session restored"
    );

    app.navigate(Screen::Deposit, Some(json!({ "method": "pix" }))).await;
    let receipt = app
        .call_procedure("request_deposit", json!({ "amount": 150.0 }), Some("Deposit requested"))
        .await?;
    tracing::info!(%receipt, "Deposit accepted");

    // Rejected twice: the second attempt waits out the backoff first
    for _ in 0..2 {
        if let Err(e) = app
            .call_procedure("request_withdrawal", json!({ "amount": 99999.0 }), None)
            .await
        {
            tracing::info!(
                raw = %e,
                shown = app.feedback_state().message.as_deref().unwrap_or(""),
                "Withdrawal rejected"
            );
        }
    }

    let mut update = UserProfile::with_id(DEMO_USER);
    update.full_name = Some("Ana Souza".to_string());
    update.balance = Some(1400.75);
    backend.push_profile_update(update);
    tracing::info!(
        balance = app.session_snapshot().profile.and_then(|p| p.balance).unwrap_or_default(),
        "Realtime balance update applied"
    );

    app.navigate(Screen::AccountHistory, None).await;
    let mounted = app.mount();
    tracing::info!(screen = mounted.screen.title(), "Mounted");

    tokio::time::sleep(Duration::from_millis(50)).await;
    app.logout().await;
    tracing::info!(screen = %app.navigation_state().screen, "Logged out");

    app.shutdown().await;
    Ok(())
}

const DEMO_USER: &str = "4f1c2a9e-77b0-4c1e-9a51-0d5e3b6f8a21";

fn seed_backend() -> MemoryBackend {
    let backend = MemoryBackend::new();

    let mut profile = UserProfile::with_id(DEMO_USER);
    profile.full_name = Some("Ana Souza".to_string());
    profile.email = Some("ana@example.com".to_string());
    profile.balance = Some(1250.75);
    backend.insert_profile(profile);

    backend.set_session(Some(AuthSession {
        access_token: "demo-access-token".to_string(),
        refresh_token: Some("demo-refresh-token".to_string()),
        user_id: DEMO_USER.to_string(),
        email: Some("ana@example.com".to_string()),
        expires_at: None,
    }));

    backend.register_procedure("request_deposit", |args| {
        Ok(json!({ "status": "pending", "amount": args["amount"] }))
    });
    backend.register_procedure("request_withdrawal", |args| {
        let amount = args["amount"].as_f64().unwrap_or_default();
        if amount > 1250.75 {
            Err(RemoteError::structured(
                "insufficient funds: balance 1250.75 < requested amount",
                Some("P0001".to_string()),
            ))
        } else {
            Ok(json!({ "status": "pending" }))
        }
    });
    backend.set_latency(Duration::from_millis(120));

    backend
}
