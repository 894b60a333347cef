//! Login and logout.

use std::path::Path;

use medicart_cart::{AuthStatus, AuthTransition, MigrationReport};
use secrecy::SecretString;

use super::{CommandError, Session};

/// Sign in with `token` and move the guest cart to the server.
///
/// The token is not stored; pass it to later commands through
/// `MEDICART_TOKEN`.
pub async fn login(storage_dir: &Path, token: SecretString) -> Result<MigrationReport, CommandError> {
    let session = Session::connect(storage_dir, None).await?;
    session.manager.load().await?;
    session.client.set_token(token).await;

    let transition = session
        .manager
        .on_auth_state_changed(AuthStatus::Guest, AuthStatus::Authenticated)
        .await;
    match transition {
        AuthTransition::Migrated(report) => Ok(report),
        AuthTransition::Unchanged | AuthTransition::LoggedOut => Ok(MigrationReport::skipped()),
    }
}

/// Drop the session token and show the guest cart again.
pub async fn logout(
    storage_dir: &Path,
    token: Option<SecretString>,
) -> Result<Session, CommandError> {
    let had_token = token.is_some();
    let session = Session::connect(storage_dir, token).await?;
    session.client.clear_token().await;

    let prev = AuthStatus::from_logged_in(had_token);
    let transition = session
        .manager
        .on_auth_state_changed(prev, AuthStatus::Guest)
        .await;
    if matches!(transition, AuthTransition::Unchanged) {
        session.manager.load().await?;
    }
    tracing::info!(?transition, "Signed out");
    Ok(session)
}
