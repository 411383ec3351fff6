//! Accounts created by the server itself.

use anyhow::anyhow;

use crate::models::user::{User, UserRole};
use crate::state::AppState;
use crate::utils::password::hash_password;

pub const EXAMPLE_USERNAME: &str = "example";
pub const EXAMPLE_EMAIL: &str = "example@uxtracking.local";

/// Creates the example account on a fresh database when a password for it
/// is configured. Returns whether the account was created.
pub async fn ensure_example_user(state: &AppState) -> anyhow::Result<bool> {
    let Some(password) = state.config.example_user_password.as_deref() else {
        return Ok(false);
    };
    let existing = state
        .users
        .count()
        .await
        .map_err(|err| anyhow!("count users: {:?}", err))?;
    if existing > 0 {
        tracing::debug!(existing, "Users present, skipping example user");
        return Ok(false);
    }

    let user = User::new(
        EXAMPLE_USERNAME.to_string(),
        EXAMPLE_EMAIL.to_string(),
        hash_password(password)?,
        UserRole::User,
    );
    state
        .users
        .create(&user)
        .await
        .map_err(|err| anyhow!("create example user: {:?}", err))?;
    tracing::info!(username = EXAMPLE_USERNAME, "Created example user");
    Ok(true)
}
