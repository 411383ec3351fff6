use axum::{
    extract::{rejection::JsonRejection, Extension, State},
    http::header,
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        envelope::Envelope,
        user::{
            ChangePasswordRequest, LoginRequest, LoginResponse, RecoverPasswordRequest,
            RegisterRequest, User, UserResponse, UserRole,
        },
    },
    state::AppState,
    types::UserId,
    utils::{
        cookies::{access_cookie, clear_access_cookie},
        jwt::{create_access_token, Claims},
        password::{generate_password, hash_password, verify_password},
    },
};

/// Signs a token for `user` and records its `jti` as active.
pub async fn issue_access_token(
    state: &AppState,
    user: &User,
) -> Result<(String, Claims), AppError> {
    let (token, claims) = create_access_token(
        user.id.to_string(),
        user.username.clone(),
        user.role.as_str().to_string(),
        &state.config.jwt_secret,
        state.config.jwt_expiration_hours,
    )?;
    state
        .tokens
        .insert(&claims.jti, user.id, claims.expires_at())
        .await?;
    Ok((token, claims))
}

fn password_matches(password: &str, hash: &str) -> Result<bool, AppError> {
    Ok(verify_password(password, hash)?)
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Envelope<UserId>, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    if state.users.find_by_email(&payload.email).await?.is_some() {
        return Err(AppError::Unauthorized(
            "Email already registered".to_string(),
        ));
    }
    if state
        .users
        .find_by_username(&payload.username)
        .await?
        .is_some()
    {
        return Err(AppError::Unauthorized("Username already in use".to_string()));
    }

    let password_hash = hash_password(&payload.password)?;
    let user = User::new(
        payload.username,
        payload.email,
        password_hash,
        UserRole::User,
    );
    let user = state.users.create(&user).await?;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");
    Ok(Envelope::ok("Registration successful", user.id))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    let user = state
        .users
        .find_by_username(&payload.username)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if !password_matches(&payload.password, &user.password_hash)? {
        tracing::warn!(username = %user.username, "Login with incorrect password");
        return Err(AppError::Unauthorized("Incorrect password".to_string()));
    }

    let (access_token, _) = issue_access_token(&state, &user).await?;
    let cookie = access_cookie(&access_token, &state.config);

    tracing::info!(user_id = %user.id, "User logged in");
    Ok((
        [(header::SET_COOKIE, cookie)],
        Envelope::ok(
            "Login successful",
            LoginResponse {
                id: user.id,
                access_token,
            },
        ),
    ))
}

/// Mails a freshly generated password to the account owner and signs out
/// every session of that account.
pub async fn recover_password(
    State(state): State<AppState>,
    payload: Result<Json<RecoverPasswordRequest>, JsonRejection>,
) -> Result<Envelope<()>, AppError> {
    let Json(payload) = payload?;
    let user = state
        .users
        .find_by_username(&payload.username)
        .await?
        .filter(|user| user.email.eq_ignore_ascii_case(payload.email.trim()))
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let password = generate_password();
    let password_hash = hash_password(&password)?;
    state
        .mailer
        .send_generated_password(&user.email, &user.username, &password)
        .await?;
    state.users.update_password(user.id, &password_hash).await?;
    let revoked = state.tokens.revoke_all_for_user(user.id).await?;

    tracing::info!(user_id = %user.id, revoked, "Password recovered");
    Ok(Envelope::message(
        "Password reset. Check your email inbox.",
    ))
}

pub async fn change_pass(
    State(state): State<AppState>,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<Envelope<()>, AppError> {
    let Json(payload) = payload?;
    let user = state
        .users
        .find_by_username(&payload.username)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if !password_matches(&payload.password, &user.password_hash)? {
        return Err(AppError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }
    if payload.newpassword != payload.confirm_newpassword {
        return Err(AppError::BadRequest(
            "New passwords do not match".to_string(),
        ));
    }
    if payload.newpassword.is_empty() {
        return Err(AppError::BadRequest(
            "New password must not be empty".to_string(),
        ));
    }

    let password_hash = hash_password(&payload.newpassword)?;
    state.users.update_password(user.id, &password_hash).await?;
    let revoked = state.tokens.revoke_all_for_user(user.id).await?;

    tracing::info!(user_id = %user.id, revoked, "Password changed");
    Ok(Envelope::message("Password changed successfully"))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    state.tokens.revoke(&claims.jti).await?;
    tracing::info!(user_id = %claims.sub, "User logged out");
    Ok((
        [(header::SET_COOKIE, clear_access_cookie(&state.config))],
        Envelope::<()>::message("Logout successful"),
    ))
}

pub async fn me(Extension(user): Extension<User>) -> Envelope<UserResponse> {
    Envelope::ok("Success", UserResponse::from(user))
}
