//! Authentication service: registration and login flows over
//! `sns_core::auth`.

use sns_core::auth::password::{hash_password, verify_password};
use sns_core::auth::{AuthError, SessionService, UserDirectory};
use sns_core::models::auth::{NewUser, TokenPair, UserAccount};
use tracing::info;

use crate::error::{AppError, AppResult};

const MIN_PASSWORD_LEN: usize = 8;
const MIN_USERNAME_LEN: usize = 3;
const MAX_USERNAME_LEN: usize = 50;

fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

/// Check registration input, returning the first problem found.
pub fn validate_registration(email: &str, username: &str, password: &str) -> AppResult<()> {
    if !is_plausible_email(email) {
        return Err(AppError::Validation("Invalid email address".into()));
    }
    let username_len = username.chars().count();
    if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&username_len) {
        return Err(AppError::Validation(format!(
            "Username must be between {MIN_USERNAME_LEN} and {MAX_USERNAME_LEN} characters"
        )));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Register a new account. Accounts start pending until approved.
pub async fn register(
    users: &dyn UserDirectory,
    email: &str,
    username: &str,
    password: &str,
) -> AppResult<UserAccount> {
    let email = email.trim();
    let username = username.trim();
    validate_registration(email, username, password)?;

    let account = users
        .create(NewUser {
            email: email.to_string(),
            username: username.to_string(),
            password_hash: hash_password(password)?,
        })
        .await?;
    info!(user_id = account.id, "user registered");
    Ok(account)
}

/// Authenticate with email + password and start a session.
///
/// Unknown email and wrong password produce the same error.
pub async fn login(
    users: &dyn UserDirectory,
    sessions: &SessionService,
    email: &str,
    password: &str,
) -> AppResult<(UserAccount, TokenPair)> {
    let credentials = users
        .find_credentials_by_email(email.trim())
        .await?
        .ok_or(AuthError::CredentialError)?;

    if !verify_password(password, &credentials.password_hash)? {
        return Err(AuthError::CredentialError.into());
    }

    let pair = sessions.login(credentials.account.id).await?;
    Ok((credentials.account, pair))
}
