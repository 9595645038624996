use anyhow::Context;
use lazy_static::lazy_static;
use regex::Regex;
use sqlx::SqliteConnection;
use tracing::{info, warn};

use super::{
    jwt::JwtKeys,
    password,
    repo_types::{NewUser, User, UserChanges},
    AuthError,
};
use crate::{error::AppError, store::Repository};

const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_.-]{3,32}$").unwrap();
    }
    USERNAME_RE.is_match(username)
}

fn check_username(username: &str) -> Result<(), AppError> {
    if !is_valid_username(username) {
        return Err(AppError::Validation(
            "username must be 3-32 characters of letters, digits, '_', '.' or '-'".into(),
        ));
    }
    Ok(())
}

fn check_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn username_taken(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return AppError::Conflict("Username already taken".into());
        }
    }
    e.into()
}

/// Check `username`/`password` against the credential store and sign a token.
pub async fn issue_token(
    conn: &mut SqliteConnection,
    keys: &JwtKeys,
    username: &str,
    password: &str,
) -> Result<String, AuthError> {
    let user = User::find_by_username(conn, username)
        .await
        .context("find user by username")?;

    let Some(user) = user else {
        password::decoy_verify(password);
        warn!(%username, "login unknown username");
        return Err(AuthError::InvalidCredentials);
    };

    if user.disabled {
        password::decoy_verify(password);
        warn!(%username, user_id = %user.id, "login for disabled user");
        return Err(AuthError::InvalidCredentials);
    }

    if !password::matches(password, &user.password_hash) {
        warn!(%username, user_id = %user.id, "login invalid password");
        return Err(AuthError::InvalidCredentials);
    }

    let token = keys.sign(&user.username)?;
    info!(%username, user_id = %user.id, "user logged in");
    Ok(token)
}

pub async fn create_user(
    conn: &mut SqliteConnection,
    username: &str,
    password: &str,
) -> Result<User, AppError> {
    let username = username.trim();
    check_username(username)?;
    check_password(password)?;

    let password_hash = password::hash(password)?;
    let user = Repository::<User>::create(
        conn,
        NewUser {
            username: username.to_owned(),
            password_hash,
        },
    )
    .await
    .map_err(username_taken)?;

    info!(username = %user.username, user_id = %user.id, "user created");
    Ok(user)
}

/// Partial update; a new password is validated and re-hashed.
pub async fn update_user(
    conn: &mut SqliteConnection,
    id: uuid::Uuid,
    username: Option<String>,
    password: Option<String>,
    disabled: Option<bool>,
) -> Result<User, AppError> {
    let username = username.map(|u| u.trim().to_owned());
    if let Some(u) = &username {
        check_username(u)?;
    }
    let password_hash = match password {
        Some(p) => {
            check_password(&p)?;
            Some(password::hash(&p)?)
        }
        None => None,
    };

    Repository::<User>::update(
        conn,
        id,
        UserChanges {
            username,
            password_hash,
            disabled,
        },
    )
    .await
    .map_err(username_taken)?
    .ok_or(AppError::NotFound)
}
