use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::auth::dto::{LoginResponse, RegisterRequest};
use crate::auth::jwt::JwtKeys;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::repo::User;
use crate::error::ApiError;
use crate::state::AppState;

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn validate_username(username: &str) -> Result<(), ApiError> {
    let len = username.chars().count();
    if !(3..=50).contains(&len) {
        return Err(ApiError::Validation(
            "Username must be between 3 and 50 characters".into(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_password(password: &str) -> Result<(), ApiError> {
    let len = password.chars().count();
    if !(8..=128).contains(&len) {
        return Err(ApiError::Validation(
            "Password must be between 8 and 128 characters".into(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_alphabetic()) {
        return Err(ApiError::Validation(
            "Password must contain at least one letter".into(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(ApiError::Validation(
            "Password must contain at least one number".into(),
        ));
    }
    Ok(())
}

pub async fn register(state: &AppState, req: RegisterRequest) -> Result<User, ApiError> {
    let username = req.username.trim().to_string();
    validate_username(&username)?;

    let email = normalize_email(&req.email);
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(ApiError::Validation("Invalid email format".into()));
    }

    validate_password(&req.password)?;

    if User::find_by_email(&state.db, &email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(ApiError::Conflict("email"));
    }
    if User::find_by_username(&state.db, &username).await?.is_some() {
        warn!(username = %username, "username already registered");
        return Err(ApiError::Conflict("username"));
    }

    let hash = hash_password(&req.password)?;

    match User::create(&state.db, &username, &email, &hash).await {
        Ok(user) => {
            info!(user_id = %user.id, email = %user.email, "user registered");
            Ok(user)
        }
        Err(e) => {
            // Lost the check-then-insert race: the unique constraint is the arbiter
            if let Some(db_err) = e
                .downcast_ref::<sqlx::Error>()
                .and_then(|e| e.as_database_error())
            {
                if db_err.is_unique_violation() {
                    let field = if db_err.message().contains("username") {
                        "username"
                    } else {
                        "email"
                    };
                    return Err(ApiError::Conflict(field));
                }
            }
            Err(ApiError::Internal(e))
        }
    }
}

/// Verifies credentials and issues a bearer token. Unknown email and wrong
/// password produce the same error so callers cannot enumerate accounts.
pub async fn login(state: &AppState, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
    let email = normalize_email(email);

    let user = match User::find_by_email(&state.db, &email).await? {
        Some(u) => u,
        None => {
            warn!(email = %email, "login unknown email");
            return Err(ApiError::InvalidCredentials);
        }
    };

    if !verify_password(password, &user.password_hash)? {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    let keys = JwtKeys::from_ref(state);
    let access_token = keys.sign(&user.email)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(LoginResponse {
        access_token,
        token_type: "bearer".into(),
        user_id: user.id,
        username: user.username,
        email: user.email,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("alice@example.com"));
        assert!(is_valid_email("a.b+tag@sub.example.co"));
        assert!(!is_valid_email("alice"));
        assert!(!is_valid_email("alice@"));
        assert!(!is_valid_email("alice@example"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("alice @example.com"));
    }

    #[test]
    fn email_normalization() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn username_bounds() {
        assert!(validate_username("ab").is_err());
        assert!(validate_username("abc").is_ok());
        assert!(validate_username(&"x".repeat(50)).is_ok());
        assert!(validate_username(&"x".repeat(51)).is_err());
    }

    #[test]
    fn password_rules() {
        assert!(validate_password("short1").is_err());
        assert!(validate_password("lettersonly").is_err());
        assert!(validate_password("12345678").is_err());
        assert!(validate_password("letters42").is_ok());
        assert!(validate_password(&format!("a1{}", "x".repeat(127))).is_err());
    }
}
