/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /api/auth/register` - Register a new user
/// - `POST /api/auth/login` - Login and get tokens
/// - `POST /api/auth/refresh` - Exchange a refresh token for an access token

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{Trim, ValidatedJson},
    response::Envelope,
};
use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use tremu_shared::{
    auth::{jwt, password},
    models::user::{normalize_email, CreateUser, User},
};
use validator::{Validate, ValidationError};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Email address
    #[validate(
        email(message = "Invalid email format"),
        length(max = 255, message = "Email must be at most 255 characters")
    )]
    pub email: String,

    /// Display name
    #[validate(length(min = 2, max = 100, message = "Name must be between 2 and 100 characters"))]
    pub name: String,

    /// Password, checked for strength
    #[validate(custom(function = "strong_password"))]
    pub password: String,
}

impl Trim for RegisterRequest {
    fn trim(self) -> Self {
        Self {
            email: normalize_email(&self.email),
            name: self.name.trim().to_string(),
            password: self.password,
        }
    }
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(
        email(message = "Invalid email format"),
        length(max = 255, message = "Email must be at most 255 characters")
    )]
    pub email: String,

    /// Password
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl Trim for LoginRequest {
    fn trim(self) -> Self {
        Self {
            email: normalize_email(&self.email),
            password: self.password,
        }
    }
}

/// Refresh token request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    /// Refresh token
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

impl Trim for RefreshRequest {
    fn trim(self) -> Self {
        Self {
            refresh_token: self.refresh_token.trim().to_string(),
        }
    }
}

/// Register and login response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    /// The authenticated user
    pub user: User,

    /// Access token (24h)
    pub token: String,

    /// Refresh token (30d)
    pub refresh_token: String,
}

/// Refresh token response
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// New access token (24h)
    pub token: String,
}

fn strong_password(password: &str) -> Result<(), ValidationError> {
    password::validate_password_strength(password).map_err(|message| {
        let mut error = ValidationError::new("password_strength");
        error.message = Some(message.into());
        error
    })
}

fn issue_tokens(state: &AppState, user: User) -> ApiResult<AuthResponse> {
    let access_claims = jwt::Claims::new(user.id, jwt::TokenType::Access);
    let refresh_claims = jwt::Claims::new(user.id, jwt::TokenType::Refresh);

    Ok(AuthResponse {
        token: jwt::create_token(&access_claims, state.jwt_secret())?,
        refresh_token: jwt::create_token(&refresh_claims, state.jwt_secret())?,
        user,
    })
}

/// Register a new user
///
/// ```text
/// POST /api/auth/register
///
/// { "email": "ana@example.com", "name": "Ana", "password": "kanban2024" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: validation failed
/// - `409 Conflict`: email already registered
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> ApiResult<Envelope<AuthResponse>> {
    if User::find_by_email(&state.db, &req.email).await?.is_some() {
        warn!(email = %req.email, "Registration with existing email");
        return Err(ApiError::Conflict("Email already registered".to_string()));
    }

    let password_hash = password::hash_password(&req.password)?;

    // The unique index still catches a concurrent registration
    let user = User::create(
        &state.db,
        CreateUser {
            email: req.email,
            name: req.name,
            password_hash,
        },
    )
    .await?;

    info!(user_id = user.id, "User registered");
    Ok(Envelope::created("User registered successfully", issue_tokens(&state, user)?))
}

/// Login endpoint
///
/// Unknown email and wrong password get the same 401 message, and both
/// pay for one Argon2 verification.
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> ApiResult<Envelope<AuthResponse>> {
    let Some(user) = User::find_by_email(&state.db, &req.email).await? else {
        password::verify_dummy_password(&req.password)?;
        warn!("Failed login for unknown email");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };

    if !password::verify_password(&req.password, &user.password_hash)? {
        warn!(user_id = user.id, "Failed login");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    info!(user_id = user.id, "User logged in");
    Ok(Envelope::ok("Login successful", issue_tokens(&state, user)?))
}

/// Token refresh endpoint
///
/// # Errors
///
/// - `401 Unauthorized`: invalid or expired refresh token, or the user is gone
pub async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RefreshRequest>,
) -> ApiResult<Envelope<RefreshResponse>> {
    let claims = jwt::validate_refresh_token(&req.refresh_token, state.jwt_secret())
        .map_err(|_| ApiError::Unauthorized("Invalid refresh token".to_string()))?;

    if User::find_by_id(&state.db, claims.sub).await?.is_none() {
        return Err(ApiError::Unauthorized("Invalid refresh token".to_string()));
    }

    let token = jwt::refresh_access_token(&req.refresh_token, state.jwt_secret())?;
    Ok(Envelope::ok("Token refreshed", RefreshResponse { token }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_trim_and_validate() {
        let req = RegisterRequest {
            email: "  Ana@Example.COM ".to_string(),
            name: "  Ana ".to_string(),
            password: " kanban2024 ".to_string(),
        }
        .trim();

        assert_eq!(req.email, "ana@example.com");
        assert_eq!(req.name, "Ana");
        assert_eq!(req.password, " kanban2024 ");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_register_request_rejects_weak_password() {
        let req = RegisterRequest {
            email: "ana@example.com".to_string(),
            name: "Ana".to_string(),
            password: "password".to_string(),
        };

        let errors = req.validate().unwrap_err();
        let field_errors = errors.field_errors();
        let password_errors = field_errors.get("password").unwrap();
        assert_eq!(
            password_errors[0].message.as_deref(),
            Some("Password must contain at least one digit")
        );
    }

    #[test]
    fn test_register_request_rejects_short_name_and_bad_email() {
        let req = RegisterRequest {
            email: "nope".to_string(),
            name: "A".to_string(),
            password: "kanban2024".to_string(),
        };

        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("name"));
        assert!(!fields.contains_key("password"));
    }

    // 264 characters, well-formed otherwise
    fn overlong_email() -> String {
        format!("{}@{}com", "u".repeat(10), "abcdefghi.".repeat(25))
    }

    #[test]
    fn test_overlong_email_is_a_validation_error() {
        let email = overlong_email();
        assert_eq!(email.len(), 264);

        let register = RegisterRequest {
            email: email.clone(),
            name: "Ana".to_string(),
            password: "kanban2024".to_string(),
        };
        let errors = register.validate().unwrap_err();
        let email_errors = errors.field_errors().get("email").cloned().unwrap();
        assert_eq!(email_errors.len(), 1);
        assert_eq!(email_errors[0].code, "length");
        assert_eq!(
            email_errors[0].message.as_deref(),
            Some("Email must be at most 255 characters")
        );

        let login = LoginRequest {
            email,
            password: "kanban2024".to_string(),
        };
        let errors = login.validate().unwrap_err();
        assert_eq!(errors.field_errors().get("email").unwrap()[0].code, "length");
    }

    #[test]
    fn test_refresh_request_uses_camel_case() {
        let req: RefreshRequest = serde_json::from_str(r#"{"refreshToken":"abc"}"#).unwrap();
        assert_eq!(req.refresh_token, "abc");
    }
}
