/// User Account Routes
///
/// Registration, login, token refresh, logout, password change and the
/// current-user lookup. Everything token related is delegated to the
/// `TokenAuthority`; these handlers only validate input and shape responses.

use actix_web::{web, HttpRequest, HttpResponse, HttpResponseBuilder};
use serde::{Deserialize, Serialize};

use crate::auth::{
    hash_password, validate_password_strength, CookiePolicy, TokenAuthority, TokenPair,
    REFRESH_TOKEN_COOKIE,
};
use crate::error::{AppError, AuthError, ErrorContext, ValidationError};
use crate::middleware::AuthenticatedUser;
use crate::routes::ApiResponse;
use crate::store::{NewUser, UserRecord, UserStore};
use crate::validators::{is_valid_email, is_valid_media_url, is_valid_name, is_valid_username};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub full_name: String,
    pub email: String,
    pub username: String,
    pub password: String,
    pub avatar: String,
    #[serde(default)]
    pub cover_image: Option<String>,
}

/// Login accepts `identifier`, or the original `username` / `email` fields
#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub password: String,
}

impl LoginRequest {
    fn identifier(&self) -> Result<&str, ValidationError> {
        [&self.identifier, &self.username, &self.email]
            .into_iter()
            .flatten()
            .map(|value| value.trim())
            .find(|value| !value.is_empty())
            .ok_or_else(|| ValidationError::EmptyField("username or email".to_string()))
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// Public view of a user record; never includes the hash or refresh token
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&UserRecord> for UserResponse {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id.to_string(),
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            avatar: user.avatar.clone(),
            cover_image: user.cover_image.clone(),
            created_at: user.created_at.to_rfc3339(),
            updated_at: user.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenData {
    pub access_token: String,
    pub refresh_token: String,
}

impl From<TokenPair> for TokenData {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        }
    }
}

fn set_session_cookies(builder: &mut HttpResponseBuilder, policy: &CookiePolicy, pair: &TokenPair) {
    for cookie in policy.session_cookies(pair) {
        builder.cookie(cookie);
    }
}

fn clear_session_cookies(builder: &mut HttpResponseBuilder, policy: &CookiePolicy) {
    for cookie in policy.cleared_cookies() {
        builder.cookie(cookie);
    }
}

/// POST /api/v1/users/register
///
/// # Errors
/// - 400: Validation errors (email, username, full name, avatar, password)
/// - 409: Email or username already registered
pub async fn register(
    form: web::Json<RegisterRequest>,
    store: web::Data<dyn UserStore>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_registration");
    let form = form.into_inner();

    let email = is_valid_email(&form.email)?;
    let username = is_valid_username(&form.username)?;
    let full_name = is_valid_name(&form.full_name)?;
    let avatar = is_valid_media_url("avatar", &form.avatar)?;
    let cover_image = match form.cover_image.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => is_valid_media_url("coverImage", url)?,
        _ => String::new(),
    };

    let password = form.password;
    let password_hash = web::block(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))??;

    let user = store
        .insert(NewUser {
            username,
            email,
            full_name,
            avatar,
            cover_image,
            password_hash,
        })
        .await
        .map_err(|e| {
            let err = AppError::from(e);
            context.log_error(&err);
            err
        })?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user.id,
        "User registered successfully"
    );

    Ok(HttpResponse::Created().json(ApiResponse::new(
        201,
        UserResponse::from(&user),
        "Successfully registered",
    )))
}

/// POST /api/v1/users/login
///
/// Sets `accessToken` / `refreshToken` cookies and returns both tokens.
///
/// # Errors
/// - 400: Missing identifier, unknown account or wrong password; the last
///   two are indistinguishable
pub async fn login(
    form: web::Json<LoginRequest>,
    authority: web::Data<TokenAuthority>,
    cookies: web::Data<CookiePolicy>,
) -> Result<HttpResponse, AppError> {
    let identifier = form.identifier()?;

    let (user, pair) = authority
        .login(identifier, &form.password)
        .await
        .map_err(|e| match e {
            AuthError::NotFound => AuthError::InvalidCredential,
            other => other,
        })?;

    let mut response = HttpResponse::Ok();
    set_session_cookies(&mut response, &cookies, &pair);

    Ok(response.json(ApiResponse::new(
        200,
        LoginData {
            user: UserResponse::from(&user),
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        },
        "Successfully logged in",
    )))
}

/// POST /api/v1/users/refresh-token
///
/// Reads the refresh token from the `refreshToken` cookie, falling back to
/// the JSON body, and rotates it.
///
/// # Errors
/// - 401: Missing, invalid or expired token (`TOKEN_INVALID`), or a
///   superseded one (`TOKEN_REUSE_DETECTED`)
pub async fn refresh_access_token(
    req: HttpRequest,
    body: Option<web::Json<RefreshRequest>>,
    authority: web::Data<TokenAuthority>,
    cookies: web::Data<CookiePolicy>,
) -> Result<HttpResponse, AppError> {
    let from_cookie = req
        .cookie(REFRESH_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty());
    let from_body = body
        .and_then(|b| b.into_inner().refresh_token)
        .filter(|v| !v.is_empty());

    let presented = from_cookie
        .or(from_body)
        .ok_or(AuthError::MissingToken)?;

    let pair = authority.rotate(&presented).await?;

    let mut response = HttpResponse::Ok();
    set_session_cookies(&mut response, &cookies, &pair);

    Ok(response.json(ApiResponse::new(
        200,
        TokenData::from(pair),
        "Access token refreshed",
    )))
}

/// POST /api/v1/users/logout
///
/// **Requires valid access token.** Revokes the refresh token and clears
/// both cookies.
pub async fn logout(
    user: web::ReqData<AuthenticatedUser>,
    authority: web::Data<TokenAuthority>,
    cookies: web::Data<CookiePolicy>,
) -> Result<HttpResponse, AppError> {
    authority.revoke(user.id).await?;

    let mut response = HttpResponse::Ok();
    clear_session_cookies(&mut response, &cookies);

    Ok(response.json(ApiResponse::new(200, serde_json::json!({}), "Successfully logged out")))
}

/// POST /api/v1/users/change-password
///
/// **Requires valid access token.** Revokes the refresh token as well, so
/// the cookies are cleared and the client must log in again.
///
/// # Errors
/// - 400: Weak new password or wrong old password
pub async fn change_current_password(
    user: web::ReqData<AuthenticatedUser>,
    form: web::Json<ChangePasswordRequest>,
    authority: web::Data<TokenAuthority>,
    cookies: web::Data<CookiePolicy>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("change_password").with_user_id(user.id.to_string());
    validate_password_strength(&form.new_password)?;

    authority
        .change_password(user.id, &form.old_password, &form.new_password)
        .await
        .map_err(|e| {
            let err = AppError::from(e);
            context.log_error(&err);
            err
        })?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user.id,
        "Password changed, refresh token revoked"
    );

    let mut response = HttpResponse::Ok();
    clear_session_cookies(&mut response, &cookies);

    Ok(response.json(ApiResponse::new(200, serde_json::json!({}), "Password changed successfully")))
}

/// GET /api/v1/users/current-user
///
/// **Requires valid access token.**
///
/// # Errors
/// - 404: The account was deleted after the token was issued
pub async fn get_current_user(
    user: web::ReqData<AuthenticatedUser>,
    store: web::Data<dyn UserStore>,
) -> Result<HttpResponse, AppError> {
    let record = store
        .find_by_id(user.id)
        .await?
        .ok_or(AuthError::NotFound)?;

    Ok(HttpResponse::Ok().json(ApiResponse::new(
        200,
        UserResponse::from(&record),
        "Current user fetched successfully",
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login_request(json: serde_json::Value) -> LoginRequest {
        serde_json::from_value(json).expect("Failed to parse login request")
    }

    #[test]
    fn test_login_identifier_precedence() {
        let req = login_request(serde_json::json!({
            "identifier": "alice", "email": "bob@example.com", "password": "x"
        }));
        assert_eq!(req.identifier().unwrap(), "alice");

        let req = login_request(serde_json::json!({
            "username": " ", "email": "bob@example.com", "password": "x"
        }));
        assert_eq!(req.identifier().unwrap(), "bob@example.com");
    }

    #[test]
    fn test_login_without_identifier() {
        let req = login_request(serde_json::json!({ "password": "x" }));
        assert!(req.identifier().is_err());
    }

    #[test]
    fn test_user_response_hides_secrets() {
        let user = UserRecord {
            id: uuid::Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            full_name: "Alice Liddell".to_string(),
            avatar: "https://cdn.example.com/alice.png".to_string(),
            cover_image: String::new(),
            password_hash: "secret-hash".to_string(),
            refresh_token: Some("secret-token".to_string()),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };

        let json = serde_json::to_string(&UserResponse::from(&user)).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(!json.contains("secret-token"));
        assert!(json.contains("fullName"));
    }
}
