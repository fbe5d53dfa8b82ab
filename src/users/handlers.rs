use axum::{
    extract::{FromRef, Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, instrument, warn};

use crate::auth::jwt::JwtKeys;
use crate::error::ServiceError;
use crate::state::AppState;

use super::dto::{
    ForgotPasswordRequest, LoginRequest, LoginResponse, ResetPasswordRequest, SignupRequest,
    UpdateUserRequest, UserView, VerifyOtpRequest,
};
use super::services;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/forgot-password", post(forgot_password))
        .route("/verify-otp", post(verify_otp))
        .route("/reset-password", post(reset_password))
        .route("/users", get(list_users))
        .route("/user/:id", get(get_user).put(update_user).delete(delete_user))
        .route("/user/:id/image", post(upload_image).get(get_image))
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn reject(err: ServiceError) -> (StatusCode, String) {
    let status = err.status();
    if status.is_server_error() {
        error!(error = %err, "request failed");
    } else {
        warn!(error = %err, "request rejected");
    }
    (status, err.to_string())
}

#[instrument(skip(state, payload))]
async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<Json<LoginResponse>, (StatusCode, String)> {
    if !is_valid_email(payload.email.trim()) {
        warn!("signup with invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }

    let user = services::signup(&state, payload).await.map_err(reject)?;
    let token = JwtKeys::from_ref(&state)
        .issue(&user.username)
        .map_err(|e| reject(ServiceError::Internal(e)))?;
    Ok(Json(LoginResponse { token, user }))
}

#[instrument(skip(state, payload))]
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, (StatusCode, String)> {
    let response = services::login(&state, &payload.email_or_mobile, &payload.password)
        .await
        .map_err(reject)?;
    Ok(Json(response))
}

#[instrument(skip(state, payload))]
async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<String, (StatusCode, String)> {
    services::forgot_password(&state, &payload.email_or_mobile)
        .await
        .map_err(reject)
}

#[instrument(skip(state, payload))]
async fn verify_otp(
    State(state): State<AppState>,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<String, (StatusCode, String)> {
    services::verify_otp(&state, &payload.email_or_mobile, &payload.otp)
        .await
        .map_err(reject)
}

#[instrument(skip(state, payload))]
async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<String, (StatusCode, String)> {
    services::reset_password(&state, &payload.email_or_mobile, &payload.new_password)
        .await
        .map_err(reject)
}

#[instrument(skip(state))]
async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserView>>, (StatusCode, String)> {
    let views = services::list_users(&state).await.map_err(reject)?;
    Ok(Json(views))
}

#[instrument(skip(state))]
async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<UserView>, (StatusCode, String)> {
    let view = services::get_user(&state, id).await.map_err(reject)?;
    Ok(Json(view))
}

#[instrument(skip(state, payload))]
async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserView>, (StatusCode, String)> {
    let view = services::update_user(&state, id, payload)
        .await
        .map_err(reject)?;
    Ok(Json(view))
}

#[instrument(skip(state))]
async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<String, (StatusCode, String)> {
    services::delete_user(&state, id).await.map_err(reject)
}

#[instrument(skip(state, multipart))]
async fn upload_image(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<Json<UserView>, (StatusCode, String)> {
    let mut image: Option<(Bytes, Option<String>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
    {
        if field.name() == Some("image") {
            let filename = field.file_name().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
            image = Some((bytes, filename));
        }
    }
    let Some((bytes, filename)) = image else {
        return Err((StatusCode::BAD_REQUEST, "missing image field".into()));
    };

    let view = services::upload_image(&state, id, bytes, filename.as_deref())
        .await
        .map_err(reject)?;
    Ok(Json(view))
}

#[instrument(skip(state))]
async fn get_image(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let bytes = services::get_image(&state, id).await.map_err(reject)?;
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape_check() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@sub.example.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a @x.com"));
        assert!(!is_valid_email("a@x"));
    }

    #[test]
    fn reject_maps_conflicts_to_409_with_the_field_list() {
        let (status, body) = reject(ServiceError::AlreadyExists(vec![
            "Username".to_string(),
            "Email".to_string(),
        ]));
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body, "Username, Email already exists");
    }
}
