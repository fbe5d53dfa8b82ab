use axum::extract::FromRef;
use bytes::Bytes;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::jwt::JwtKeys;
use crate::auth::otp::generate_otp;
use crate::auth::password::{hash_password, verify_password};
use crate::error::{CredentialFailure, ServiceError, StorageError};
use crate::state::AppState;

use super::dto::{LoginResponse, SignupRequest, UpdateUserRequest, UserView};
use super::repo_types::NewUser;

const OTP_SUBJECT: &str = "Your OTP for Password Reset";

/// Register a new user. Uniqueness over username, email and mobile number
/// is enforced by the repository's conditional insert; a conflict names
/// every colliding field.
#[instrument(skip(state, request), fields(username = %request.username))]
pub async fn signup(state: &AppState, request: SignupRequest) -> Result<UserView, ServiceError> {
    let password_hash = hash_password(&request.password)?;
    let user = state
        .users
        .insert(NewUser {
            username: request.username,
            name: request.name,
            email: request.email,
            password_hash,
            mobile_number: request.mobile_number,
            role: request.role,
            phone: request.phone,
            address: request.address,
            gender: request.gender,
            dob: request.dob,
            status: request.status,
        })
        .await?;
    info!(user_id = user.id, "user registered");
    Ok(user.into())
}

/// Authenticate by username or email and mint a bearer token. More than
/// one match means the uniqueness invariant is broken; surfaced as a
/// login failure rather than silently picking a record.
#[instrument(skip(state, password))]
pub async fn login(
    state: &AppState,
    identifier: &str,
    password: &str,
) -> Result<LoginResponse, ServiceError> {
    let identifier = identifier.trim();
    let password = password.trim();

    let mut matches = state.users.find_by_username_or_email(identifier).await?;
    if matches.len() > 1 {
        warn!(identifier, count = matches.len(), "identifier matches multiple accounts");
        return Err(ServiceError::InvalidCredentials(CredentialFailure::Ambiguous));
    }
    let Some(user) = matches.pop() else {
        warn!(identifier, "no matching account");
        return Err(ServiceError::InvalidCredentials(CredentialFailure::NotFound));
    };

    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = user.id, "incorrect password");
        return Err(ServiceError::InvalidCredentials(CredentialFailure::BadPassword));
    }

    let token = JwtKeys::from_ref(state).issue(&user.username)?;
    info!(user_id = user.id, "user logged in");
    Ok(LoginResponse {
        token,
        user: user.into(),
    })
}

/// Issue a recovery code and mail it to the account's address. This
/// endpoint answers conversationally: blank input and unknown
/// identifiers come back as messages, never as errors.
#[instrument(skip(state))]
pub async fn forgot_password(state: &AppState, identifier: &str) -> Result<String, ServiceError> {
    if identifier.trim().is_empty() {
        return Ok("Email cannot be empty.".to_string());
    }

    let Some(mut user) = state
        .users
        .find_first_by_email_or_mobile_number(identifier)
        .await?
    else {
        return Ok(format!("User not found with email: {identifier}"));
    };

    let otp = generate_otp();
    user.otp = Some(otp.clone());
    let user = state.users.update(user).await?;

    state
        .notifier
        .send(&user.email, OTP_SUBJECT, &format!("Your OTP is: {otp}"))
        .await?;
    info!(user_id = user.id, "recovery code issued");
    Ok(format!("OTP sent to {}", user.email))
}

/// Check a submitted recovery code. The stored code is cleared on the
/// one successful verification and survives failed attempts.
#[instrument(skip(state, otp))]
pub async fn verify_otp(
    state: &AppState,
    identifier: &str,
    otp: &str,
) -> Result<String, ServiceError> {
    if identifier.trim().is_empty() || otp.trim().is_empty() {
        return Ok("Email and OTP cannot be empty.".to_string());
    }

    let Some(mut user) = state
        .users
        .find_first_by_email_or_mobile_number(identifier)
        .await?
    else {
        return Ok(format!("User not found with email: {identifier}"));
    };

    if user.otp.as_deref() == Some(otp) {
        user.otp = None;
        state.users.update(user).await?;
        info!("recovery code verified");
        Ok("OTP verified successfully.".to_string())
    } else {
        // stored code stays put so a correct retry can still succeed
        Ok("Invalid OTP.".to_string())
    }
}

/// Overwrite the password hash for the account behind `identifier`.
/// Deliberately independent of `verify_otp`; sequencing is the caller's
/// responsibility.
#[instrument(skip(state, new_password))]
pub async fn reset_password(
    state: &AppState,
    identifier: &str,
    new_password: &str,
) -> Result<String, ServiceError> {
    if identifier.trim().is_empty() || new_password.trim().is_empty() {
        return Ok("Email and new password cannot be empty.".to_string());
    }

    let Some(mut user) = state
        .users
        .find_first_by_email_or_mobile_number(identifier)
        .await?
    else {
        return Ok(format!("User not found with email: {identifier}"));
    };

    user.password_hash = hash_password(new_password)?;
    user.otp = None;
    let user = state.users.update(user).await?;
    info!(user_id = user.id, "password reset");
    Ok("Password reset successfully.".to_string())
}

pub async fn list_users(state: &AppState) -> Result<Vec<UserView>, ServiceError> {
    Ok(state
        .users
        .find_all()
        .await?
        .into_iter()
        .map(UserView::from)
        .collect())
}

pub async fn get_user(state: &AppState, id: i64) -> Result<UserView, ServiceError> {
    match state.users.find_by_id(id).await? {
        Some(user) => Ok(user.into()),
        None => Err(ServiceError::NotFound(id)),
    }
}

/// Overwrite the mutable profile fields. Uniqueness is re-validated by
/// the repository's conditional update, excluding the record itself.
#[instrument(skip(state, request))]
pub async fn update_user(
    state: &AppState,
    id: i64,
    request: UpdateUserRequest,
) -> Result<UserView, ServiceError> {
    let Some(mut user) = state.users.find_by_id(id).await? else {
        return Err(ServiceError::NotFound(id));
    };

    user.username = request.username;
    user.name = request.name;
    user.email = request.email;
    user.mobile_number = request.mobile_number;
    user.dob = request.dob;
    user.gender = request.gender;
    if let Some(password) = request.password.as_deref() {
        if !password.is_empty() {
            user.password_hash = hash_password(password)?;
        }
    }

    let user = state.users.update(user).await?;
    info!(user_id = user.id, "user updated");
    Ok(user.into())
}

#[instrument(skip(state))]
pub async fn delete_user(state: &AppState, id: i64) -> Result<String, ServiceError> {
    if !state.users.exists_by_id(id).await? {
        return Err(ServiceError::NotFound(id));
    }
    state.users.delete_by_id(id).await?;
    info!(user_id = id, "user deleted");
    Ok(format!("User with id {id} has been deleted successfully."))
}

/// Store an avatar under a collision-resistant name and persist its
/// locator on the user record.
#[instrument(skip(state, body, filename))]
pub async fn upload_image(
    state: &AppState,
    id: i64,
    body: Bytes,
    filename: Option<&str>,
) -> Result<UserView, ServiceError> {
    let Some(mut user) = state.users.find_by_id(id).await? else {
        return Err(ServiceError::NotFound(id));
    };
    if body.is_empty() {
        return Err(StorageError::EmptyUpload.into());
    }

    let name = format!("{}_{}{}", id, Uuid::new_v4(), extension_of(filename));
    let locator = state.storage.put(&name, body).await?;

    user.image = Some(locator);
    let user = state.users.update(user).await?;
    info!(user_id = user.id, "avatar uploaded");
    Ok(user.into())
}

/// Fetch the avatar bytes behind the user's stored locator.
#[instrument(skip(state))]
pub async fn get_image(state: &AppState, id: i64) -> Result<Bytes, ServiceError> {
    let Some(user) = state.users.find_by_id(id).await? else {
        return Err(ServiceError::NotFound(id));
    };
    let locator = match user.image.as_deref() {
        Some(locator) if !locator.is_empty() => locator.to_string(),
        _ => return Err(StorageError::NoImage.into()),
    };
    Ok(state.storage.get(&locator).await?)
}

/// Extension of the original filename, dot included; empty when absent.
fn extension_of(filename: Option<&str>) -> String {
    filename
        .and_then(|f| f.rfind('.').map(|i| f[i..].to_string()))
        .unwrap_or_default()
}
