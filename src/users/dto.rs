use serde::{Deserialize, Serialize};

use super::repo_types::User;

/// Outward shape of a user record; credential material never appears.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: i64,
    pub username: String,
    pub name: Option<String>,
    pub email: String,
    pub mobile_number: String,
    pub role: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub gender: Option<String>,
    pub dob: Option<String>,
    pub status: Option<String>,
    pub image: Option<String>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            name: user.name,
            email: user.email,
            mobile_number: user.mobile_number,
            role: user.role,
            phone: user.phone,
            address: user.address,
            gender: user.gender,
            dob: user.dob,
            status: user.status,
            image: user.image,
        }
    }
}

/// Request body for signup.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub mobile_number: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub dob: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Request body for login. The identifier is matched against username or
/// email; the field name is historical.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub email_or_mobile: String,
    #[serde(default)]
    pub password: String,
}

/// Response returned after login or signup.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserView,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email_or_mobile: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    #[serde(default)]
    pub email_or_mobile: String,
    #[serde(default)]
    pub otp: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub email_or_mobile: String,
    #[serde(default)]
    pub new_password: String,
}

/// Request body for profile update; an empty or missing password keeps
/// the stored hash.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub username: String,
    pub email: String,
    pub mobile_number: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub dob: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn sample_user() -> User {
        User {
            id: 1,
            username: "alice".into(),
            name: Some("Alice".into()),
            email: "a@x.com".into(),
            password_hash: "$argon2id$not-a-real-digest".into(),
            mobile_number: "555".into(),
            role: None,
            phone: None,
            address: None,
            gender: None,
            dob: None,
            status: None,
            otp: Some("123456".into()),
            image: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn view_serializes_camel_case_without_credentials() {
        let view = UserView::from(sample_user());
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["username"], "alice");
        assert_eq!(json["mobileNumber"], "555");
        assert!(json.get("password").is_none());
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("otp").is_none());
    }

    #[test]
    fn login_request_uses_historical_field_name() {
        let parsed: LoginRequest =
            serde_json::from_str(r#"{"emailOrMobile": "a@x.com", "password": "secret"}"#).unwrap();
        assert_eq!(parsed.email_or_mobile, "a@x.com");
        assert_eq!(parsed.password, "secret");
    }

    #[test]
    fn recovery_requests_default_missing_fields_to_blank() {
        let parsed: VerifyOtpRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.email_or_mobile, "");
        assert_eq!(parsed.otp, "");
    }
}
