//! Signed-in user's profile.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use lockshop_core::{Email, ValidationError};

use crate::error::{AuthError, Result};
use crate::session::{ApiRequest, SessionClient};

const PROFILE_PATH: &str = "/user/home";
const UPDATE_PROFILE_PATH: &str = "/user/update-profile";

/// Profile image reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileImage {
    pub path: String,
}

/// The profile page's view of the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub image: Option<ProfileImage>,
}

impl Profile {
    /// First and last name, falling back to the username.
    #[must_use]
    pub fn full_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        if parts.is_empty() {
            self.username.clone()
        } else {
            Some(parts.join(" "))
        }
    }
}

/// Fields to change. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl ProfileUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.phone.is_none()
    }
}

/// Fetch the signed-in user's profile.
///
/// # Errors
///
/// Returns `AuthError::SessionExpired` without a request when nobody is
/// signed in.
#[instrument(skip(session))]
pub async fn fetch_profile(session: &SessionClient) -> Result<Profile> {
    if !session.is_signed_in()? {
        return Err(AuthError::SessionExpired.into());
    }
    session.send_json(&ApiRequest::get(PROFILE_PATH)).await
}

/// Update the signed-in user's profile.
///
/// A new name also becomes the stored display name.
///
/// # Errors
///
/// Returns `ClientError::Validation` for an empty update or a malformed
/// email, `AuthError::SessionExpired` when nobody is signed in.
#[instrument(skip_all)]
pub async fn update_profile(session: &SessionClient, update: ProfileUpdate) -> Result<()> {
    let update = ProfileUpdate {
        name: non_blank(update.name),
        email: non_blank(update.email)
            .map(|e| Email::parse(&e).map(Email::into_inner))
            .transpose()?,
        phone: non_blank(update.phone),
    };
    if update.is_empty() {
        return Err(ValidationError::MissingField("profile").into());
    }
    if !session.is_signed_in()? {
        return Err(AuthError::SessionExpired.into());
    }

    let request = ApiRequest::put(UPDATE_PROFILE_PATH).json(&update)?;
    session
        .send_envelope::<serde_json::Value>(&request)
        .await?;

    if let Some(name) = &update.name {
        session.tokens().set_display_name(name)?;
    }
    info!("Profile updated");
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_parses_backend_shape() {
        let profile: Profile = serde_json::from_str(
            r#"{"username":"aziz","firstName":"Aziz","lastName":"Karimov","isAdmin":false,"image":{"path":"/u/1.png"}}"#,
        )
        .unwrap();
        assert_eq!(profile.full_name().as_deref(), Some("Aziz Karimov"));
        assert_eq!(profile.image.unwrap().path, "/u/1.png");
        assert!(profile.address.is_none());
    }

    #[test]
    fn test_full_name_falls_back_to_username() {
        let profile: Profile = serde_json::from_str(r#"{"username":"aziz"}"#).unwrap();
        assert_eq!(profile.full_name().as_deref(), Some("aziz"));
    }

    #[test]
    fn test_update_skips_unset_fields() {
        let update = ProfileUpdate {
            phone: Some("+998901112233".to_string()),
            ..ProfileUpdate::default()
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            serde_json::json!({ "phone": "+998901112233" })
        );
        assert!(ProfileUpdate::default().is_empty());
    }
}
