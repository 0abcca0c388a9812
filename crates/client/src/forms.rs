//! Marketing and wholesale submissions.
//!
//! Both forms are validated locally first; an invalid form never reaches the
//! network.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use lockshop_core::{Email, ProductId, ValidationError};

use crate::error::Result;
use crate::session::{ApiRequest, SessionClient};

const CONTACT_PATH: &str = "/contact/add";
const APPLICATION_PATH: &str = "/application/add";

/// "Call me back" request from the landing and product pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
}

/// Wholesale purchase application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WholesaleApplication {
    pub name: String,
    pub company: String,
    pub phone: String,
    pub lock_id: ProductId,
    pub lock_amount: u32,
    /// Engrave the company logo.
    pub custom_logo: bool,
    /// Help with installation and setup.
    pub help_setup: bool,
}

impl WholesaleApplication {
    /// Check required fields and normalize the amount.
    ///
    /// An amount of zero is raised to 1.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::MissingField` for a blank name, company or
    /// phone.
    pub fn validated(mut self) -> std::result::Result<Self, ValidationError> {
        self.name = required(&self.name, "name")?;
        self.company = required(&self.company, "company")?;
        self.phone = required(&self.phone, "phone")?;
        self.lock_amount = self.lock_amount.max(1);
        Ok(self)
    }
}

fn required(value: &str, field: &'static str) -> std::result::Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(trimmed.to_string())
}

/// Send a contact request.
///
/// Returns what the backend echoed back, or the submitted request when the
/// body was an envelope without data.
///
/// # Errors
///
/// Returns `ClientError::Validation` for a blank name or malformed email.
#[instrument(skip(session))]
pub async fn submit_contact(
    session: &SessionClient,
    name: &str,
    email: &str,
) -> Result<ContactRequest> {
    let contact = ContactRequest {
        name: required(name, "name")?,
        email: Email::parse(email)?.into_inner(),
    };

    let request = ApiRequest::post(CONTACT_PATH).json(&contact)?;
    let body: serde_json::Value = session.send_json(&request).await?;

    let data = body.get("data").cloned().unwrap_or_default();
    let echoed = serde_json::from_value::<ContactRequest>(body)
        .or_else(|_| serde_json::from_value::<ContactRequest>(data))
        .unwrap_or(contact);

    info!("Contact request sent");
    Ok(echoed)
}

/// Send a wholesale application.
///
/// # Errors
///
/// Returns `ClientError::Validation` if a required field is blank,
/// `ClientError::Server` if the backend refuses the application.
#[instrument(skip_all, fields(lock_id = %application.lock_id, amount = application.lock_amount))]
pub async fn submit_application(
    session: &SessionClient,
    application: WholesaleApplication,
) -> Result<()> {
    let application = application.validated()?;

    let request = ApiRequest::post(APPLICATION_PATH).json(&application)?;
    session
        .send_envelope::<serde_json::Value>(&request)
        .await?;

    info!("Wholesale application sent");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn application() -> WholesaleApplication {
        WholesaleApplication {
            name: " Dilshod ".to_string(),
            company: "Grand Hotel".to_string(),
            phone: "+998901234567".to_string(),
            lock_id: ProductId::new(1),
            lock_amount: 0,
            custom_logo: true,
            help_setup: false,
        }
    }

    #[test]
    fn test_application_wire_shape() {
        let json = serde_json::to_value(application().validated().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "Dilshod",
                "company": "Grand Hotel",
                "phone": "+998901234567",
                "lockId": 1,
                "lockAmount": 1,
                "customLogo": true,
                "helpSetup": false
            })
        );
    }

    #[test]
    fn test_application_requires_company() {
        let mut app = application();
        app.company = "  ".to_string();
        assert_eq!(
            app.validated().unwrap_err(),
            ValidationError::MissingField("company")
        );
    }
}
