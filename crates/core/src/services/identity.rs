//! Institutional SSO identity resolution.
//!
//! The core's responsibility begins at a resolved identity; the OAuth
//! handshake itself happens behind [`IdentityProvider`]. The SSO-backed
//! implementation also normalizes the provider's historical payload shapes
//! here, so the rest of the system only ever sees one canonical field set.

use prepvault_common::{AppError, AppResult, config::SsoConfig};
use serde_json::Value;

/// A resolved external identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    /// Stable institutional enrollment number.
    pub enrollment_number: String,
    /// Display name.
    pub full_name: String,
    /// Absolute avatar URL, if any.
    pub display_picture: Option<String>,
    /// Canonical organizational unit.
    pub branch: String,
    /// Institute contact address.
    pub email: String,
}

/// Identity resolution collaborator.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// URL the client should be sent to for authorization.
    fn authorization_url(&self) -> String;

    /// Exchange an auth code for a resolved identity.
    async fn resolve(&self, code: &str) -> AppResult<ResolvedIdentity>;
}

/// SSO-backed identity provider.
pub struct SsoIdentityProvider {
    client: reqwest::Client,
    config: SsoConfig,
}

impl SsoIdentityProvider {
    /// Create a new SSO identity provider.
    #[must_use]
    pub fn new(config: SsoConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    async fn exchange_code(&self, code: &str) -> AppResult<String> {
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("code", code),
        ];

        let response = self
            .client
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Token exchange failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalService(format!(
                "Token endpoint returned {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("Invalid token response: {e}")))?;

        body.get("access_token")
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| AppError::ExternalService("Token response missing access_token".into()))
    }

    async fn fetch_user_data(&self, access_token: &str) -> AppResult<Value> {
        let response = self
            .client
            .get(&self.config.user_data_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("User data fetch failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalService(format!(
                "User data endpoint returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("Invalid user data response: {e}")))
    }

    fn normalize(&self, data: &Value) -> AppResult<ResolvedIdentity> {
        normalize_identity(data, self.config.asset_base_url.as_deref())
    }
}

#[async_trait::async_trait]
impl IdentityProvider for SsoIdentityProvider {
    fn authorization_url(&self) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}",
            self.config.authorization_url,
            self.config.client_id,
            urlencode(&self.config.redirect_uri),
        )
    }

    async fn resolve(&self, code: &str) -> AppResult<ResolvedIdentity> {
        let access_token = self.exchange_code(code).await?;
        let data = self.fetch_user_data(&access_token).await?;
        self.normalize(&data)
    }
}

fn urlencode(input: &str) -> String {
    url::form_urlencoded::byte_serialize(input.as_bytes()).collect()
}

fn str_at<'a>(data: &'a Value, path: &[&str]) -> Option<&'a str> {
    let mut current = data;
    for key in path {
        current = current.get(key)?;
    }
    current.as_str().map(str::trim).filter(|s| !s.is_empty())
}

/// Translate a raw SSO payload into a [`ResolvedIdentity`].
///
/// The provider has shipped several shapes over time: camelCase and
/// snake_case variants, and a branch field keyed "branch department name"
/// (spaces included). All of that is absorbed here.
pub fn normalize_identity(
    data: &Value,
    asset_base_url: Option<&str>,
) -> AppResult<ResolvedIdentity> {
    let enrollment_number = str_at(data, &["student", "enrolmentNumber"])
        .or_else(|| str_at(data, &["student", "enrolment_number"]))
        .or_else(|| str_at(data, &["enrolmentNumber"]))
        .or_else(|| str_at(data, &["username"]))
        .ok_or_else(|| {
            AppError::ExternalService("Identity payload missing enrollment number".into())
        })?
        .to_string();

    let full_name = str_at(data, &["person", "fullName"])
        .or_else(|| str_at(data, &["person", "full_name"]))
        .or_else(|| str_at(data, &["fullName"]))
        .unwrap_or("Unknown User")
        .to_string();

    let display_picture = str_at(data, &["person", "displayPicture"])
        .or_else(|| str_at(data, &["person", "display_picture"]))
        .map(|path| {
            if path.starts_with("http") {
                path.to_string()
            } else {
                let base = asset_base_url.unwrap_or_default();
                format!("{base}{path}")
            }
        });

    let branch = str_at(data, &["student", "branch department name"])
        .or_else(|| str_at(data, &["student", "branch", "department", "name"]))
        .or_else(|| str_at(data, &["student", "branch", "name"]))
        .or_else(|| str_at(data, &["student", "branch"]))
        .unwrap_or("Unknown")
        .to_string();

    let email = str_at(data, &["contactInformation", "instituteWebmailAddress"])
        .or_else(|| str_at(data, &["contactInformation", "institute_webmail_address"]))
        .or_else(|| str_at(data, &["contact_information", "institute_webmail_address"]))
        .or_else(|| str_at(data, &["email"]))
        .unwrap_or_default()
        .to_string();

    Ok(ResolvedIdentity {
        enrollment_number,
        full_name,
        display_picture,
        branch,
        email,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_camel_case_payload() {
        let data = json!({
            "person": {
                "fullName": "Asha Verma",
                "displayPicture": "/media/dp/asha.png",
            },
            "student": {
                "enrolmentNumber": "21114012",
                "branch department name": "Computer Science and Engineering",
            },
            "contactInformation": {
                "instituteWebmailAddress": "asha@example.edu",
            },
        });

        let identity = normalize_identity(&data, Some("https://sso.example.edu")).unwrap();
        assert_eq!(identity.enrollment_number, "21114012");
        assert_eq!(identity.full_name, "Asha Verma");
        assert_eq!(
            identity.display_picture.as_deref(),
            Some("https://sso.example.edu/media/dp/asha.png")
        );
        assert_eq!(identity.branch, "Computer Science and Engineering");
        assert_eq!(identity.email, "asha@example.edu");
    }

    #[test]
    fn test_normalize_snake_case_payload() {
        let data = json!({
            "person": { "full_name": "Ravi Singh" },
            "student": {
                "enrolment_number": "20112034",
                "branch": { "department": { "name": "Electrical Engineering" } },
            },
            "contact_information": {
                "institute_webmail_address": "ravi@example.edu",
            },
        });

        let identity = normalize_identity(&data, None).unwrap();
        assert_eq!(identity.enrollment_number, "20112034");
        assert_eq!(identity.branch, "Electrical Engineering");
        assert_eq!(identity.email, "ravi@example.edu");
    }

    #[test]
    fn test_normalize_missing_enrollment_fails() {
        let data = json!({ "person": { "fullName": "Nobody" } });
        let result = normalize_identity(&data, None);
        assert!(matches!(result, Err(AppError::ExternalService(_))));
    }

    #[test]
    fn test_normalize_absolute_picture_kept() {
        let data = json!({
            "student": { "enrolmentNumber": "21114099" },
            "person": { "displayPicture": "https://cdn.example.edu/p.png" },
        });

        let identity = normalize_identity(&data, Some("https://sso.example.edu")).unwrap();
        assert_eq!(
            identity.display_picture.as_deref(),
            Some("https://cdn.example.edu/p.png")
        );
        assert_eq!(identity.full_name, "Unknown User");
        assert_eq!(identity.branch, "Unknown");
    }
}
