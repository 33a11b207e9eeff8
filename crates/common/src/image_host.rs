//! Image hosting abstraction for logo uploads.
//!
//! The core never stores binary blobs; an image host takes the bytes and
//! hands back a public URL, which is all that is persisted.

use crate::{AppError, AppResult};

/// Image host trait.
#[async_trait::async_trait]
pub trait ImageHost: Send + Sync {
    /// Upload an image and return its public URL.
    async fn upload(&self, data: &[u8], filename: &str, content_type: &str) -> AppResult<String>;
}

/// HTTP image host backed by an external upload endpoint.
///
/// Posts the image as multipart form data and expects a JSON body with a
/// `secure_url` (or `url`) field, the shape used by common image CDNs.
pub struct HttpImageHost {
    client: reqwest::Client,
    upload_url: String,
    api_key: Option<String>,
}

impl HttpImageHost {
    /// Create a new HTTP image host.
    #[must_use]
    pub fn new(upload_url: String, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            upload_url,
            api_key,
        }
    }
}

#[async_trait::async_trait]
impl ImageHost for HttpImageHost {
    async fn upload(&self, data: &[u8], filename: &str, content_type: &str) -> AppResult<String> {
        let part = reqwest::multipart::Part::bytes(data.to_vec())
            .file_name(filename.to_string())
            .mime_str(content_type)
            .map_err(|e| AppError::BadRequest(format!("Invalid content type: {e}")))?;

        let form = reqwest::multipart::Form::new().part("file", part);

        let mut request = self.client.post(&self.upload_url).multipart(form);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Image upload failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalService(format!(
                "Image host returned {}",
                response.status()
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("Invalid image host response: {e}")))?;

        body.get("secure_url")
            .or_else(|| body.get("url"))
            .and_then(|v| v.as_str())
            .map(ToString::to_string)
            .ok_or_else(|| {
                AppError::ExternalService("Image host response missing URL".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_image_host_construction() {
        let host = HttpImageHost::new("https://images.example.com/upload".to_string(), None);
        assert_eq!(host.upload_url, "https://images.example.com/upload");
        assert!(host.api_key.is_none());
    }
}
