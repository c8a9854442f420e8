//! Segmentation classifier client
//!
//! The garment photo is classified by an external service into boolean
//! region choices (which limbs and clothing regions the garment covers).
//! Any failure here fails the whole try-on request -- submitting a job with
//! a partial flag set would silently produce wrong masks.

use crate::error::AppError;
use serde::{Deserialize, Serialize};

/// Region choices returned by the classifier for one garment image.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SegmentChoices {
    /// Garment covers the left arm.
    pub left_arm: bool,
    /// Garment covers the right arm.
    pub right_arm: bool,
    /// Garment covers the left leg.
    pub left_leg: bool,
    /// Garment covers the right leg.
    pub right_leg: bool,
    /// Garment is an upper-body piece.
    pub upper_clothes: bool,
    /// Garment is a skirt.
    pub skirt: bool,
    /// Garment is a pair of pants.
    pub pants: bool,
    /// Garment is a dress.
    pub dress: bool,
}

/// HTTP client for the segmentation classifier service.
pub struct SegmentationClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct SegmentsRequest<'a> {
    image_url: &'a str,
}

impl SegmentationClient {
    /// Create a classifier client reusing the shared [`reqwest::Client`].
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Classify the garment at `garment_url` into region choices.
    pub async fn segments(&self, garment_url: &str) -> Result<SegmentChoices, AppError> {
        let response = self
            .client
            .post(format!("{}/segments", self.base_url))
            .json(&SegmentsRequest {
                image_url: garment_url,
            })
            .send()
            .await
            .map_err(|e| AppError::ClassifierUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(AppError::ClassifierUnavailable(format!(
                "Classifier returned status {}: {}",
                status.as_u16(),
                body
            )));
        }

        let choices: SegmentChoices = response.json().await.map_err(|e| {
            AppError::ClassifierUnavailable(format!("Malformed classifier response: {e}"))
        })?;

        tracing::debug!(garment_url = %garment_url, choices = ?choices, "Garment classified");
        Ok(choices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serial_test::serial;

    #[tokio::test]
    #[serial]
    async fn segments_posts_garment_url_and_parses_choices() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/segments")
            .match_body(Matcher::Json(serde_json::json!({
                "image_url": "https://images.example/dress.jpg"
            })))
            .with_status(200)
            .with_body(
                r#"{
                    "left_arm": false, "right_arm": false,
                    "left_leg": true, "right_leg": true,
                    "upper_clothes": false, "skirt": false,
                    "pants": false, "dress": true
                }"#,
            )
            .create_async()
            .await;

        let client = SegmentationClient::new(reqwest::Client::new(), server.url());
        let choices = client
            .segments("https://images.example/dress.jpg")
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(choices.dress);
        assert!(choices.left_leg);
        assert!(!choices.upper_clothes);
    }

    #[tokio::test]
    #[serial]
    async fn segments_error_status_is_classifier_unavailable() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/segments")
            .with_status(503)
            .with_body("model loading")
            .create_async()
            .await;

        let client = SegmentationClient::new(reqwest::Client::new(), server.url());
        let err = client
            .segments("https://images.example/dress.jpg")
            .await
            .unwrap_err();
        assert!(
            matches!(err, AppError::ClassifierUnavailable(_)),
            "got {err:?}"
        );
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    #[serial]
    async fn segments_incomplete_flag_set_is_classifier_unavailable() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/segments")
            .with_status(200)
            .with_body(r#"{"dress": true}"#)
            .create_async()
            .await;

        let client = SegmentationClient::new(reqwest::Client::new(), server.url());
        let err = client
            .segments("https://images.example/dress.jpg")
            .await
            .unwrap_err();
        assert!(
            matches!(err, AppError::ClassifierUnavailable(_)),
            "got {err:?}"
        );
    }

    #[tokio::test]
    async fn segments_unreachable_classifier() {
        let client = SegmentationClient::new(reqwest::Client::new(), "http://127.0.0.1:9");
        let err = client
            .segments("https://images.example/dress.jpg")
            .await
            .unwrap_err();
        assert!(
            matches!(err, AppError::ClassifierUnavailable(_)),
            "got {err:?}"
        );
    }
}
