//! Pincode lookup for address auto-fill.
//!
//! Queries the India Post pincode directory, which answers
//! `[{"Status": "Success", "PostOffice": [{"District": .., "State": ..}]}]`.

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::config::StorefrontConfig;
use crate::models::address::is_pincode;

/// Errors from pincode lookups.
#[derive(Debug, Error)]
pub enum PincodeError {
    #[error("pincode must be 6 digits")]
    Invalid,
    #[error("no post office found for pincode {0}")]
    NotFound(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// District and state for a pincode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PincodeLocation {
    pub district: String,
    pub state: String,
}

#[derive(Debug, Deserialize)]
struct LookupResult {
    #[serde(rename = "Status")]
    status: String,
    #[serde(rename = "PostOffice", default)]
    post_office: Option<Vec<PostOffice>>,
}

#[derive(Debug, Deserialize)]
struct PostOffice {
    #[serde(rename = "District")]
    district: String,
    #[serde(rename = "State")]
    state: String,
}

/// Client for the pincode directory.
#[derive(Debug, Clone)]
pub struct PincodeClient {
    client: reqwest::Client,
    base_url: Url,
}

impl PincodeClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &StorefrontConfig) -> Result<Self, PincodeError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;
        let mut base_url = config.pincode_api_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { client, base_url })
    }

    /// Look up the district and state of a pincode.
    ///
    /// # Errors
    ///
    /// Returns [`PincodeError::Invalid`] for malformed input and
    /// [`PincodeError::NotFound`] when the directory has no match.
    #[instrument(skip(self))]
    pub async fn lookup(&self, pincode: &str) -> Result<PincodeLocation, PincodeError> {
        let pincode = pincode.trim();
        if !is_pincode(pincode) {
            return Err(PincodeError::Invalid);
        }

        let url = self.base_url.join(&format!("pincode/{pincode}"))?;
        let results: Vec<LookupResult> = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let location = results
            .into_iter()
            .next()
            .filter(|r| r.status == "Success")
            .and_then(|r| r.post_office)
            .and_then(|offices| offices.into_iter().next())
            .map(|office| PincodeLocation {
                district: office.district,
                state: office.state,
            })
            .ok_or_else(|| PincodeError::NotFound(pincode.to_owned()))?;

        debug!(district = %location.district, state = %location.state, "Pincode resolved");
        Ok(location)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn client_for(server: &MockServer) -> PincodeClient {
        let lookup = |key: &str| match key {
            "BBQ_API_BASE_URL" => Some("http://localhost:3000".to_owned()),
            "BBQ_PINCODE_API_URL" => Some(server.uri()),
            _ => None,
        };
        PincodeClient::new(&StorefrontConfig::from_lookup(lookup).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_lookup_first_post_office() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pincode/302001"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
                "Message": "Number of pincode(s) found:2",
                "Status": "Success",
                "PostOffice": [
                    {"Name": "Jaipur GPO", "District": "Jaipur", "State": "Rajasthan"},
                    {"Name": "Other", "District": "Elsewhere", "State": "Rajasthan"}
                ]
            }])))
            .mount(&server)
            .await;

        let location = client_for(&server).await.lookup(" 302001 ").await.unwrap();
        assert_eq!(location.district, "Jaipur");
        assert_eq!(location.state, "Rajasthan");
    }

    #[tokio::test]
    async fn test_lookup_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pincode/999999"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
                "Message": "No records found", "Status": "Error", "PostOffice": null
            }])))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert!(matches!(client.lookup("12ab").await, Err(PincodeError::Invalid)));
        assert!(matches!(
            client.lookup("999999").await,
            Err(PincodeError::NotFound(_))
        ));
    }
}
