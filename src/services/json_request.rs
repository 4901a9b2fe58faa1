use crate::config::UploaderConfig;
use crate::error::UploadError;
use crate::models::{HttpMethod, JsonObject};
use crate::services::transport::TransportResponse;
use crate::utils::query::query_components;
use reqwest::Client;
use url::Url;

/// Small JSON-over-HTTP helper for the endpoints around uploads.
#[derive(Debug, Clone)]
pub struct JsonClient {
    client: Client,
}

impl JsonClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &UploaderConfig) -> Result<Self, UploadError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::new(client))
    }

    /// Send `params` to `url` and parse the reply as a JSON object.
    ///
    /// GET requests carry the parameters in the query string, every other
    /// method sends them (or `{}`) as a JSON body.
    pub async fn request(
        &self,
        url: &Url,
        method: HttpMethod,
        params: Option<&JsonObject>,
        headers: &[(&str, &str)],
    ) -> Result<JsonObject, UploadError> {
        let mut builder = match method {
            HttpMethod::Get => self.client.get(with_query(url, params)),
            other => {
                let body = params.cloned().unwrap_or_default();
                self.client.request(other.into(), url.clone()).json(&body)
            }
        };
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        tracing::debug!("{} {}", method.as_str(), url);
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        let response = TransportResponse { status, body };

        if !response.is_success() {
            tracing::warn!("{} {} returned {}", method.as_str(), url, status);
            return Err(UploadError::Status(status));
        }
        response.json_object()
    }
}

/// Append flattened parameters to the query string of `url`.
pub fn with_query(url: &Url, params: Option<&JsonObject>) -> Url {
    let mut url = url.clone();
    let pairs: Vec<(String, String)> = params
        .into_iter()
        .flatten()
        .flat_map(|(key, value)| query_components(key, value))
        .collect();

    if !pairs.is_empty() {
        url.query_pairs_mut().extend_pairs(pairs);
    }
    url
}
