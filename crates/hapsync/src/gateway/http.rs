use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use super::ForeignObject;
use super::ForeignState;
use super::GatewayError;
use super::ObjectClient;
use super::ObjectKind;
use crate::config::GatewayConfig;

/// Object store client talking to the REST query API.
///
/// Endpoints used:
/// - `GET  {base}/v1/objects?pattern=<glob>&type=<kind>` -> map of id to object
/// - `GET  {base}/v1/object/<id>` -> object, 404 when absent
/// - `GET  {base}/v1/state/<id>` -> state, 404 when absent
/// - `PUT  {base}/v1/object/<id>` -> full replace
pub struct HttpObjectClient {
    base: String,
    client: reqwest::Client,
    username: Option<String>,
    password: Option<String>,
}

impl HttpObjectClient {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            base: config.base_url.trim_end_matches('/').to_string(),
            client,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let mut request = self.client.get(url);
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_deref());
        }
        request
    }

    fn put(&self, url: &str) -> reqwest::RequestBuilder {
        let mut request = self.client.put(url);
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_deref());
        }
        request
    }
}

#[async_trait]
impl ObjectClient for HttpObjectClient {
    async fn get_objects(
        &self,
        pattern: &str,
        kind: ObjectKind,
    ) -> Result<BTreeMap<String, ForeignObject>, GatewayError> {
        let url = format!("{}/v1/objects", self.base);
        let response = self
            .get(&url)
            .query(&[("pattern", pattern), ("type", kind.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::Status {
                url,
                status: response.status().as_u16(),
            });
        }

        Ok(response.json().await?)
    }

    async fn get_object(&self, id: &str) -> Result<Option<ForeignObject>, GatewayError> {
        let url = format!("{}/v1/object/{}", self.base, id);
        let response = self.get(&url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(GatewayError::Status {
                url,
                status: response.status().as_u16(),
            });
        }

        Ok(Some(response.json().await?))
    }

    async fn get_state(&self, id: &str) -> Result<Option<ForeignState>, GatewayError> {
        let url = format!("{}/v1/state/{}", self.base, id);
        let response = self.get(&url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(GatewayError::Status {
                url,
                status: response.status().as_u16(),
            });
        }

        Ok(Some(response.json().await?))
    }

    async fn set_object(&self, id: &str, object: &ForeignObject) -> Result<(), GatewayError> {
        let url = format!("{}/v1/object/{}", self.base, id);
        let response = self.put(&url).json(object).send().await?;

        if !response.status().is_success() {
            return Err(GatewayError::Status {
                url,
                status: response.status().as_u16(),
            });
        }

        Ok(())
    }
}
