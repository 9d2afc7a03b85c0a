use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{AssistantSatellite, DeviceEntry, GenerationService, Registry};
use crate::config::{ConfigEntry, HomeAssistantConfig};
use crate::consts::{
    ASSIST_SATELLITE_DOMAIN, DOMAIN, SERVICE_GENERATE_CONTENT, SERVICE_INTERRUPT_CONVERSATION,
    SERVICE_START_CONVERSATION,
};
use crate::error::HomeMindError;
use crate::kernel::assistant::AssistantState;

#[derive(Deserialize)]
struct ServiceCallResponse {
    service_response: GeneratedContent,
}

#[derive(Deserialize)]
struct GeneratedContent {
    text: String,
}

#[derive(Deserialize)]
struct StateResponse {
    state: String,
}

#[derive(Deserialize)]
struct DeviceTemplate {
    id: Option<String>,
    name: Option<String>,
    name_by_user: Option<String>,
}

/// Talks to the host over its REST API.
///
/// The REST API cannot edit config entries, so the entry title is owned here.
pub struct HomeAssistantClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    device_id: Option<String>,
    title: RwLock<String>,
}

impl HomeAssistantClient {
    pub fn new(config: &HomeAssistantConfig, entry: &ConfigEntry) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            device_id: config.device_id.clone(),
            title: RwLock::new(entry.title.clone()),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.client.request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn checked(path: &str, response: Response) -> Result<Response> {
        let status = response.status();
        if !status.is_success() {
            return Err(HomeMindError::HomeAssistant {
                status: status.as_u16(),
                path: path.to_string(),
            }
            .into());
        }
        Ok(response)
    }

    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        data: Value,
        return_response: bool,
    ) -> Result<Response> {
        let mut path = format!("/api/services/{domain}/{service}");
        if return_response {
            path.push_str("?return_response");
        }
        debug!(%path, "Calling service");
        let response = self.request(Method::POST, &path).json(&data).send().await?;
        Self::checked(&path, response)
    }

    async fn render_template(&self, template: &str) -> Result<String> {
        let path = "/api/template";
        let response = self
            .request(Method::POST, path)
            .json(&json!({ "template": template }))
            .send()
            .await?;
        Ok(Self::checked(path, response)?.text().await?)
    }
}

#[async_trait]
impl GenerationService for HomeAssistantClient {
    async fn generate_content(&self, prompt: &str, config_entry_id: &str) -> Result<String> {
        let data = json!({ "prompt": prompt, "config_entry": config_entry_id });
        let response = self
            .call_service(DOMAIN, SERVICE_GENERATE_CONTENT, data, true)
            .await?;
        let body: ServiceCallResponse = response.json().await?;
        Ok(body.service_response.text.trim().to_string())
    }
}

#[async_trait]
impl AssistantSatellite for HomeAssistantClient {
    async fn state(&self, entity_id: &str) -> Result<Option<AssistantState>> {
        let path = format!("/api/states/{entity_id}");
        let response = self.request(Method::GET, &path).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body: StateResponse = Self::checked(&path, response)?.json().await?;
        Ok(Some(AssistantState::parse(&body.state)))
    }

    async fn start_conversation(
        &self,
        entity_id: &str,
        start_message: &str,
        preannounce: bool,
    ) -> Result<()> {
        let data = json!({
            "entity_id": entity_id,
            "start_message": start_message,
            "preannounce": preannounce,
        });
        self.call_service(ASSIST_SATELLITE_DOMAIN, SERVICE_START_CONVERSATION, data, false)
            .await?;
        Ok(())
    }

    async fn interrupt_conversation(&self, entity_id: &str) -> Result<()> {
        let data = json!({ "entity_id": entity_id });
        self.call_service(ASSIST_SATELLITE_DOMAIN, SERVICE_INTERRUPT_CONVERSATION, data, false)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Registry for HomeAssistantClient {
    async fn own_device_id(&self, _entry_id: &str) -> Result<Option<String>> {
        Ok(self.device_id.clone())
    }

    async fn device(&self, device_id: &str) -> Result<Option<DeviceEntry>> {
        let id = serde_json::to_string(device_id)?;
        let template = format!(
            "{{{{ {{'id': device_attr({id}, 'id'), 'name': device_attr({id}, 'name'), \
             'name_by_user': device_attr({id}, 'name_by_user')}} | to_json }}}}"
        );
        let rendered = self.render_template(&template).await?;
        let device: DeviceTemplate =
            serde_json::from_str(&rendered).context("unexpected device template output")?;

        Ok(device.id.map(|id| DeviceEntry {
            id,
            name: device.name,
            name_by_user: device.name_by_user,
        }))
    }

    async fn entry_title(&self, _entry_id: &str) -> Result<String> {
        Ok(self.title.read().await.clone())
    }

    async fn update_entry_title(&self, entry_id: &str, title: &str) -> Result<()> {
        *self.title.write().await = title.to_string();
        info!(entry_id, title, "Entry title updated");
        Ok(())
    }
}
