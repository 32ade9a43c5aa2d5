use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{
    Client, RequestBuilder,
    header::{HeaderMap, HeaderName, HeaderValue},
};
use serde::{Deserialize, de::DeserializeOwned};

use crate::{
    config::ManagerConfig,
    error::{RsmError, communication_failure},
    manager::{
        ports::ManagerPort,
        types::{Execution, ExecutionRequest, Node, NodeInstance, NodeInstanceUpdate},
    },
};

const TENANT_HEADER: HeaderName = HeaderName::from_static("tenant");
const MAX_ERROR_BODY_CHARS: usize = 240;

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

/// [`ManagerPort`] over the manager's REST API.
#[derive(Clone)]
pub struct RestManagerClient {
    client: Client,
    base_url: String,
}

impl RestManagerClient {
    pub fn new(config: &ManagerConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(tenant) = &config.tenant {
            headers.insert(
                TENANT_HEADER,
                HeaderValue::from_str(tenant).context("manager.tenant is not a valid header value")?,
            );
        }
        for (name, value) in &config.extra_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .with_context(|| format!("manager.extra_headers has invalid name '{}'", name))?;
            let value = HeaderValue::from_str(value)
                .with_context(|| format!("manager.extra_headers['{}'] is not a valid value", name))?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .context("failed to build manager http client")?;

        Ok(Self {
            client,
            base_url: api_base_url(&config.endpoint, &config.api_version),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        operation: &str,
    ) -> Result<T, RsmError> {
        tracing::trace!(target: "rsm.manager", operation = operation, "manager_request");
        let response = request.send().await.map_err(|err| {
            communication_failure(format!("manager request '{}' failed: {}", operation, err))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_http_error(status.as_u16(), operation, &body));
        }

        response.json::<T>().await.map_err(|err| {
            communication_failure(format!(
                "manager request '{}' returned an unreadable body: {}",
                operation, err
            ))
        })
    }
}

#[async_trait]
impl ManagerPort for RestManagerClient {
    async fn start_execution(&self, request: ExecutionRequest) -> Result<Execution, RsmError> {
        let builder = self.client.post(self.url("executions")).json(&request);
        self.send(builder, "start_execution").await
    }

    async fn get_execution(&self, execution_id: &str) -> Result<Execution, RsmError> {
        let builder = self
            .client
            .get(self.url(&format!("executions/{}", execution_id)));
        self.send(builder, "get_execution").await
    }

    async fn get_node_instance(&self, node_instance_id: &str) -> Result<NodeInstance, RsmError> {
        let builder = self
            .client
            .get(self.url(&format!("node-instances/{}", node_instance_id)));
        self.send(builder, "get_node_instance").await
    }

    async fn update_node_instance(
        &self,
        node_instance_id: &str,
        update: NodeInstanceUpdate,
    ) -> Result<NodeInstance, RsmError> {
        let builder = self
            .client
            .patch(self.url(&format!("node-instances/{}", node_instance_id)))
            .json(&update);
        self.send(builder, "update_node_instance").await
    }

    async fn list_node_instances(
        &self,
        deployment_id: &str,
    ) -> Result<Vec<NodeInstance>, RsmError> {
        let builder = self
            .client
            .get(self.url("node-instances"))
            .query(&[("deployment_id", deployment_id)]);
        let page: ListResponse<NodeInstance> = self.send(builder, "list_node_instances").await?;
        Ok(page.items)
    }

    async fn get_node(&self, deployment_id: &str, node_id: &str) -> Result<Node, RsmError> {
        let builder = self
            .client
            .get(self.url("nodes"))
            .query(&[("deployment_id", deployment_id), ("id", node_id)]);
        let page: ListResponse<Node> = self.send(builder, "get_node").await?;
        page.items.into_iter().next().ok_or_else(|| {
            communication_failure(format!(
                "node '{}' of deployment '{}' was not returned by the manager",
                node_id, deployment_id
            ))
        })
    }
}

fn api_base_url(endpoint: &str, api_version: &str) -> String {
    format!(
        "{}/api/{}",
        endpoint.trim_end_matches('/'),
        api_version.trim_matches('/')
    )
}

fn map_http_error(status: u16, operation: &str, body: &str) -> RsmError {
    let body = body.chars().take(MAX_ERROR_BODY_CHARS).collect::<String>();
    let mut message = format!(
        "manager request '{}' returned status {}",
        operation, status
    );
    if !body.trim().is_empty() {
        message = format!("{}: {}", message, body.trim());
    }
    communication_failure(message)
}
