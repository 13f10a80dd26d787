//! Chall-Manager plugin admin instance API

use serde::{Deserialize, Serialize};

use super::common::{string_or_int, ApiQueryParams};
use super::{ApiError, Client};

const INSTANCE_PATH: &str = "/api/v1/plugins/ctfd-chall-manager/admin/instance";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    #[serde(default, deserialize_with = "string_or_int::deserialize")]
    pub challenge_id: Option<String>,
    #[serde(default, deserialize_with = "string_or_int::deserialize")]
    pub source_id: Option<String>,
    #[serde(default)]
    pub connection_info: Option<String>,
    #[serde(default)]
    pub since: Option<String>,
    #[serde(default)]
    pub until: Option<String>,
}

/// Identifies an instance: one challenge deployed for one source (user or team)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceKey {
    pub challenge_id: String,
    pub source_id: String,
}

impl InstanceKey {
    pub fn new(challenge_id: impl Into<String>, source_id: impl Into<String>) -> Self {
        Self {
            challenge_id: challenge_id.into(),
            source_id: source_id.into(),
        }
    }

    fn to_query(&self) -> ApiQueryParams {
        ApiQueryParams::new()
            .add("challengeId", &self.challenge_id)
            .add("sourceId", &self.source_id)
    }
}

/// Instances API for Chall-Manager admin operations
pub struct InstancesApi<'a> {
    client: &'a Client,
}

impl<'a> InstancesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/v1/plugins/ctfd-chall-manager/admin/instance?challengeId=..&sourceId=..
    pub async fn get(&self, key: &InstanceKey) -> Result<Instance, ApiError> {
        let instance: Option<Instance> = self
            .client
            .get_optional(&format!("{}{}", INSTANCE_PATH, key.to_query().to_query_string()))
            .await?;
        Ok(instance.unwrap_or_default())
    }

    /// POST /api/v1/plugins/ctfd-chall-manager/admin/instance
    pub async fn create(&self, key: &InstanceKey) -> Result<Instance, ApiError> {
        self.client.post(INSTANCE_PATH, key).await
    }

    /// DELETE /api/v1/plugins/ctfd-chall-manager/admin/instance?challengeId=..&sourceId=..
    pub async fn delete(&self, key: &InstanceKey) -> Result<(), ApiError> {
        self.client
            .delete(&format!("{}{}", INSTANCE_PATH, key.to_query().to_query_string()))
            .await
    }
}
