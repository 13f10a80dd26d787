//! Challenge API implementation, including the Chall-Manager extension fields

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::common::ApiQueryParams;
use super::{ApiError, Client};

pub const DYNAMIC_IAC_TYPE: &str = "dynamic_iac";

/// Entry of GET /api/v1/challenges
#[derive(Debug, Clone, Deserialize)]
pub struct ChallengeSummary {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(rename = "type", default)]
    pub challenge_type: String,
}

/// Dynamic IaC challenge as returned by GET /api/v1/challenges/{id}
#[derive(Debug, Clone, Deserialize)]
pub struct Challenge {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub attribution: Option<String>,
    #[serde(default)]
    pub connection_info: Option<String>,
    #[serde(default)]
    pub max_attempts: Option<i64>,
    #[serde(default)]
    pub function: Option<String>,
    #[serde(default)]
    pub value: Option<i64>,
    #[serde(default)]
    pub initial: Option<i64>,
    #[serde(default)]
    pub decay: Option<i64>,
    #[serde(default)]
    pub minimum: Option<i64>,
    #[serde(default)]
    pub state: String,
    #[serde(rename = "type", default)]
    pub challenge_type: String,
    #[serde(default)]
    pub next_id: Option<i64>,

    // Chall-Manager plugin fields
    #[serde(default)]
    pub destroy_on_flag: bool,
    #[serde(default)]
    pub shared: bool,
    #[serde(default)]
    pub mana_cost: i64,
    #[serde(default)]
    pub scenario_id: i64,
    #[serde(default)]
    pub timeout: Option<i64>,
    #[serde(default)]
    pub until: Option<String>,
    #[serde(default)]
    pub additional: BTreeMap<String, String>,
    #[serde(default)]
    pub min: i64,
    #[serde(default)]
    pub max: i64,
}

/// Unlock requirements of a challenge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirements {
    #[serde(default)]
    pub anonymize: bool,
    #[serde(default)]
    pub prerequisites: Vec<i64>,
}

/// Body shared by POST /api/v1/challenges and PATCH /api/v1/challenges/{id}
///
/// `challenge_type` is only set on creation; CTFd refuses to change it.
#[derive(Debug, Clone, Serialize)]
pub struct ChallengeRequest {
    pub name: String,
    pub category: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    pub initial: i64,
    pub decay: i64,
    pub minimum: i64,
    pub state: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub challenge_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<Requirements>,

    pub destroy_on_flag: bool,
    pub shared: bool,
    pub mana_cost: i64,
    pub scenario_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub until: Option<String>,
    pub additional: BTreeMap<String, String>,
    pub min: i64,
    pub max: i64,
}

/// Challenges API for challenge operations
pub struct ChallengesApi<'a> {
    client: &'a Client,
}

impl<'a> ChallengesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/v1/challenges?type=dynamic_iac
    pub async fn list_dynamic_iac(&self) -> Result<Vec<ChallengeSummary>, ApiError> {
        let params = ApiQueryParams::new().add("type", DYNAMIC_IAC_TYPE);
        self.client
            .get(&format!("/api/v1/challenges{}", params.to_query_string()))
            .await
    }

    /// GET /api/v1/challenges/{id}
    pub async fn get(&self, id: i64) -> Result<Challenge, ApiError> {
        self.client.get(&format!("/api/v1/challenges/{}", id)).await
    }

    /// POST /api/v1/challenges
    pub async fn create(&self, request: &ChallengeRequest) -> Result<Challenge, ApiError> {
        self.client.post("/api/v1/challenges", request).await
    }

    /// PATCH /api/v1/challenges/{id}
    pub async fn update(&self, id: i64, request: &ChallengeRequest) -> Result<Challenge, ApiError> {
        self.client
            .patch(&format!("/api/v1/challenges/{}", id), request)
            .await
    }

    /// DELETE /api/v1/challenges/{id}
    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        self.client
            .delete(&format!("/api/v1/challenges/{}", id))
            .await
    }

    /// GET /api/v1/challenges/{id}/requirements
    pub async fn requirements(&self, id: i64) -> Result<Option<Requirements>, ApiError> {
        self.client
            .get_optional(&format!("/api/v1/challenges/{}/requirements", id))
            .await
    }
}

#[cfg(test)]
#[path = "./challenges_test.rs"]
mod challenges_test;
