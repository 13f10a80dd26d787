//! Topic API implementation
//!
//! Topics are shared between challenges; the identifiers handled here are
//! those of the challenge-topic association rows.

use serde::{Deserialize, Serialize};

use super::common::ApiQueryParams;
use super::{ApiError, Client};

#[derive(Debug, Clone, Deserialize)]
pub struct Topic {
    pub id: i64,
    #[serde(default)]
    pub challenge_id: Option<i64>,
    #[serde(default)]
    pub topic_id: Option<i64>,
    pub value: String,
}

/// Request body for POST /api/v1/topics
#[derive(Debug, Serialize)]
pub struct CreateTopicRequest {
    pub challenge: i64,
    #[serde(rename = "type")]
    pub topic_type: String,
    pub value: String,
}

impl CreateTopicRequest {
    /// Topic attached to a challenge
    pub fn for_challenge(challenge: i64, value: impl Into<String>) -> Self {
        Self {
            challenge,
            topic_type: "challenge".to_string(),
            value: value.into(),
        }
    }
}

/// Topics API for topic operations
pub struct TopicsApi<'a> {
    client: &'a Client,
}

impl<'a> TopicsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/v1/challenges/{id}/topics
    pub async fn list_for_challenge(&self, challenge_id: i64) -> Result<Vec<Topic>, ApiError> {
        self.client
            .get(&format!("/api/v1/challenges/{}/topics", challenge_id))
            .await
    }

    /// POST /api/v1/topics
    pub async fn create(&self, request: &CreateTopicRequest) -> Result<Topic, ApiError> {
        self.client.post("/api/v1/topics", request).await
    }

    /// DELETE /api/v1/topics?type=challenge&target_id={id}
    pub async fn delete(&self, topic_id: i64) -> Result<(), ApiError> {
        let params = ApiQueryParams::new()
            .add("type", "challenge")
            .add("target_id", topic_id);
        self.client
            .delete(&format!("/api/v1/topics{}", params.to_query_string()))
            .await
    }
}
