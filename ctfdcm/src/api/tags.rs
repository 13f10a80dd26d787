//! Tag API implementation

use serde::{Deserialize, Serialize};

use super::{ApiError, Client};

#[derive(Debug, Clone, Deserialize)]
pub struct Tag {
    pub id: i64,
    #[serde(default)]
    pub challenge_id: Option<i64>,
    pub value: String,
}

/// Request body for POST /api/v1/tags
#[derive(Debug, Serialize)]
pub struct CreateTagRequest {
    pub challenge: i64,
    pub value: String,
}

/// Tags API for tag operations
pub struct TagsApi<'a> {
    client: &'a Client,
}

impl<'a> TagsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/v1/challenges/{id}/tags
    pub async fn list_for_challenge(&self, challenge_id: i64) -> Result<Vec<Tag>, ApiError> {
        self.client
            .get(&format!("/api/v1/challenges/{}/tags", challenge_id))
            .await
    }

    /// POST /api/v1/tags
    pub async fn create(&self, request: &CreateTagRequest) -> Result<Tag, ApiError> {
        self.client.post("/api/v1/tags", request).await
    }

    /// DELETE /api/v1/tags/{id}
    pub async fn delete(&self, tag_id: i64) -> Result<(), ApiError> {
        self.client.delete(&format!("/api/v1/tags/{}", tag_id)).await
    }
}
