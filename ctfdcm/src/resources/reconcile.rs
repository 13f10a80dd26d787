//! Synchronisation of a challenge's tags or topics with a desired list
//!
//! CTFd exposes no bulk update for these collections, so every existing row
//! is deleted and each desired value is created again, one call at a time.
//! The first failure stops the sequence; rows already deleted or created
//! stay that way and the next apply converges.

use async_trait::async_trait;
use thiserror::Error;

use crate::api::tags::{CreateTagRequest, TagsApi};
use crate::api::topics::{CreateTopicRequest, TopicsApi};
use crate::api::ApiError;

/// One row of a challenge sub-collection
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionEntry {
    pub id: i64,
    pub value: String,
}

/// A per-challenge collection of string values stored as separate rows
#[async_trait]
pub trait ChallengeCollection: Send + Sync {
    /// Singular noun used in diagnostics ("tag", "topic")
    fn kind(&self) -> &'static str;

    async fn list(&self, challenge_id: i64) -> Result<Vec<CollectionEntry>, ApiError>;

    async fn remove(&self, entry_id: i64) -> Result<(), ApiError>;

    async fn add(&self, challenge_id: i64, value: &str) -> Result<(), ApiError>;
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Unable to get all {kind}s of challenge {challenge_id}, got error: {source}")]
    List {
        kind: &'static str,
        challenge_id: i64,
        source: ApiError,
    },

    #[error("Unable to delete {kind} {entry_id} of challenge {challenge_id}, got error: {source}")]
    Remove {
        kind: &'static str,
        challenge_id: i64,
        entry_id: i64,
        source: ApiError,
    },

    #[error("Unable to create {kind} of challenge {challenge_id}, got error: {source}")]
    Add {
        kind: &'static str,
        challenge_id: i64,
        source: ApiError,
    },
}

/// Makes the server-side collection of `challenge_id` hold exactly `desired`
pub async fn reconcile(
    collection: &dyn ChallengeCollection,
    challenge_id: i64,
    desired: &[String],
) -> Result<(), ReconcileError> {
    let kind = collection.kind();

    let existing = collection
        .list(challenge_id)
        .await
        .map_err(|source| ReconcileError::List {
            kind,
            challenge_id,
            source,
        })?;

    tracing::debug!(
        kind,
        challenge_id,
        existing = existing.len(),
        desired = desired.len(),
        "Reconciling challenge collection"
    );

    for entry in &existing {
        collection
            .remove(entry.id)
            .await
            .map_err(|source| ReconcileError::Remove {
                kind,
                challenge_id,
                entry_id: entry.id,
                source,
            })?;
    }

    for value in desired {
        collection
            .add(challenge_id, value)
            .await
            .map_err(|source| ReconcileError::Add {
                kind,
                challenge_id,
                source,
            })?;
    }

    Ok(())
}

#[async_trait]
impl<'a> ChallengeCollection for TagsApi<'a> {
    fn kind(&self) -> &'static str {
        "tag"
    }

    async fn list(&self, challenge_id: i64) -> Result<Vec<CollectionEntry>, ApiError> {
        Ok(self
            .list_for_challenge(challenge_id)
            .await?
            .into_iter()
            .map(|tag| CollectionEntry {
                id: tag.id,
                value: tag.value,
            })
            .collect())
    }

    async fn remove(&self, entry_id: i64) -> Result<(), ApiError> {
        self.delete(entry_id).await
    }

    async fn add(&self, challenge_id: i64, value: &str) -> Result<(), ApiError> {
        self.create(&CreateTagRequest {
            challenge: challenge_id,
            value: value.to_string(),
        })
        .await
        .map(|_| ())
    }
}

#[async_trait]
impl<'a> ChallengeCollection for TopicsApi<'a> {
    fn kind(&self) -> &'static str {
        "topic"
    }

    async fn list(&self, challenge_id: i64) -> Result<Vec<CollectionEntry>, ApiError> {
        Ok(self
            .list_for_challenge(challenge_id)
            .await?
            .into_iter()
            .map(|topic| CollectionEntry {
                id: topic.id,
                value: topic.value,
            })
            .collect())
    }

    async fn remove(&self, entry_id: i64) -> Result<(), ApiError> {
        self.delete(entry_id).await
    }

    async fn add(&self, challenge_id: i64, value: &str) -> Result<(), ApiError> {
        self.create(&CreateTopicRequest::for_challenge(challenge_id, value))
            .await
            .map(|_| ())
    }
}
