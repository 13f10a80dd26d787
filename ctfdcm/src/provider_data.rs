//! Data handed from the configured provider to its resources and data sources

use crate::api::Client;
use std::sync::Arc;

/// Shared handle on the authenticated CTFd session
#[derive(Clone)]
pub struct CtfdcmProviderData {
    pub client: Arc<Client>,
}

impl CtfdcmProviderData {
    pub fn new(client: Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}
