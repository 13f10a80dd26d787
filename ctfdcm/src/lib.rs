pub mod api;
pub mod config;
pub mod data_sources;
pub mod provider_data;
pub mod resources;

pub use provider_data::CtfdcmProviderData;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::data_source::DataSourceWithConfigure;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, Provider,
    ProviderMetadataRequest, ProviderMetadataResponse, ProviderSchemaRequest,
    ProviderSchemaResponse, ResourceFactory, ValidateProviderConfigRequest,
    ValidateProviderConfigResponse,
};
use tfplug::resource::ResourceWithConfigure;
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic};

use api::{Client, ClientConfig};

#[derive(Default)]
pub struct CtfdcmProvider {
    client_config: ClientConfig,
}

impl CtfdcmProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client_config(client_config: ClientConfig) -> Self {
        Self { client_config }
    }

    async fn open_session(&self, config: &config::ProviderConfig) -> Result<Client, Diagnostic> {
        tracing::debug!(url = %config.url, "Creating CTFd API client");

        let client = Client::connect_with_config(
            &config.url,
            config.api_key.clone(),
            self.client_config.clone(),
        )
        .await
        .map_err(|e| {
            Diagnostic::error(
                "CTFd error",
                format!("Failed to fetch nonce and session: {}", e),
            )
        })?;

        if let Some(credentials) = &config.credentials {
            client
                .login(&credentials.username, &credentials.password)
                .await
                .map_err(|e| Diagnostic::error("CTFd error", format!("Failed to login: {}", e)))?;
        }

        Ok(client)
    }
}

#[async_trait]
impl Provider for CtfdcmProvider {
    fn type_name(&self) -> &str {
        "ctfdcm"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ProviderSchemaRequest,
    ) -> ProviderSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .markdown_description(
                "Use the CTFd Chall-Manager provider to manage dynamic IaC challenges and their instances.",
            )
            .attribute(
                AttributeBuilder::new("url", AttributeType::String)
                    .markdown_description(
                        "CTFd base URL (e.g. `https://my-ctf.lan`). Could use `CTFD_URL` environment variable instead.",
                    )
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("api_key", AttributeType::String)
                    .markdown_description(
                        "User API key. Could use `CTFD_API_KEY` environment variable instead. Despite being the most convenient way to authenticate yourself, we do not recommend it as you will probably generate a long-live token without any rotation policy.",
                    )
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("username", AttributeType::String)
                    .markdown_description(
                        "The administrator or service account username to login with. Could use `CTFD_ADMIN_USERNAME` environment variable instead.",
                    )
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("password", AttributeType::String)
                    .markdown_description(
                        "The administrator or service account password to login with. Could use `CTFD_ADMIN_PASSWORD` environment variable instead.",
                    )
                    .optional()
                    .sensitive()
                    .build(),
            )
            .build();

        ProviderSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        let mut diagnostics = vec![];

        if let Dynamic::String(raw) = request.config.get_dynamic(&AttributePath::new("url")) {
            let valid = url::Url::parse(&raw)
                .map(|parsed| matches!(parsed.scheme(), "http" | "https"))
                .unwrap_or(false);
            if !valid {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid CTFd url",
                        format!("'{}' is not an http or https URL", raw),
                    )
                    .with_attribute(AttributePath::new("url")),
                );
            }
        }

        ValidateProviderConfigResponse { diagnostics }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        let config = match config::resolve(&request.config) {
            Ok(config) => config,
            Err(errors) => {
                return ConfigureProviderResponse {
                    diagnostics: errors.iter().map(config::ConfigError::to_diagnostic).collect(),
                    provider_data: None,
                }
            }
        };

        match self.open_session(&config).await {
            Ok(client) => {
                tracing::info!(
                    success = true,
                    login = config.credentials.is_some(),
                    "Configure CTFd API client"
                );
                ConfigureProviderResponse {
                    diagnostics: vec![],
                    provider_data: Some(Arc::new(CtfdcmProviderData::new(client))),
                }
            }
            Err(diag) => ConfigureProviderResponse {
                diagnostics: vec![diag],
                provider_data: None,
            },
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut factories: HashMap<String, ResourceFactory> = HashMap::new();
        factories.insert(
            "ctfdcm_challenge_dynamiciac".to_string(),
            Box::new(|| {
                Box::new(resources::ChallengeDynamicIaCResource::new())
                    as Box<dyn ResourceWithConfigure>
            }),
        );
        factories.insert(
            "ctfdcm_instance".to_string(),
            Box::new(|| {
                Box::new(resources::InstanceResource::new()) as Box<dyn ResourceWithConfigure>
            }),
        );
        factories
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut factories: HashMap<String, DataSourceFactory> = HashMap::new();
        factories.insert(
            "ctfdcm_challenges_dynamiciac".to_string(),
            Box::new(|| {
                Box::new(data_sources::ChallengesDynamicIaCDataSource::new())
                    as Box<dyn DataSourceWithConfigure>
            }),
        );
        factories
    }
}
