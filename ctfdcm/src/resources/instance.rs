//! Chall-Manager instance resource implementation

use async_trait::async_trait;
use std::collections::HashMap;
use tfplug::context::Context;
use tfplug::plan_modifier::RequiresReplace;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure, UpdateResourceRequest,
    UpdateResourceResponse, ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{Diagnostic, Dynamic, DynamicValue};

use super::values::required_string;
use super::{client_error, not_configured, provider_data_from};
use crate::api::instances::InstanceKey;
use crate::api::Client;

#[derive(Default)]
pub struct InstanceResource {
    provider_data: Option<crate::CtfdcmProviderData>,
}

impl InstanceResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn client(&self) -> Result<&Client, Diagnostic> {
        self.provider_data
            .as_ref()
            .map(|data| data.client.as_ref())
            .ok_or_else(not_configured)
    }

    fn key_from(state: &DynamicValue) -> Result<InstanceKey, Diagnostic> {
        Ok(InstanceKey::new(
            required_string(state, "challenge_id")?,
            required_string(state, "source_id")?,
        ))
    }

    fn state_of(key: &InstanceKey) -> DynamicValue {
        let mut entries = HashMap::new();
        entries.insert(
            "challenge_id".to_string(),
            Dynamic::String(key.challenge_id.clone()),
        );
        entries.insert("source_id".to_string(), Dynamic::String(key.source_id.clone()));
        DynamicValue::new(Dynamic::Map(entries))
    }
}

#[async_trait]
impl Resource for InstanceResource {
    fn type_name(&self) -> &str {
        "ctfdcm_instance"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .markdown_description(
                "An instance of a dynamic IaC challenge, provisioned through [Chall-Manager](https://github.com/ctfer-io/chall-manager) for a given source.",
            )
            .attribute(
                AttributeBuilder::new("challenge_id", AttributeType::String)
                    .description("The challenge to provision an instance of.")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("source_id", AttributeType::String)
                    .description("The source of whom to provision an instance for.")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn create(
        &self,
        _ctx: Context,
        request: CreateResourceRequest,
    ) -> CreateResourceResponse {
        let result = async {
            let client = self.client()?;
            let key = Self::key_from(&request.planned_state)?;
            client.instances().create(&key).await.map_err(|e| {
                client_error(format!("Unable to create instance, got error: {}", e))
            })?;
            tracing::info!(
                challenge_id = %key.challenge_id,
                source_id = %key.source_id,
                "Provisioned instance"
            );
            Ok::<_, Diagnostic>(key)
        }
        .await;

        match result {
            Ok(key) => CreateResourceResponse {
                new_state: Self::state_of(&key),
                private: vec![],
                diagnostics: vec![],
            },
            Err(diag) => CreateResourceResponse {
                new_state: DynamicValue::null(),
                private: vec![],
                diagnostics: vec![diag],
            },
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let result = async {
            let client = self.client()?;
            let key = Self::key_from(&request.current_state)?;
            client.instances().get(&key).await.map_err(|e| {
                client_error(format!("Unable to read instance, got error: {}", e))
            })?;
            Ok::<_, Diagnostic>(key)
        }
        .await;

        match result {
            Ok(key) => ReadResourceResponse {
                new_state: Some(Self::state_of(&key)),
                diagnostics: vec![],
                private: request.private,
            },
            Err(diag) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![diag],
                private: request.private,
            },
        }
    }

    async fn update(
        &self,
        _ctx: Context,
        request: UpdateResourceRequest,
    ) -> UpdateResourceResponse {
        // Both attributes force replacement, so Terraform only lands here on a contract violation
        UpdateResourceResponse {
            new_state: request.prior_state,
            private: vec![],
            diagnostics: vec![Diagnostic::error(
                "Unsupported operation",
                "An instance cannot be updated in place, destroy and recreate it instead",
            )],
        }
    }

    async fn delete(
        &self,
        _ctx: Context,
        request: DeleteResourceRequest,
    ) -> DeleteResourceResponse {
        let result = async {
            let client = self.client()?;
            let key = Self::key_from(&request.prior_state)?;
            client.instances().delete(&key).await.map_err(|e| {
                client_error(format!("Unable to delete instance, got error: {}", e))
            })
        }
        .await;

        DeleteResourceResponse {
            diagnostics: result.err().into_iter().collect(),
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for InstanceResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        match provider_data_from(request.provider_data) {
            Ok(data) => {
                self.provider_data = Some(data);
                ConfigureResourceResponse {
                    diagnostics: vec![],
                }
            }
            Err(diag) => ConfigureResourceResponse {
                diagnostics: vec![diag],
            },
        }
    }
}
