//! gRPC service implementation
//!
//! Bridges the generated `tfplugin6` service onto the framework traits.
//! Resources and data sources are created from their factories on every
//! call and, for operations that talk to the upstream API, configured with
//! the provider data captured by ConfigureProvider.

use crate::context::Context;
use crate::data_source::{
    ConfigureDataSourceRequest, DataSourceSchemaRequest, DataSourceWithConfigure,
    ReadDataSourceRequest, ValidateDataSourceConfigRequest,
};
use crate::error::TfplugError;
use crate::plan;
use crate::proto;
use crate::provider::{
    ConfigureProviderRequest, Provider, ProviderSchemaRequest, ValidateProviderConfigRequest,
};
use crate::resource::{
    ConfigureResourceRequest, CreateResourceRequest, DeleteResourceRequest,
    ImportResourceStateRequest, ReadResourceRequest, ResourceSchemaRequest,
    ResourceWithConfigure, UpdateResourceRequest, ValidateResourceConfigRequest,
};
use crate::schema::{Attribute, ObjectNestingMode, Schema, StringKind};
use crate::types::{
    has_errors, AttributePath, AttributePathStep, ClientCapabilities, Diagnostic,
    DiagnosticSeverity, DynamicValue, RawState, ServerCapabilities,
};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tonic::{Request, Response, Status};

type ProviderData = Option<Arc<dyn Any + Send + Sync>>;

pub struct GrpcProviderServer<P: Provider> {
    provider: Arc<RwLock<P>>,
    provider_data: Arc<RwLock<ProviderData>>,
    stop: Context,
}

impl<P: Provider + 'static> GrpcProviderServer<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider: Arc::new(RwLock::new(provider)),
            provider_data: Arc::new(RwLock::new(None)),
            stop: Context::new(),
        }
    }

    /// Cancelled once Terraform calls StopProvider
    pub fn stop_context(&self) -> Context {
        self.stop.clone()
    }

    fn request_context(&self) -> Context {
        self.stop.child_context()
    }

    async fn new_resource(
        &self,
        type_name: &str,
    ) -> Result<Box<dyn ResourceWithConfigure>, TfplugError> {
        let provider = self.provider.read().await;
        let factory = provider
            .resources()
            .remove(type_name)
            .ok_or_else(|| TfplugError::ResourceNotFound(type_name.to_string()))?;
        Ok(factory())
    }

    async fn new_data_source(
        &self,
        type_name: &str,
    ) -> Result<Box<dyn DataSourceWithConfigure>, TfplugError> {
        let provider = self.provider.read().await;
        let factory = provider
            .data_sources()
            .remove(type_name)
            .ok_or_else(|| TfplugError::DataSourceNotFound(type_name.to_string()))?;
        Ok(factory())
    }

    async fn configured_resource(
        &self,
        ctx: &Context,
        type_name: &str,
    ) -> Result<(Box<dyn ResourceWithConfigure>, Vec<Diagnostic>), TfplugError> {
        let mut resource = self.new_resource(type_name).await?;
        let provider_data = self.provider_data.read().await.clone();
        let response = resource
            .configure(ctx.clone(), ConfigureResourceRequest { provider_data })
            .await;
        Ok((resource, response.diagnostics))
    }

    async fn configured_data_source(
        &self,
        ctx: &Context,
        type_name: &str,
    ) -> Result<(Box<dyn DataSourceWithConfigure>, Vec<Diagnostic>), TfplugError> {
        let mut data_source = self.new_data_source(type_name).await?;
        let provider_data = self.provider_data.read().await.clone();
        let response = data_source
            .configure(ctx.clone(), ConfigureDataSourceRequest { provider_data })
            .await;
        Ok((data_source, response.diagnostics))
    }
}

fn cancelled() -> Diagnostic {
    Diagnostic::error(
        "Operation cancelled",
        "Terraform asked the provider to stop before the operation completed",
    )
}

#[tonic::async_trait]
impl<P: Provider + 'static> proto::ProviderService for GrpcProviderServer<P> {
    async fn get_metadata(
        &self,
        _request: Request<proto::get_metadata::Request>,
    ) -> Result<Response<proto::get_metadata::Response>, Status> {
        let provider = self.provider.read().await;

        let mut resources: Vec<String> = provider.resources().into_keys().collect();
        resources.sort();
        let mut data_sources: Vec<String> = provider.data_sources().into_keys().collect();
        data_sources.sort();

        Ok(Response::new(proto::get_metadata::Response {
            server_capabilities: Some(capabilities_to_proto(ServerCapabilities::default())),
            diagnostics: vec![],
            data_sources: data_sources
                .into_iter()
                .map(|type_name| proto::get_metadata::DataSourceMetadata { type_name })
                .collect(),
            resources: resources
                .into_iter()
                .map(|type_name| proto::get_metadata::ResourceMetadata { type_name })
                .collect(),
        }))
    }

    async fn get_provider_schema(
        &self,
        _request: Request<proto::get_provider_schema::Request>,
    ) -> Result<Response<proto::get_provider_schema::Response>, Status> {
        let ctx = self.request_context();
        let provider = self.provider.read().await;
        let mut diagnostics = vec![];

        let provider_schema = provider.schema(ctx.clone(), ProviderSchemaRequest).await;
        diagnostics.extend(provider_schema.diagnostics);

        let mut resource_schemas = HashMap::new();
        for (type_name, factory) in provider.resources() {
            let response = factory().schema(ctx.clone(), ResourceSchemaRequest).await;
            diagnostics.extend(response.diagnostics);
            resource_schemas.insert(type_name, schema_to_proto(&response.schema));
        }

        let mut data_source_schemas = HashMap::new();
        for (type_name, factory) in provider.data_sources() {
            let response = factory().schema(ctx.clone(), DataSourceSchemaRequest).await;
            diagnostics.extend(response.diagnostics);
            data_source_schemas.insert(type_name, schema_to_proto(&response.schema));
        }

        Ok(Response::new(proto::get_provider_schema::Response {
            provider: Some(schema_to_proto(&provider_schema.schema)),
            resource_schemas,
            data_source_schemas,
            diagnostics: diagnostics_to_proto(diagnostics),
            provider_meta: None,
            server_capabilities: Some(capabilities_to_proto(ServerCapabilities::default())),
        }))
    }

    async fn validate_provider_config(
        &self,
        request: Request<proto::validate_provider_config::Request>,
    ) -> Result<Response<proto::validate_provider_config::Response>, Status> {
        let request = request.into_inner();
        let ctx = self.request_context();
        let config = decode_value(request.config.as_ref())?;

        let provider = self.provider.read().await;
        let schema = provider
            .schema(ctx.clone(), ProviderSchemaRequest)
            .await
            .schema;

        let mut diagnostics = plan::validate_config(&schema, &config);
        let response = provider
            .validate(ctx, ValidateProviderConfigRequest { config })
            .await;
        diagnostics.extend(response.diagnostics);

        Ok(Response::new(proto::validate_provider_config::Response {
            diagnostics: diagnostics_to_proto(diagnostics),
        }))
    }

    async fn validate_resource_config(
        &self,
        request: Request<proto::validate_resource_config::Request>,
    ) -> Result<Response<proto::validate_resource_config::Response>, Status> {
        let request = request.into_inner();
        let ctx = self.request_context();
        let config = decode_value(request.config.as_ref())?;

        let resource = self.new_resource(&request.type_name).await?;
        let schema = resource
            .schema(ctx.clone(), ResourceSchemaRequest)
            .await
            .schema;

        let mut diagnostics = plan::validate_config(&schema, &config);
        let response = resource
            .validate(
                ctx,
                ValidateResourceConfigRequest {
                    type_name: request.type_name,
                    config,
                    client_capabilities: capabilities_from_proto(request.client_capabilities),
                },
            )
            .await;
        diagnostics.extend(response.diagnostics);

        Ok(Response::new(proto::validate_resource_config::Response {
            diagnostics: diagnostics_to_proto(diagnostics),
        }))
    }

    async fn validate_data_resource_config(
        &self,
        request: Request<proto::validate_data_resource_config::Request>,
    ) -> Result<Response<proto::validate_data_resource_config::Response>, Status> {
        let request = request.into_inner();
        let ctx = self.request_context();
        let config = decode_value(request.config.as_ref())?;

        let data_source = self.new_data_source(&request.type_name).await?;
        let schema = data_source
            .schema(ctx.clone(), DataSourceSchemaRequest)
            .await
            .schema;

        let mut diagnostics = plan::validate_config(&schema, &config);
        let response = data_source
            .validate(
                ctx,
                ValidateDataSourceConfigRequest {
                    type_name: request.type_name,
                    config,
                },
            )
            .await;
        diagnostics.extend(response.diagnostics);

        Ok(Response::new(proto::validate_data_resource_config::Response {
            diagnostics: diagnostics_to_proto(diagnostics),
        }))
    }

    async fn upgrade_resource_state(
        &self,
        request: Request<proto::upgrade_resource_state::Request>,
    ) -> Result<Response<proto::upgrade_resource_state::Response>, Status> {
        let request = request.into_inner();
        let ctx = self.request_context();

        let resource = self.new_resource(&request.type_name).await?;
        let schema = resource.schema(ctx, ResourceSchemaRequest).await.schema;
        let raw_state = raw_state_from_proto(request.raw_state);

        let (upgraded_state, diagnostics) =
            match plan::upgrade_state(&schema, request.version, &raw_state) {
                Ok(state) => (Some(encode_value(&state)?), vec![]),
                Err(diagnostic) => (None, vec![diagnostic]),
            };

        Ok(Response::new(proto::upgrade_resource_state::Response {
            upgraded_state,
            diagnostics: diagnostics_to_proto(diagnostics),
        }))
    }

    async fn configure_provider(
        &self,
        request: Request<proto::configure_provider::Request>,
    ) -> Result<Response<proto::configure_provider::Response>, Status> {
        let request = request.into_inner();
        let ctx = self.request_context();
        let config = decode_value(request.config.as_ref())?;

        let mut provider = self.provider.write().await;
        let configure = provider.configure(
            ctx.clone(),
            ConfigureProviderRequest {
                terraform_version: request.terraform_version,
                config,
                client_capabilities: capabilities_from_proto(request.client_capabilities),
            },
        );

        let diagnostics = match ctx.run(configure).await {
            Some(response) => {
                if !has_errors(&response.diagnostics) {
                    *self.provider_data.write().await = response.provider_data;
                }
                response.diagnostics
            }
            None => vec![cancelled()],
        };

        Ok(Response::new(proto::configure_provider::Response {
            diagnostics: diagnostics_to_proto(diagnostics),
        }))
    }

    async fn read_resource(
        &self,
        request: Request<proto::read_resource::Request>,
    ) -> Result<Response<proto::read_resource::Response>, Status> {
        let request = request.into_inner();
        let ctx = self.request_context();
        let current_state = decode_value(request.current_state.as_ref())?;
        let provider_meta = decode_optional(request.provider_meta.as_ref())?;

        let (resource, mut diagnostics) = self
            .configured_resource(&ctx, &request.type_name)
            .await?;
        if has_errors(&diagnostics) {
            return Ok(Response::new(proto::read_resource::Response {
                new_state: Some(encode_value(&current_state)?),
                diagnostics: diagnostics_to_proto(diagnostics),
                private: request.private,
            }));
        }

        let read = resource.read(
            ctx.clone(),
            ReadResourceRequest {
                type_name: request.type_name,
                current_state: current_state.clone(),
                private: request.private.clone(),
                provider_meta,
                client_capabilities: capabilities_from_proto(request.client_capabilities),
            },
        );

        let (new_state, private) = match ctx.run(read).await {
            Some(response) => {
                diagnostics.extend(response.diagnostics);
                (
                    response.new_state.unwrap_or_else(DynamicValue::null),
                    response.private,
                )
            }
            None => {
                diagnostics.push(cancelled());
                (current_state, request.private)
            }
        };

        Ok(Response::new(proto::read_resource::Response {
            new_state: Some(encode_value(&new_state)?),
            diagnostics: diagnostics_to_proto(diagnostics),
            private,
        }))
    }

    async fn plan_resource_change(
        &self,
        request: Request<proto::plan_resource_change::Request>,
    ) -> Result<Response<proto::plan_resource_change::Response>, Status> {
        let request = request.into_inner();
        let ctx = self.request_context();
        let prior_state = decode_value(request.prior_state.as_ref())?;
        let proposed_new_state = decode_value(request.proposed_new_state.as_ref())?;
        let config = decode_value(request.config.as_ref())?;

        let resource = self.new_resource(&request.type_name).await?;
        let schema = resource.schema(ctx, ResourceSchemaRequest).await.schema;

        let change =
            plan::plan_resource_change(&schema, &prior_state, &proposed_new_state, &config);

        tracing::debug!(
            type_name = %request.type_name,
            requires_replace = change.requires_replace.len(),
            "Planned resource change"
        );

        Ok(Response::new(proto::plan_resource_change::Response {
            planned_state: Some(encode_value(&change.planned_state)?),
            requires_replace: change.requires_replace.iter().map(path_to_proto).collect(),
            planned_private: request.prior_private,
            diagnostics: diagnostics_to_proto(change.diagnostics),
            legacy_type_system: false,
        }))
    }

    async fn apply_resource_change(
        &self,
        request: Request<proto::apply_resource_change::Request>,
    ) -> Result<Response<proto::apply_resource_change::Response>, Status> {
        let request = request.into_inner();
        let ctx = self.request_context();
        let prior_state = decode_value(request.prior_state.as_ref())?;
        let planned_state = decode_value(request.planned_state.as_ref())?;
        let config = decode_value(request.config.as_ref())?;
        let provider_meta = decode_optional(request.provider_meta.as_ref())?;
        let type_name = request.type_name;

        let (resource, mut diagnostics) = self.configured_resource(&ctx, &type_name).await?;
        if has_errors(&diagnostics) {
            return Ok(Response::new(proto::apply_resource_change::Response {
                new_state: Some(encode_value(&prior_state)?),
                private: vec![],
                diagnostics: diagnostics_to_proto(diagnostics),
                legacy_type_system: false,
            }));
        }

        let (new_state, private) = if prior_state.is_null() {
            tracing::debug!(type_name = %type_name, "Creating resource");
            let create = resource.create(
                ctx.clone(),
                CreateResourceRequest {
                    type_name,
                    planned_state,
                    config,
                    planned_private: request.planned_private,
                    provider_meta,
                },
            );
            match ctx.run(create).await {
                Some(response) => {
                    diagnostics.extend(response.diagnostics);
                    (response.new_state, response.private)
                }
                None => {
                    diagnostics.push(cancelled());
                    (DynamicValue::null(), vec![])
                }
            }
        } else if planned_state.is_null() {
            tracing::debug!(type_name = %type_name, "Deleting resource");
            let delete = resource.delete(
                ctx.clone(),
                DeleteResourceRequest {
                    type_name,
                    prior_state: prior_state.clone(),
                    planned_private: request.planned_private,
                    provider_meta,
                },
            );
            match ctx.run(delete).await {
                Some(response) if has_errors(&response.diagnostics) => {
                    diagnostics.extend(response.diagnostics);
                    (prior_state, vec![])
                }
                Some(response) => {
                    diagnostics.extend(response.diagnostics);
                    (DynamicValue::null(), vec![])
                }
                None => {
                    diagnostics.push(cancelled());
                    (prior_state, vec![])
                }
            }
        } else {
            tracing::debug!(type_name = %type_name, "Updating resource");
            let update = resource.update(
                ctx.clone(),
                UpdateResourceRequest {
                    type_name,
                    prior_state: prior_state.clone(),
                    planned_state,
                    config,
                    planned_private: request.planned_private,
                    provider_meta,
                },
            );
            match ctx.run(update).await {
                Some(response) => {
                    diagnostics.extend(response.diagnostics);
                    (response.new_state, response.private)
                }
                None => {
                    diagnostics.push(cancelled());
                    (prior_state, vec![])
                }
            }
        };

        Ok(Response::new(proto::apply_resource_change::Response {
            new_state: Some(encode_value(&new_state)?),
            private,
            diagnostics: diagnostics_to_proto(diagnostics),
            legacy_type_system: false,
        }))
    }

    async fn import_resource_state(
        &self,
        request: Request<proto::import_resource_state::Request>,
    ) -> Result<Response<proto::import_resource_state::Response>, Status> {
        let request = request.into_inner();
        let ctx = self.request_context();

        let (resource, mut diagnostics) = self
            .configured_resource(&ctx, &request.type_name)
            .await?;

        let Some(importer) = resource.as_import_state() else {
            diagnostics.push(Diagnostic::error(
                "Resource Import Not Implemented",
                format!(
                    "This resource does not support import: {}",
                    request.type_name
                ),
            ));
            return Ok(Response::new(proto::import_resource_state::Response {
                imported_resources: vec![],
                diagnostics: diagnostics_to_proto(diagnostics),
            }));
        };

        let schema = resource
            .schema(ctx.clone(), ResourceSchemaRequest)
            .await
            .schema;

        let import = importer.import_state(
            ctx.clone(),
            ImportResourceStateRequest {
                type_name: request.type_name,
                id: request.id,
                client_capabilities: capabilities_from_proto(request.client_capabilities),
            },
        );

        let mut imported_resources = vec![];
        match ctx.run(import).await {
            Some(response) => {
                diagnostics.extend(response.diagnostics);
                for imported in response.imported_resources {
                    // Terraform decodes the state against the full schema type
                    let state =
                        DynamicValue::new(plan::conform_to_schema(&schema, imported.state.value));
                    imported_resources.push(proto::import_resource_state::ImportedResource {
                        type_name: imported.type_name,
                        state: Some(encode_value(&state)?),
                        private: imported.private,
                    });
                }
            }
            None => diagnostics.push(cancelled()),
        }

        Ok(Response::new(proto::import_resource_state::Response {
            imported_resources,
            diagnostics: diagnostics_to_proto(diagnostics),
        }))
    }

    async fn read_data_source(
        &self,
        request: Request<proto::read_data_source::Request>,
    ) -> Result<Response<proto::read_data_source::Response>, Status> {
        let request = request.into_inner();
        let ctx = self.request_context();
        let config = decode_value(request.config.as_ref())?;
        let provider_meta = decode_optional(request.provider_meta.as_ref())?;

        let (data_source, mut diagnostics) = self
            .configured_data_source(&ctx, &request.type_name)
            .await?;
        if has_errors(&diagnostics) {
            return Ok(Response::new(proto::read_data_source::Response {
                state: None,
                diagnostics: diagnostics_to_proto(diagnostics),
            }));
        }

        let read = data_source.read(
            ctx.clone(),
            ReadDataSourceRequest {
                type_name: request.type_name,
                config,
                provider_meta,
                client_capabilities: capabilities_from_proto(request.client_capabilities),
            },
        );

        let state = match ctx.run(read).await {
            Some(response) => {
                diagnostics.extend(response.diagnostics);
                Some(encode_value(&response.state)?)
            }
            None => {
                diagnostics.push(cancelled());
                None
            }
        };

        Ok(Response::new(proto::read_data_source::Response {
            state,
            diagnostics: diagnostics_to_proto(diagnostics),
        }))
    }

    async fn stop_provider(
        &self,
        _request: Request<proto::stop_provider::Request>,
    ) -> Result<Response<proto::stop_provider::Response>, Status> {
        tracing::info!("Stop requested, cancelling in-flight operations");
        self.stop.cancel();

        Ok(Response::new(proto::stop_provider::Response {
            error: String::new(),
        }))
    }
}

fn decode_value(value: Option<&proto::DynamicValue>) -> Result<DynamicValue, TfplugError> {
    match value {
        Some(value) if !value.msgpack.is_empty() => DynamicValue::decode_msgpack(&value.msgpack),
        Some(value) if !value.json.is_empty() => DynamicValue::decode_json(&value.json),
        _ => Ok(DynamicValue::null()),
    }
}

fn decode_optional(
    value: Option<&proto::DynamicValue>,
) -> Result<Option<DynamicValue>, TfplugError> {
    value.map(|v| decode_value(Some(v))).transpose()
}

fn encode_value(value: &DynamicValue) -> Result<proto::DynamicValue, TfplugError> {
    Ok(proto::DynamicValue {
        msgpack: value.encode_msgpack()?,
        json: vec![],
    })
}

fn raw_state_from_proto(raw_state: Option<proto::RawState>) -> RawState {
    let raw_state = raw_state.unwrap_or_default();
    RawState {
        json: Some(raw_state.json).filter(|json| !json.is_empty()),
        flatmap: Some(raw_state.flatmap).filter(|flatmap| !flatmap.is_empty()),
    }
}

fn capabilities_from_proto(capabilities: Option<proto::ClientCapabilities>) -> ClientCapabilities {
    capabilities
        .map(|c| ClientCapabilities {
            deferral_allowed: c.deferral_allowed,
            write_only_attributes_allowed: c.write_only_attributes_allowed,
        })
        .unwrap_or_default()
}

fn capabilities_to_proto(capabilities: ServerCapabilities) -> proto::ServerCapabilities {
    proto::ServerCapabilities {
        plan_destroy: capabilities.plan_destroy,
        get_provider_schema_optional: capabilities.get_provider_schema_optional,
        move_resource_state: capabilities.move_resource_state,
    }
}

fn path_to_proto(path: &AttributePath) -> proto::AttributePath {
    use proto::attribute_path::step::Selector;

    proto::AttributePath {
        steps: path
            .steps
            .iter()
            .map(|step| proto::attribute_path::Step {
                selector: Some(match step {
                    AttributePathStep::AttributeName(name) => Selector::AttributeName(name.clone()),
                    AttributePathStep::ElementKeyString(key) => {
                        Selector::ElementKeyString(key.clone())
                    }
                    AttributePathStep::ElementKeyInt(idx) => Selector::ElementKeyInt(*idx),
                }),
            })
            .collect(),
    }
}

fn diagnostics_to_proto(diagnostics: Vec<Diagnostic>) -> Vec<proto::Diagnostic> {
    diagnostics
        .into_iter()
        .map(|diag| {
            let severity = match diag.severity {
                DiagnosticSeverity::Invalid => proto::diagnostic::Severity::Invalid,
                DiagnosticSeverity::Error => proto::diagnostic::Severity::Error,
                DiagnosticSeverity::Warning => proto::diagnostic::Severity::Warning,
            };
            proto::Diagnostic {
                severity: severity as i32,
                summary: diag.summary,
                detail: diag.detail,
                attribute: diag.attribute.as_ref().map(path_to_proto),
            }
        })
        .collect()
}

fn string_kind_to_proto(kind: StringKind) -> i32 {
    match kind {
        StringKind::Plain => proto::StringKind::Plain as i32,
        StringKind::Markdown => proto::StringKind::Markdown as i32,
    }
}

fn schema_to_proto(schema: &Schema) -> proto::Schema {
    proto::Schema {
        version: schema.version,
        block: Some(proto::schema::Block {
            version: schema.block.version,
            attributes: schema.block.attributes.iter().map(attribute_to_proto).collect(),
            block_types: vec![],
            description: schema.block.description.clone(),
            description_kind: string_kind_to_proto(schema.block.description_kind),
            deprecated: schema.block.deprecated,
        }),
    }
}

fn attribute_to_proto(attr: &Attribute) -> proto::schema::Attribute {
    use proto::schema::object::NestingMode;

    // Nested attributes carry their structure in nested_type instead of type
    let (r#type, nested_type) = match &attr.nested_type {
        Some(nested) => {
            let nesting = match nested.nesting {
                ObjectNestingMode::Single => NestingMode::Single,
                ObjectNestingMode::List => NestingMode::List,
                ObjectNestingMode::Set => NestingMode::Set,
                ObjectNestingMode::Map => NestingMode::Map,
            };
            (
                vec![],
                Some(proto::schema::Object {
                    attributes: nested.attributes.iter().map(attribute_to_proto).collect(),
                    nesting: nesting as i32,
                }),
            )
        }
        None => (attr.r#type.to_json_bytes(), None),
    };

    proto::schema::Attribute {
        name: attr.name.clone(),
        r#type,
        nested_type,
        description: attr.description.clone(),
        required: attr.required,
        optional: attr.optional,
        computed: attr.computed,
        sensitive: attr.sensitive,
        description_kind: string_kind_to_proto(attr.description_kind),
        deprecated: attr.deprecated,
        write_only: false,
    }
}
