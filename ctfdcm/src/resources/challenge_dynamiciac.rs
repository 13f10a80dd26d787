//! Dynamic IaC challenge resource implementation

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::defaults::StaticDefault;
use tfplug::import::import_state_passthrough_id;
use tfplug::plan_modifier::UseStateForUnknown;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure,
    ResourceWithImportState, UpdateResourceRequest, UpdateResourceResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{Attribute, AttributeBuilder, AttributeType, NestedType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::{Int64Value, StringOneOf};

use super::challenge_model::{ChallengeDynamicIaCModel, BEHAVIOR_ANONYMIZED, BEHAVIOR_HIDDEN};
use super::reconcile::reconcile;
use super::values::{string_attr, string_list};
use super::{client_error, not_configured, provider_data_from};
use crate::api::common::parse_id;
use crate::api::Client;

#[derive(Default)]
pub struct ChallengeDynamicIaCResource {
    provider_data: Option<crate::CtfdcmProviderData>,
}

impl ChallengeDynamicIaCResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn client(&self) -> Result<&Client, Diagnostic> {
        self.provider_data
            .as_ref()
            .map(|data| data.client.as_ref())
            .ok_or_else(not_configured)
    }

    fn requirements_attribute() -> Attribute {
        AttributeBuilder::nested(
            "requirements",
            NestedType::single(vec![
                AttributeBuilder::new("behavior", AttributeType::String)
                    .markdown_description(
                        "Behavior of the challenge while locked, either `hidden` or `anonymized`.",
                    )
                    .optional()
                    .computed()
                    .default(StaticDefault::string(BEHAVIOR_HIDDEN))
                    .validator(StringOneOf::create(&[BEHAVIOR_HIDDEN, BEHAVIOR_ANONYMIZED]))
                    .build(),
                AttributeBuilder::new(
                    "prerequisites",
                    AttributeType::List(Box::new(AttributeType::String)),
                )
                .description("IDs of the challenges to solve before this one unlocks.")
                .optional()
                .computed()
                .default(StaticDefault::list(vec![]))
                .build(),
            ]),
        )
        .description("Requirements to unlock the challenge.")
        .optional()
        .build()
    }

    /// Syncs tags then topics with the model, stopping at the first failure
    async fn reconcile_collections(
        client: &Client,
        model: &ChallengeDynamicIaCModel,
        challenge_id: i64,
    ) -> Result<(), Diagnostic> {
        reconcile(&client.tags(), challenge_id, &model.tags)
            .await
            .map_err(|e| client_error(e.to_string()))?;
        reconcile(&client.topics(), challenge_id, &model.topics)
            .await
            .map_err(|e| client_error(e.to_string()))
    }

    async fn create_challenge(
        &self,
        planned_state: &DynamicValue,
    ) -> Result<DynamicValue, Diagnostic> {
        let client = self.client()?;
        let mut model = ChallengeDynamicIaCModel::from_dynamic(planned_state)?;
        let request = model.to_request(true)?;

        let created = client.challenges().create(&request).await.map_err(|e| {
            client_error(format!("Unable to create challenge, got error: {}", e))
        })?;
        tracing::debug!(challenge_id = created.id, "Created challenge");

        model.id = Some(created.id.to_string());
        model.timeout = created.timeout;
        model.until = created.until.clone();

        Self::reconcile_collections(client, &model, created.id).await?;
        Ok(model.to_dynamic())
    }

    async fn update_challenge(
        &self,
        planned_state: &DynamicValue,
        prior_state: &DynamicValue,
    ) -> Result<DynamicValue, Diagnostic> {
        let client = self.client()?;
        let mut model = ChallengeDynamicIaCModel::from_dynamic(planned_state)?;
        if model.id.is_none() {
            model.id = string_attr(prior_state, "id");
        }
        let id = model.id.clone().unwrap_or_default();
        let challenge_id = parse_id(&id).map_err(|e| {
            client_error(format!("Unable to update challenge {}, got error: {}", id, e))
        })?;

        let request = model.to_request(false)?;
        let updated = client
            .challenges()
            .update(challenge_id, &request)
            .await
            .map_err(|e| {
                client_error(format!("Unable to update challenge, got error: {}", e))
            })?;
        tracing::debug!(challenge_id, "Updated challenge");

        model.timeout = updated.timeout;
        model.until = updated.until.clone();

        Self::reconcile_collections(client, &model, challenge_id).await?;
        Ok(model.to_dynamic())
    }
}

#[async_trait]
impl Resource for ChallengeDynamicIaCResource {
    fn type_name(&self) -> &str {
        "ctfdcm_challenge_dynamiciac"
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
                "CTFd is built around the Challenge resource, which contains all the attributes to define a part of the Capture The Flag event.\n\n\
                 This implementation has support for On Demand infrastructures through [Chall-Manager](https://github.com/ctfer-io/chall-manager).",
            )
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Identifier of the challenge.")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Name of the challenge, displayed as it.")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("category", AttributeType::String)
                    .description("Category of the challenge that CTFd groups by on the web UI.")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("Description of the challenge, consider using multiline descriptions for better style.")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("attribution", AttributeType::String)
                    .description("Attribution to the creator(s) of the challenge.")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("connection_info", AttributeType::String)
                    .description("Connection Information to connect to the challenge instance, useful for pwn, web and infrastructure pentests.")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("max_attempts", AttributeType::Number)
                    .description("Maximum amount of attempts before being unable to flag the challenge.")
                    .validator(Int64Value::create())
                    .optional()
                    .computed()
                    .default(StaticDefault::number(0.0))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("function", AttributeType::String)
                    .markdown_description("Decay function to define how the challenge value evolve through solves, either `linear` or `logarithmic`.")
                    .optional()
                    .computed()
                    .default(StaticDefault::string("linear"))
                    .validator(StringOneOf::create(&["linear", "logarithmic"]))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("value", AttributeType::Number)
                    .description("The value (points) of the challenge once solved.")
                    .validator(Int64Value::create())
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("decay", AttributeType::Number)
                    .description("The decay defines from each number of solves does the decay function triggers until reaching minimum.")
                    .validator(Int64Value::create())
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("minimum", AttributeType::Number)
                    .description("The minimum points for a dynamic-score challenge to reach with the decay function.")
                    .validator(Int64Value::create())
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("state", AttributeType::String)
                    .markdown_description("State of the challenge, either `hidden` or `visible`.")
                    .optional()
                    .computed()
                    .default(StaticDefault::string("hidden"))
                    .validator(StringOneOf::create(&["hidden", "visible"]))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("next", AttributeType::Number)
                    .description("Suggestion for the end-user as next challenge to work on.")
                    .validator(Int64Value::create())
                    .optional()
                    .build(),
            )
            .attribute(Self::requirements_attribute())
            .attribute(
                AttributeBuilder::new("tags", AttributeType::List(Box::new(AttributeType::String)))
                    .description("List of challenge tags that will be displayed to the end-user.")
                    .optional()
                    .computed()
                    .default(StaticDefault::list(vec![]))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("topics", AttributeType::List(Box::new(AttributeType::String)))
                    .description("List of challenge topics that are displayed to the administrators for maintenance and planification.")
                    .optional()
                    .computed()
                    .default(StaticDefault::list(vec![]))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("shared", AttributeType::Bool)
                    .description("Whether the instance will be shared between all players.")
                    .optional()
                    .computed()
                    .default(StaticDefault::bool(false))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("destroy_on_flag", AttributeType::Bool)
                    .description("Whether to destroy the instance once flagged.")
                    .optional()
                    .computed()
                    .default(StaticDefault::bool(false))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("mana_cost", AttributeType::Number)
                    .description("The cost (in mana) of the challenge once an instance is deployed.")
                    .validator(Int64Value::create())
                    .optional()
                    .computed()
                    .default(StaticDefault::number(0.0))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("scenario_id", AttributeType::String)
                    .description("The file's ID of the scenario.")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("timeout", AttributeType::Number)
                    .description("The timeout (in seconds) after which the instance will be janitored.")
                    .validator(Int64Value::create())
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("until", AttributeType::String)
                    .description("The date until the instance could run before being janitored.")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("additional", AttributeType::Map(Box::new(AttributeType::String)))
                    .description("An optional key=value map (both strings) to pass to the scenario.")
                    .optional()
                    .computed()
                    .default(StaticDefault::empty_map())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("min", AttributeType::Number)
                    .description("The minimum number of instances to set in the pool.")
                    .validator(Int64Value::create())
                    .optional()
                    .computed()
                    .default(StaticDefault::number(0.0))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("max", AttributeType::Number)
                    .description("The number of instances after which not to pool anymore.")
                    .validator(Int64Value::create())
                    .optional()
                    .computed()
                    .default(StaticDefault::number(0.0))
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
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];

        // Identifiers are strings in Terraform but integers in CTFd
        if let Some(scenario_id) = string_attr(&request.config, "scenario_id") {
            if let Err(e) = parse_id(&scenario_id) {
                diagnostics.push(
                    Diagnostic::error("Invalid scenario_id", e.to_string())
                        .with_attribute(AttributePath::new("scenario_id")),
                );
            }
        }

        let prerequisites_path = AttributePath::new("requirements").attribute("prerequisites");
        let prerequisites = string_list(&request.config.get_dynamic(&prerequisites_path));
        for (idx, prerequisite) in prerequisites.iter().enumerate() {
            if let Err(e) = parse_id(prerequisite) {
                diagnostics.push(
                    Diagnostic::error("Invalid prerequisite", e.to_string())
                        .with_attribute(prerequisites_path.clone().index(idx as i64)),
                );
            }
        }

        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(
        &self,
        _ctx: Context,
        request: CreateResourceRequest,
    ) -> CreateResourceResponse {
        match self.create_challenge(&request.planned_state).await {
            Ok(new_state) => CreateResourceResponse {
                new_state,
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
        let client = match self.client() {
            Ok(client) => client,
            Err(diag) => {
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics: vec![diag],
                    private: request.private,
                }
            }
        };

        let id = string_attr(&request.current_state, "id").unwrap_or_default();
        match ChallengeDynamicIaCModel::read(client, &id).await {
            Ok(model) => ReadResourceResponse {
                new_state: Some(model.to_dynamic()),
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
        match self
            .update_challenge(&request.planned_state, &request.prior_state)
            .await
        {
            Ok(new_state) => UpdateResourceResponse {
                new_state,
                private: vec![],
                diagnostics: vec![],
            },
            Err(diag) => UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics: vec![diag],
            },
        }
    }

    async fn delete(
        &self,
        _ctx: Context,
        request: DeleteResourceRequest,
    ) -> DeleteResourceResponse {
        let client = match self.client() {
            Ok(client) => client,
            Err(diag) => {
                return DeleteResourceResponse {
                    diagnostics: vec![diag],
                }
            }
        };

        let id = string_attr(&request.prior_state, "id").unwrap_or_default();
        let result = match parse_id(&id) {
            Ok(challenge_id) => client.challenges().delete(challenge_id).await,
            Err(e) => Err(e),
        };

        // Tags, topics and requirements are removed by CTFd along with the challenge
        match result {
            Ok(()) => DeleteResourceResponse {
                diagnostics: vec![],
            },
            Err(e) => DeleteResourceResponse {
                diagnostics: vec![client_error(format!(
                    "Unable to delete challenge, got error: {}",
                    e
                ))],
            },
        }
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithImportState for ChallengeDynamicIaCResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };
        // Terraform reads the resource right after
        import_state_passthrough_id(&ctx, AttributePath::new("id"), &request, &mut response);
        response
    }
}

#[async_trait]
impl ResourceWithConfigure for ChallengeDynamicIaCResource {
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

#[cfg(test)]
#[path = "./challenge_dynamiciac_test.rs"]
mod challenge_dynamiciac_test;
