//! Listing of every dynamic IaC challenge

use async_trait::async_trait;
use std::collections::HashMap;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::schema::{Attribute, AttributeBuilder, AttributeType, NestedType, SchemaBuilder};
use tfplug::types::{Diagnostic, Dynamic, DynamicValue};

use crate::resources::challenge_model::ChallengeDynamicIaCModel;
use crate::resources::provider_data_from;

/// Value of the `id` attribute; the listing has no identity of its own
const PLACEHOLDER_ID: &str = "placeholder";

#[derive(Default)]
pub struct ChallengesDynamicIaCDataSource {
    provider_data: Option<crate::CtfdcmProviderData>,
}

impl ChallengesDynamicIaCDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn computed(name: &str, type_: AttributeType, description: &str) -> Attribute {
        AttributeBuilder::new(name, type_)
            .markdown_description(description)
            .computed()
            .build()
    }

    fn challenge_attributes() -> Vec<Attribute> {
        let strings = || AttributeType::List(Box::new(AttributeType::String));

        vec![
            Self::computed("id", AttributeType::String, "Identifier of the challenge."),
            Self::computed("name", AttributeType::String, "Name of the challenge, displayed as it."),
            Self::computed(
                "category",
                AttributeType::String,
                "Category of the challenge that CTFd groups by on the web UI.",
            ),
            Self::computed(
                "description",
                AttributeType::String,
                "Description of the challenge.",
            ),
            Self::computed(
                "attribution",
                AttributeType::String,
                "Attribution to the creator(s) of the challenge.",
            ),
            Self::computed(
                "connection_info",
                AttributeType::String,
                "Connection Information to connect to the challenge instance.",
            ),
            Self::computed(
                "max_attempts",
                AttributeType::Number,
                "Maximum amount of attempts before being unable to flag the challenge.",
            ),
            Self::computed(
                "function",
                AttributeType::String,
                "Decay function, either `linear` or `logarithmic`.",
            ),
            Self::computed(
                "value",
                AttributeType::Number,
                "The value (points) of the challenge once solved, mapped to `initial` in CTFd.",
            ),
            Self::computed(
                "decay",
                AttributeType::Number,
                "Number of solves after which the decay function triggers.",
            ),
            Self::computed(
                "minimum",
                AttributeType::Number,
                "The minimum points the decay function can reach.",
            ),
            Self::computed(
                "state",
                AttributeType::String,
                "State of the challenge, either `hidden` or `visible`.",
            ),
            Self::computed(
                "next",
                AttributeType::Number,
                "Suggestion for the end-user as next challenge to work on.",
            ),
            AttributeBuilder::nested(
                "requirements",
                NestedType::single(vec![
                    Self::computed(
                        "behavior",
                        AttributeType::String,
                        "Behavior if not unlocked, either `hidden` or `anonymized`.",
                    ),
                    Self::computed("prerequisites", strings(), "List of the challenges ID."),
                ]),
            )
            .markdown_description(
                "Challenges that need to be flagged before this one becomes accessible.",
            )
            .computed()
            .build(),
            Self::computed("tags", strings(), "List of challenge tags displayed to the end-user."),
            Self::computed(
                "topics",
                strings(),
                "List of challenge topics displayed to the administrators.",
            ),
            Self::computed(
                "shared",
                AttributeType::Bool,
                "Whether the instance will be shared between all players.",
            ),
            Self::computed(
                "destroy_on_flag",
                AttributeType::Bool,
                "Whether to destroy the instance once flagged.",
            ),
            Self::computed(
                "mana_cost",
                AttributeType::Number,
                "The cost (in mana) of the challenge once an instance is deployed.",
            ),
            Self::computed("scenario_id", AttributeType::String, "The file's ID of the scenario."),
            Self::computed(
                "timeout",
                AttributeType::Number,
                "The timeout (in seconds) after which the instance will be janitored.",
            ),
            Self::computed(
                "until",
                AttributeType::String,
                "The date until the instance could run before being janitored.",
            ),
            Self::computed(
                "additional",
                AttributeType::Map(Box::new(AttributeType::String)),
                "Key=value map (both strings) passed to the scenario.",
            ),
            Self::computed(
                "min",
                AttributeType::Number,
                "The minimum number of instances to set in the pool.",
            ),
            Self::computed(
                "max",
                AttributeType::Number,
                "The number of instances after which not to pool anymore.",
            ),
        ]
    }

    async fn list(&self) -> Result<DynamicValue, Diagnostic> {
        let data = self.provider_data.as_ref().ok_or_else(|| {
            Diagnostic::error(
                "Provider not configured",
                "Provider data was not properly configured",
            )
        })?;

        let summaries = data
            .client
            .challenges()
            .list_dynamic_iac()
            .await
            .map_err(|e| Diagnostic::error("Unable to Read CTFd Challenges", e.to_string()))?;
        tracing::debug!(count = summaries.len(), "Listed dynamic IaC challenges");

        let mut challenges = Vec::with_capacity(summaries.len());
        for summary in &summaries {
            let model =
                ChallengeDynamicIaCModel::read(&data.client, &summary.id.to_string()).await?;
            challenges.push(model.to_dynamic().value);
        }

        let mut entries = HashMap::new();
        entries.insert("id".to_string(), Dynamic::from(PLACEHOLDER_ID));
        entries.insert("challenges".to_string(), Dynamic::List(challenges));
        Ok(DynamicValue::new(Dynamic::Map(entries)))
    }
}

#[async_trait]
impl DataSource for ChallengesDynamicIaCDataSource {
    fn type_name(&self) -> &str {
        "ctfdcm_challenges_dynamiciac"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: DataSourceMetadataRequest,
    ) -> DataSourceMetadataResponse {
        DataSourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Lists the dynamic IaC challenges of the CTFd instance")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::nested(
                    "challenges",
                    NestedType::list(Self::challenge_attributes()),
                )
                .description("Every challenge of type dynamic_iac, with its tags, topics and requirements")
                .computed()
                .build(),
            )
            .build();

        DataSourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, _request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        match self.list().await {
            Ok(state) => ReadDataSourceResponse {
                state,
                diagnostics: vec![],
            },
            Err(diag) => ReadDataSourceResponse {
                state: DynamicValue::null(),
                diagnostics: vec![diag],
            },
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for ChallengesDynamicIaCDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        let mut diagnostics = vec![];
        match provider_data_from(request.provider_data) {
            Ok(data) => self.provider_data = Some(data),
            Err(diag) => diagnostics.push(diag),
        }
        ConfigureDataSourceResponse { diagnostics }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::connected_client;
    use crate::CtfdcmProviderData;
    use mockito::{Matcher, Server};
    use std::sync::Arc;
    use tfplug::types::{AttributePath, ClientCapabilities};

    fn read_request() -> ReadDataSourceRequest {
        ReadDataSourceRequest {
            type_name: "ctfdcm_challenges_dynamiciac".to_string(),
            config: DynamicValue::object(),
            provider_meta: None,
            client_capabilities: ClientCapabilities::default(),
        }
    }

    async fn configured(server: &mut mockito::ServerGuard) -> ChallengesDynamicIaCDataSource {
        let client = connected_client(server).await;
        let mut data_source = ChallengesDynamicIaCDataSource::new();
        let response = data_source
            .configure(
                Context::new(),
                ConfigureDataSourceRequest {
                    provider_data: Some(Arc::new(CtfdcmProviderData::new(client))),
                },
            )
            .await;
        assert!(response.diagnostics.is_empty());
        data_source
    }

    #[tokio::test]
    async fn schema_nests_every_challenge_attribute() {
        let response = ChallengesDynamicIaCDataSource::new()
            .schema(Context::new(), DataSourceSchemaRequest)
            .await;

        let challenges = response.schema.attribute("challenges").unwrap();
        assert!(challenges.computed && !challenges.optional);
        assert_eq!(ChallengesDynamicIaCDataSource::challenge_attributes().len(), 25);
        assert!(ChallengesDynamicIaCDataSource::challenge_attributes()
            .iter()
            .all(|attr| attr.computed && !attr.required && !attr.optional));
    }

    #[tokio::test]
    async fn read_lists_and_expands_each_challenge() {
        let mut server = Server::new_async().await;
        let data_source = configured(&mut server).await;

        let _list = server
            .mock("GET", "/api/v1/challenges")
            .match_query(Matcher::UrlEncoded("type".into(), "dynamic_iac".into()))
            .with_body(
                r#"{"success":true,"data":[{"id":12,"name":"HTTP Authentication","category":"network","type":"dynamic_iac"}]}"#,
            )
            .create_async()
            .await;
        let _challenge = server
            .mock("GET", "/api/v1/challenges/12")
            .with_body(
                r#"{"success":true,"data":{"id":12,"name":"HTTP Authentication","category":"network",
                    "description":"Find the flag.","value":480,"initial":500,"decay":20,"minimum":50,
                    "state":"visible","type":"dynamic_iac","scenario_id":3,"mana_cost":1}}"#,
            )
            .create_async()
            .await;
        let _requirements = server
            .mock("GET", "/api/v1/challenges/12/requirements")
            .with_body(r#"{"success":true,"data":null}"#)
            .create_async()
            .await;
        let _tags = server
            .mock("GET", "/api/v1/challenges/12/tags")
            .with_body(r#"{"success":true,"data":[{"id":1,"challenge_id":12,"value":"network"}]}"#)
            .create_async()
            .await;
        let _topics = server
            .mock("GET", "/api/v1/challenges/12/topics")
            .with_body(r#"{"success":true,"data":[]}"#)
            .create_async()
            .await;

        let response = data_source.read(Context::new(), read_request()).await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(
            response.state.get_string(&AttributePath::new("id")).unwrap(),
            PLACEHOLDER_ID
        );
        let first = AttributePath::new("challenges").index(0);
        assert_eq!(
            response
                .state
                .get_number(&first.clone().attribute("value"))
                .unwrap(),
            500.0
        );
        assert_eq!(
            response
                .state
                .get_string(&first.clone().attribute("scenario_id"))
                .unwrap(),
            "3"
        );
        assert_eq!(
            response.state.get_dynamic(&first.attribute("requirements")),
            Dynamic::Null
        );
    }

    #[tokio::test]
    async fn read_with_no_challenges_is_an_empty_list() {
        let mut server = Server::new_async().await;
        let data_source = configured(&mut server).await;

        let _list = server
            .mock("GET", "/api/v1/challenges")
            .match_query(Matcher::Any)
            .with_body(r#"{"success":true,"data":[]}"#)
            .create_async()
            .await;

        let response = data_source.read(Context::new(), read_request()).await;

        assert!(response.diagnostics.is_empty());
        assert_eq!(
            response
                .state
                .get_list(&AttributePath::new("challenges"))
                .unwrap(),
            vec![]
        );
    }

    #[tokio::test]
    async fn listing_failure_is_reported() {
        let mut server = Server::new_async().await;
        let data_source = configured(&mut server).await;

        let _list = server
            .mock("GET", "/api/v1/challenges")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let response = data_source.read(Context::new(), read_request()).await;

        assert!(response.state.is_null());
        assert_eq!(response.diagnostics[0].summary, "Unable to Read CTFd Challenges");
    }

    #[tokio::test]
    async fn unconfigured_read_is_an_error() {
        let response = ChallengesDynamicIaCDataSource::new()
            .read(Context::new(), read_request())
            .await;

        assert_eq!(response.diagnostics[0].summary, "Provider not configured");
    }
}
