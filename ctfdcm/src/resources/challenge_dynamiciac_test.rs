#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::api::test_helpers::connected_client;
    use crate::resources::challenge_model::RequirementsModel;
    use crate::CtfdcmProviderData;
    use mockito::{Matcher, Server, ServerGuard};
    use crate::resources::values::string_list_attr;
    use std::sync::Arc;
    use tfplug::plan::{plan_resource_change, validate_config};
    use tfplug::types::{ClientCapabilities, Dynamic};

    const CHALLENGE_BODY: &str = r#"{"success":true,"data":{
        "id": 12, "name": "HTTP Authentication", "category": "network",
        "description": "Find the flag.", "max_attempts": 0, "function": "linear",
        "value": 500, "initial": 500, "decay": 20, "minimum": 50, "state": "hidden",
        "type": "dynamic_iac", "destroy_on_flag": false, "shared": false, "mana_cost": 0,
        "scenario_id": 3, "timeout": 600, "until": null, "additional": {}, "min": 0, "max": 0
    }}"#;

    async fn configured_resource(server: &mut ServerGuard) -> ChallengeDynamicIaCResource {
        let client = connected_client(server).await;
        let mut resource = ChallengeDynamicIaCResource::new();
        let response = resource
            .configure(
                Context::new(),
                ConfigureResourceRequest {
                    provider_data: Some(Arc::new(CtfdcmProviderData::new(client))),
                },
            )
            .await;
        assert!(response.diagnostics.is_empty());
        resource
    }

    fn model() -> ChallengeDynamicIaCModel {
        ChallengeDynamicIaCModel {
            name: "HTTP Authentication".to_string(),
            category: "network".to_string(),
            description: "Find the flag.".to_string(),
            max_attempts: Some(0),
            function: Some("linear".to_string()),
            value: 500,
            decay: 20,
            minimum: 50,
            state: "hidden".to_string(),
            scenario_id: "3".to_string(),
            tags: vec!["network".to_string()],
            topics: vec!["Network".to_string()],
            ..Default::default()
        }
    }

    fn planned_state() -> DynamicValue {
        let mut value = model().to_dynamic();
        for computed in ["id", "timeout", "until"] {
            value
                .set_dynamic(&AttributePath::new(computed), Dynamic::Unknown)
                .unwrap();
        }
        value
    }

    fn stored_state() -> DynamicValue {
        let mut stored = model();
        stored.id = Some("12".to_string());
        stored.timeout = Some(600);
        stored.to_dynamic()
    }

    fn config_with(name: &str, value: Dynamic) -> DynamicValue {
        let mut config = model().to_dynamic();
        config.set_dynamic(&AttributePath::new(name), value).unwrap();
        config
    }

    async fn validate(config: DynamicValue) -> ValidateResourceConfigResponse {
        ChallengeDynamicIaCResource::new()
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: "ctfdcm_challenge_dynamiciac".to_string(),
                    config,
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await
    }

    #[tokio::test]
    async fn test_resource_metadata() {
        let resource = ChallengeDynamicIaCResource::new();
        let response = resource
            .metadata(Context::new(), ResourceMetadataRequest)
            .await;
        assert_eq!(response.type_name, "ctfdcm_challenge_dynamiciac");
    }

    #[tokio::test]
    async fn test_resource_schema() {
        let resource = ChallengeDynamicIaCResource::new();
        let response = resource.schema(Context::new(), ResourceSchemaRequest).await;
        assert!(response.diagnostics.is_empty());

        let schema = &response.schema;
        assert_eq!(schema.block.attributes.len(), 25);

        let id = schema.attribute("id").unwrap();
        assert!(id.computed && !id.optional);
        assert_eq!(id.plan_modifiers.len(), 1);

        for required in ["name", "category", "description", "value", "decay", "minimum", "scenario_id"] {
            assert!(schema.attribute(required).unwrap().required, "{}", required);
        }

        let state = schema.attribute("state").unwrap();
        assert!(state.optional && state.computed);
        assert!(state.default.is_some());
        assert_eq!(state.validators.len(), 1);

        for whole in [
            "max_attempts", "value", "decay", "minimum", "next", "mana_cost", "timeout", "min", "max",
        ] {
            assert_eq!(schema.attribute(whole).unwrap().validators.len(), 1, "{}", whole);
        }

        let timeout = schema.attribute("timeout").unwrap();
        assert!(timeout.optional && timeout.computed && timeout.default.is_none());

        let requirements = schema.attribute("requirements").unwrap();
        assert!(requirements.optional && requirements.nested_type.is_some());
    }

    #[tokio::test]
    async fn test_validate_accepts_numeric_identifiers() {
        let mut config = model().to_dynamic();
        config
            .set_dynamic(
                &AttributePath::new("requirements"),
                Dynamic::Map(
                    [
                        ("behavior".to_string(), Dynamic::from("hidden")),
                        (
                            "prerequisites".to_string(),
                            Dynamic::List(vec![Dynamic::from("4"), Dynamic::Unknown]),
                        ),
                    ]
                    .into_iter()
                    .collect(),
                ),
            )
            .unwrap();

        assert!(validate(config).await.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_validate_rejects_non_numeric_scenario() {
        let response = validate(config_with("scenario_id", Dynamic::from("scenario.zip"))).await;

        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Invalid scenario_id");
        assert_eq!(
            response.diagnostics[0].attribute,
            Some(AttributePath::new("scenario_id"))
        );
    }

    #[tokio::test]
    async fn test_validate_skips_unknown_scenario() {
        let response = validate(config_with("scenario_id", Dynamic::Unknown)).await;
        assert!(response.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_validate_points_at_bad_prerequisite() {
        let mut config = model().to_dynamic();
        config
            .set_dynamic(
                &AttributePath::new("requirements"),
                Dynamic::Map(
                    [(
                        "prerequisites".to_string(),
                        Dynamic::List(vec![Dynamic::from("4"), Dynamic::from("web-1")]),
                    )]
                    .into_iter()
                    .collect(),
                ),
            )
            .unwrap();

        let response = validate(config).await;

        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(
            response.diagnostics[0].attribute,
            Some(
                AttributePath::new("requirements")
                    .attribute("prerequisites")
                    .index(1)
            )
        );
    }

    #[tokio::test]
    async fn test_create_posts_challenge_then_tags_and_topics() {
        let mut server = Server::new_async().await;
        let resource = configured_resource(&mut server).await;

        let create = server
            .mock("POST", "/api/v1/challenges")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "name": "HTTP Authentication",
                "initial": 500,
                "type": "dynamic_iac",
                "scenario_id": 3
            })))
            .with_body(CHALLENGE_BODY)
            .create_async()
            .await;
        let list_tags = server
            .mock("GET", "/api/v1/challenges/12/tags")
            .with_body(r#"{"success":true,"data":[]}"#)
            .create_async()
            .await;
        let create_tag = server
            .mock("POST", "/api/v1/tags")
            .match_body(Matcher::Json(
                serde_json::json!({"challenge": 12, "value": "network"}),
            ))
            .with_body(r#"{"success":true,"data":{"id":1,"challenge_id":12,"value":"network"}}"#)
            .create_async()
            .await;
        let list_topics = server
            .mock("GET", "/api/v1/challenges/12/topics")
            .with_body(r#"{"success":true,"data":[]}"#)
            .create_async()
            .await;
        let create_topic = server
            .mock("POST", "/api/v1/topics")
            .match_body(Matcher::PartialJson(
                serde_json::json!({"challenge": 12, "value": "Network"}),
            ))
            .with_body(r#"{"success":true,"data":{"id":2,"challenge_id":12,"value":"Network"}}"#)
            .create_async()
            .await;

        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "ctfdcm_challenge_dynamiciac".to_string(),
                    planned_state: planned_state(),
                    config: model().to_dynamic(),
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let state = &response.new_state;
        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "12");
        assert_eq!(state.get_number(&AttributePath::new("timeout")).unwrap(), 600.0);
        assert_eq!(state.get_dynamic(&AttributePath::new("until")), Dynamic::Null);
        assert!(!state.value.contains_unknown());

        create.assert_async().await;
        list_tags.assert_async().await;
        create_tag.assert_async().await;
        list_topics.assert_async().await;
        create_topic.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_failure_returns_null_state() {
        let mut server = Server::new_async().await;
        let resource = configured_resource(&mut server).await;

        let _create = server
            .mock("POST", "/api/v1/challenges")
            .with_status(400)
            .with_body(r#"{"success":false,"errors":{"scenario_id":["unknown file"]}}"#)
            .create_async()
            .await;

        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "ctfdcm_challenge_dynamiciac".to_string(),
                    planned_state: planned_state(),
                    config: model().to_dynamic(),
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert!(response.new_state.is_null());
        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Client Error");
        assert!(response.diagnostics[0]
            .detail
            .starts_with("Unable to create challenge, got error:"));
    }

    #[tokio::test]
    async fn test_read_combines_challenge_requirements_tags_and_topics() {
        let mut server = Server::new_async().await;
        let resource = configured_resource(&mut server).await;

        let _challenge = server
            .mock("GET", "/api/v1/challenges/12")
            .with_body(CHALLENGE_BODY)
            .create_async()
            .await;
        let _requirements = server
            .mock("GET", "/api/v1/challenges/12/requirements")
            .with_body(r#"{"success":true,"data":{"prerequisites":[4],"anonymize":true}}"#)
            .create_async()
            .await;
        let _tags = server
            .mock("GET", "/api/v1/challenges/12/tags")
            .with_body(r#"{"success":true,"data":[{"id":1,"challenge_id":12,"value":"network"}]}"#)
            .create_async()
            .await;
        let _topics = server
            .mock("GET", "/api/v1/challenges/12/topics")
            .with_body(
                r#"{"success":true,"data":[{"id":2,"challenge_id":12,"topic_id":5,"value":"Network"}]}"#,
            )
            .create_async()
            .await;

        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "ctfdcm_challenge_dynamiciac".to_string(),
                    current_state: stored_state(),
                    private: vec![],
                    provider_meta: None,
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let state = ChallengeDynamicIaCModel::from_dynamic(&response.new_state.unwrap()).unwrap();
        assert_eq!(state.id.as_deref(), Some("12"));
        assert_eq!(state.value, 500);
        assert_eq!(state.tags, vec!["network"]);
        assert_eq!(state.topics, vec!["Network"]);
        assert_eq!(
            state.requirements,
            Some(RequirementsModel {
                behavior: "anonymized".to_string(),
                prerequisites: vec!["4".to_string()],
            })
        );
    }

    #[tokio::test]
    async fn test_read_failure_keeps_current_state() {
        let mut server = Server::new_async().await;
        let resource = configured_resource(&mut server).await;

        let _challenge = server
            .mock("GET", "/api/v1/challenges/12")
            .with_status(404)
            .with_body(r#"{"message":"The requested URL was not found on the server."}"#)
            .create_async()
            .await;

        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "ctfdcm_challenge_dynamiciac".to_string(),
                    current_state: stored_state(),
                    private: vec![],
                    provider_meta: None,
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0]
            .detail
            .starts_with("Unable to read challenge 12, got error:"));
        assert_eq!(response.new_state.unwrap(), stored_state());
    }

    #[tokio::test]
    async fn test_update_patches_without_type_and_reconciles() {
        let mut server = Server::new_async().await;
        let resource = configured_resource(&mut server).await;

        let patch = server
            .mock("PATCH", "/api/v1/challenges/12")
            .match_body(Matcher::PartialJson(
                serde_json::json!({"shared": true, "mana_cost": 1, "min": 2, "max": 4}),
            ))
            .with_body(CHALLENGE_BODY)
            .create_async()
            .await;
        let _list_tags = server
            .mock("GET", "/api/v1/challenges/12/tags")
            .with_body(r#"{"success":true,"data":[{"id":1,"challenge_id":12,"value":"network"}]}"#)
            .create_async()
            .await;
        let delete_tag = server
            .mock("DELETE", "/api/v1/tags/1")
            .with_body(r#"{"success":true}"#)
            .create_async()
            .await;
        let _create_tag = server
            .mock("POST", "/api/v1/tags")
            .with_body(r#"{"success":true,"data":{"id":3,"challenge_id":12,"value":"network"}}"#)
            .create_async()
            .await;
        let _list_topics = server
            .mock("GET", "/api/v1/challenges/12/topics")
            .with_body(r#"{"success":true,"data":[]}"#)
            .create_async()
            .await;
        let _create_topic = server
            .mock("POST", "/api/v1/topics")
            .with_body(r#"{"success":true,"data":{"id":4,"challenge_id":12,"value":"Network"}}"#)
            .create_async()
            .await;

        let mut planned = model();
        planned.id = Some("12".to_string());
        planned.shared = true;
        planned.mana_cost = 1;
        planned.min = 2;
        planned.max = 4;

        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: "ctfdcm_challenge_dynamiciac".to_string(),
                    prior_state: stored_state(),
                    planned_state: planned.to_dynamic(),
                    config: planned.to_dynamic(),
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let state = &response.new_state;
        assert_eq!(state.get_bool(&AttributePath::new("shared")).unwrap(), true);
        assert_eq!(state.get_number(&AttributePath::new("max")).unwrap(), 4.0);
        assert_eq!(state.get_number(&AttributePath::new("timeout")).unwrap(), 600.0);

        patch.assert_async().await;
        delete_tag.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_failure_returns_prior_state() {
        let mut server = Server::new_async().await;
        let resource = configured_resource(&mut server).await;

        let _patch = server
            .mock("PATCH", "/api/v1/challenges/12")
            .with_status(500)
            .create_async()
            .await;

        let mut planned = model();
        planned.id = Some("12".to_string());
        planned.state = "visible".to_string();

        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: "ctfdcm_challenge_dynamiciac".to_string(),
                    prior_state: stored_state(),
                    planned_state: planned.to_dynamic(),
                    config: planned.to_dynamic(),
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0]
            .detail
            .starts_with("Unable to update challenge, got error:"));
        assert_eq!(response.new_state, stored_state());
    }

    #[tokio::test]
    async fn test_update_reports_failed_tag_sync() {
        let mut server = Server::new_async().await;
        let resource = configured_resource(&mut server).await;

        let _patch = server
            .mock("PATCH", "/api/v1/challenges/12")
            .with_body(CHALLENGE_BODY)
            .create_async()
            .await;
        let _list_tags = server
            .mock("GET", "/api/v1/challenges/12/tags")
            .with_status(403)
            .create_async()
            .await;

        let mut planned = model();
        planned.id = Some("12".to_string());

        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: "ctfdcm_challenge_dynamiciac".to_string(),
                    prior_state: stored_state(),
                    planned_state: planned.to_dynamic(),
                    config: planned.to_dynamic(),
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0]
            .detail
            .starts_with("Unable to get all tags of challenge 12"));
    }

    #[tokio::test]
    async fn test_tags_only_update_leaves_other_attributes_unchanged() {
        let mut server = Server::new_async().await;
        let resource = configured_resource(&mut server).await;
        let schema = resource
            .schema(Context::new(), ResourceSchemaRequest)
            .await
            .schema;

        let prior = stored_state();
        let mut desired = model();
        desired.tags = vec!["network".to_string(), "web".to_string()];
        let config = desired.to_dynamic();
        let mut proposed = prior.clone();
        proposed
            .set_dynamic(
                &AttributePath::new("tags"),
                config.get_dynamic(&AttributePath::new("tags")),
            )
            .unwrap();

        let change = plan_resource_change(&schema, &prior, &proposed, &config);
        assert!(change.diagnostics.is_empty(), "{:?}", change.diagnostics);
        assert!(change.requires_replace.is_empty());
        let planned = change.planned_state;
        assert_eq!(planned.get_string(&AttributePath::new("id")).unwrap(), "12");
        for computed in ["timeout", "until"] {
            assert_eq!(
                planned.get_dynamic(&AttributePath::new(computed)),
                Dynamic::Unknown,
                "{}",
                computed
            );
        }

        let unchanged = |state: &DynamicValue, skipped: &[&str]| {
            let (Dynamic::Map(prior_fields), Dynamic::Map(fields)) = (&prior.value, &state.value)
            else {
                panic!("object values expected");
            };
            for (name, value) in prior_fields {
                if !skipped.contains(&name.as_str()) {
                    assert_eq!(fields.get(name), Some(value), "{}", name);
                }
            }
        };
        unchanged(&planned, &["tags", "timeout", "until"]);

        // Unknown timeout and until stay out of the body, everything else is the prior value
        let patch = server
            .mock("PATCH", "/api/v1/challenges/12")
            .match_body(Matcher::Json(serde_json::json!({
                "name": "HTTP Authentication",
                "category": "network",
                "description": "Find the flag.",
                "max_attempts": 0,
                "function": "linear",
                "initial": 500,
                "decay": 20,
                "minimum": 50,
                "state": "hidden",
                "destroy_on_flag": false,
                "shared": false,
                "mana_cost": 0,
                "scenario_id": 3,
                "additional": {},
                "min": 0,
                "max": 0
            })))
            .with_body(CHALLENGE_BODY)
            .create_async()
            .await;
        let old_tags = server
            .mock("GET", "/api/v1/challenges/12/tags")
            .with_body(r#"{"success":true,"data":[{"id":1,"challenge_id":12,"value":"network"}]}"#)
            .create_async()
            .await;
        let delete_tag = server
            .mock("DELETE", "/api/v1/tags/1")
            .with_body(r#"{"success":true}"#)
            .create_async()
            .await;
        let create_tags = server
            .mock("POST", "/api/v1/tags")
            .with_body(r#"{"success":true,"data":{"id":3,"challenge_id":12,"value":"network"}}"#)
            .expect(2)
            .create_async()
            .await;
        let _topics = server
            .mock("GET", "/api/v1/challenges/12/topics")
            .with_body(
                r#"{"success":true,"data":[{"id":2,"challenge_id":12,"topic_id":5,"value":"Network"}]}"#,
            )
            .create_async()
            .await;
        let delete_topic = server
            .mock("DELETE", "/api/v1/topics")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("type".into(), "challenge".into()),
                Matcher::UrlEncoded("target_id".into(), "2".into()),
            ]))
            .with_body(r#"{"success":true}"#)
            .create_async()
            .await;
        let create_topic = server
            .mock("POST", "/api/v1/topics")
            .with_body(r#"{"success":true,"data":{"id":4,"challenge_id":12,"value":"Network"}}"#)
            .create_async()
            .await;

        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: "ctfdcm_challenge_dynamiciac".to_string(),
                    prior_state: prior.clone(),
                    planned_state: planned,
                    config,
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(
            string_list_attr(&response.new_state, "tags"),
            vec!["network", "web"]
        );
        unchanged(&response.new_state, &["tags"]);

        patch.assert_async().await;
        delete_tag.assert_async().await;
        create_tags.assert_async().await;
        delete_topic.assert_async().await;
        create_topic.assert_async().await;

        old_tags.remove_async().await;
        let _challenge = server
            .mock("GET", "/api/v1/challenges/12")
            .with_body(CHALLENGE_BODY)
            .create_async()
            .await;
        let _requirements = server
            .mock("GET", "/api/v1/challenges/12/requirements")
            .with_body(r#"{"success":true,"data":null}"#)
            .create_async()
            .await;
        let _new_tags = server
            .mock("GET", "/api/v1/challenges/12/tags")
            .with_body(
                r#"{"success":true,"data":[{"id":3,"challenge_id":12,"value":"network"},{"id":5,"challenge_id":12,"value":"web"}]}"#,
            )
            .create_async()
            .await;

        let refreshed = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "ctfdcm_challenge_dynamiciac".to_string(),
                    current_state: response.new_state.clone(),
                    private: vec![],
                    provider_meta: None,
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;

        assert!(refreshed.diagnostics.is_empty(), "{:?}", refreshed.diagnostics);
        let refreshed = refreshed.new_state.unwrap();
        assert_eq!(refreshed, response.new_state);
        unchanged(&refreshed, &["tags"]);
    }

    #[tokio::test]
    async fn test_fractional_numbers_fail_validation_and_create() {
        let mut server = Server::new_async().await;
        let resource = configured_resource(&mut server).await;
        let schema = resource
            .schema(Context::new(), ResourceSchemaRequest)
            .await
            .schema;

        let diagnostics = validate_config(&schema, &config_with("value", Dynamic::Number(1.5)));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some(AttributePath::new("value")));

        let diagnostics =
            validate_config(&schema, &config_with("mana_cost", Dynamic::Number(-0.9)));
        assert_eq!(diagnostics.len(), 1);
        assert!(validate_config(&schema, &model().to_dynamic()).is_empty());

        let create = server
            .mock("POST", "/api/v1/challenges")
            .expect(0)
            .create_async()
            .await;

        let mut planned = planned_state();
        planned
            .set_dynamic(&AttributePath::new("value"), Dynamic::Number(1.5))
            .unwrap();
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "ctfdcm_challenge_dynamiciac".to_string(),
                    planned_state: planned,
                    config: config_with("value", Dynamic::Number(1.5)),
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert!(response.new_state.is_null());
        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Invalid value");
        create.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_challenge() {
        let mut server = Server::new_async().await;
        let resource = configured_resource(&mut server).await;

        let delete = server
            .mock("DELETE", "/api/v1/challenges/12")
            .with_body(r#"{"success":true}"#)
            .create_async()
            .await;

        let response = resource
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: "ctfdcm_challenge_dynamiciac".to_string(),
                    prior_state: stored_state(),
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_failure_is_reported() {
        let mut server = Server::new_async().await;
        let resource = configured_resource(&mut server).await;

        let _delete = server
            .mock("DELETE", "/api/v1/challenges/12")
            .with_status(500)
            .create_async()
            .await;

        let response = resource
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: "ctfdcm_challenge_dynamiciac".to_string(),
                    prior_state: stored_state(),
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0]
            .detail
            .starts_with("Unable to delete challenge, got error:"));
    }

    #[tokio::test]
    async fn test_import_passes_id_through() {
        let resource = ChallengeDynamicIaCResource::new();
        let importer = resource.as_import_state().unwrap();

        let response = importer
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: "ctfdcm_challenge_dynamiciac".to_string(),
                    id: "12".to_string(),
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert_eq!(response.imported_resources.len(), 1);
        assert_eq!(
            response.imported_resources[0]
                .state
                .get_string(&AttributePath::new("id"))
                .unwrap(),
            "12"
        );
    }

    #[tokio::test]
    async fn test_unconfigured_resource_reports_error() {
        let resource = ChallengeDynamicIaCResource::new();

        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "ctfdcm_challenge_dynamiciac".to_string(),
                    current_state: stored_state(),
                    private: vec![],
                    provider_meta: None,
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;

        assert_eq!(response.diagnostics[0].summary, "Provider not configured");
    }

    #[tokio::test]
    async fn test_configure_rejects_foreign_provider_data() {
        let mut resource = ChallengeDynamicIaCResource::new();
        let response = resource
            .configure(
                Context::new(),
                ConfigureResourceRequest {
                    provider_data: Some(Arc::new("not provider data")),
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Invalid provider data");
    }
}
