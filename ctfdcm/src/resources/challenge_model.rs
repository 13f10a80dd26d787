//! Terraform-side model of a dynamic IaC challenge
//!
//! Shared by the challenge resource and the listing data source.

use std::collections::{BTreeMap, HashMap};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

use super::client_error;
use super::values::{
    bool_attr, number_attr, required_number, required_string, string_attr, string_list,
    string_list_attr, string_list_value, string_map_attr, string_map_value,
};
use crate::api::challenges::{Challenge, ChallengeRequest, Requirements, DYNAMIC_IAC_TYPE};
use crate::api::common::parse_id;
use crate::api::Client;

pub const BEHAVIOR_HIDDEN: &str = "hidden";
pub const BEHAVIOR_ANONYMIZED: &str = "anonymized";

#[derive(Debug, Clone, PartialEq)]
pub struct RequirementsModel {
    pub behavior: String,
    pub prerequisites: Vec<String>,
}

impl RequirementsModel {
    fn from_dynamic(value: &Dynamic) -> Option<Self> {
        let entries = value.as_map()?;
        Some(Self {
            behavior: entries
                .get("behavior")
                .and_then(Dynamic::as_str)
                .unwrap_or(BEHAVIOR_HIDDEN)
                .to_string(),
            prerequisites: entries
                .get("prerequisites")
                .map(string_list)
                .unwrap_or_default(),
        })
    }

    fn to_dynamic(&self) -> Dynamic {
        let mut entries = HashMap::new();
        entries.insert("behavior".to_string(), Dynamic::from(self.behavior.as_str()));
        entries.insert(
            "prerequisites".to_string(),
            string_list_value(&self.prerequisites),
        );
        Dynamic::Map(entries)
    }

    fn from_api(requirements: &Requirements) -> Self {
        Self {
            behavior: if requirements.anonymize {
                BEHAVIOR_ANONYMIZED
            } else {
                BEHAVIOR_HIDDEN
            }
            .to_string(),
            prerequisites: requirements
                .prerequisites
                .iter()
                .map(|id| id.to_string())
                .collect(),
        }
    }

    fn to_api(&self) -> Result<Requirements, Diagnostic> {
        let prerequisites = self
            .prerequisites
            .iter()
            .map(|id| parse_id(id))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                Diagnostic::error("Invalid prerequisite", e.to_string()).with_attribute(
                    AttributePath::new("requirements").attribute("prerequisites"),
                )
            })?;

        Ok(Requirements {
            anonymize: self.behavior == BEHAVIOR_ANONYMIZED,
            prerequisites,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChallengeDynamicIaCModel {
    pub id: Option<String>,
    pub name: String,
    pub category: String,
    pub description: String,
    pub attribution: Option<String>,
    pub connection_info: Option<String>,
    pub max_attempts: Option<i64>,
    pub function: Option<String>,
    pub value: i64,
    pub decay: i64,
    pub minimum: i64,
    pub state: String,
    pub next: Option<i64>,
    pub requirements: Option<RequirementsModel>,
    pub tags: Vec<String>,
    pub topics: Vec<String>,
    pub shared: bool,
    pub destroy_on_flag: bool,
    pub mana_cost: i64,
    pub scenario_id: String,
    pub timeout: Option<i64>,
    pub until: Option<String>,
    pub additional: BTreeMap<String, String>,
    pub min: i64,
    pub max: i64,
}

impl ChallengeDynamicIaCModel {
    /// Reads a planned state or configuration
    pub fn from_dynamic(value: &DynamicValue) -> Result<Self, Diagnostic> {
        Ok(Self {
            id: string_attr(value, "id"),
            name: required_string(value, "name")?,
            category: required_string(value, "category")?,
            description: required_string(value, "description")?,
            attribution: string_attr(value, "attribution"),
            connection_info: string_attr(value, "connection_info"),
            max_attempts: number_attr(value, "max_attempts")?,
            function: string_attr(value, "function"),
            value: required_number(value, "value")?,
            decay: required_number(value, "decay")?,
            minimum: required_number(value, "minimum")?,
            state: string_attr(value, "state").unwrap_or_else(|| "hidden".to_string()),
            next: number_attr(value, "next")?,
            requirements: RequirementsModel::from_dynamic(
                &value.get_dynamic(&AttributePath::new("requirements")),
            ),
            tags: string_list_attr(value, "tags"),
            topics: string_list_attr(value, "topics"),
            shared: bool_attr(value, "shared").unwrap_or(false),
            destroy_on_flag: bool_attr(value, "destroy_on_flag").unwrap_or(false),
            mana_cost: number_attr(value, "mana_cost")?.unwrap_or(0),
            scenario_id: required_string(value, "scenario_id")?,
            timeout: number_attr(value, "timeout")?,
            until: string_attr(value, "until"),
            additional: string_map_attr(value, "additional"),
            min: number_attr(value, "min")?.unwrap_or(0),
            max: number_attr(value, "max")?.unwrap_or(0),
        })
    }

    /// Terraform object carrying every schema attribute
    pub fn to_dynamic(&self) -> DynamicValue {
        let number = |n: i64| Dynamic::Number(n as f64);

        let mut entries = HashMap::new();
        entries.insert("id".to_string(), Dynamic::from(self.id.clone()));
        entries.insert("name".to_string(), Dynamic::from(self.name.clone()));
        entries.insert("category".to_string(), Dynamic::from(self.category.clone()));
        entries.insert(
            "description".to_string(),
            Dynamic::from(self.description.clone()),
        );
        entries.insert(
            "attribution".to_string(),
            Dynamic::from(self.attribution.clone()),
        );
        entries.insert(
            "connection_info".to_string(),
            Dynamic::from(self.connection_info.clone()),
        );
        entries.insert("max_attempts".to_string(), Dynamic::from(self.max_attempts));
        entries.insert("function".to_string(), Dynamic::from(self.function.clone()));
        entries.insert("value".to_string(), number(self.value));
        entries.insert("decay".to_string(), number(self.decay));
        entries.insert("minimum".to_string(), number(self.minimum));
        entries.insert("state".to_string(), Dynamic::from(self.state.clone()));
        entries.insert("next".to_string(), Dynamic::from(self.next));
        entries.insert(
            "requirements".to_string(),
            self.requirements
                .as_ref()
                .map_or(Dynamic::Null, RequirementsModel::to_dynamic),
        );
        entries.insert("tags".to_string(), string_list_value(&self.tags));
        entries.insert("topics".to_string(), string_list_value(&self.topics));
        entries.insert("shared".to_string(), Dynamic::Bool(self.shared));
        entries.insert(
            "destroy_on_flag".to_string(),
            Dynamic::Bool(self.destroy_on_flag),
        );
        entries.insert("mana_cost".to_string(), number(self.mana_cost));
        entries.insert(
            "scenario_id".to_string(),
            Dynamic::from(self.scenario_id.clone()),
        );
        entries.insert("timeout".to_string(), Dynamic::from(self.timeout));
        entries.insert("until".to_string(), Dynamic::from(self.until.clone()));
        entries.insert("additional".to_string(), string_map_value(&self.additional));
        entries.insert("min".to_string(), number(self.min));
        entries.insert("max".to_string(), number(self.max));

        DynamicValue::new(Dynamic::Map(entries))
    }

    /// Request body for POST (`creating`) or PATCH
    pub fn to_request(&self, creating: bool) -> Result<ChallengeRequest, Diagnostic> {
        let scenario_id = parse_id(&self.scenario_id).map_err(|e| {
            Diagnostic::error("Invalid scenario_id", e.to_string())
                .with_attribute(AttributePath::new("scenario_id"))
        })?;
        let requirements = self
            .requirements
            .as_ref()
            .map(RequirementsModel::to_api)
            .transpose()?;

        Ok(ChallengeRequest {
            name: self.name.clone(),
            category: self.category.clone(),
            description: self.description.clone(),
            attribution: self.attribution.clone(),
            connection_info: self.connection_info.clone(),
            max_attempts: self.max_attempts,
            function: self.function.clone(),
            initial: self.value,
            decay: self.decay,
            minimum: self.minimum,
            state: self.state.clone(),
            challenge_type: creating.then(|| DYNAMIC_IAC_TYPE.to_string()),
            next_id: self.next,
            requirements,
            destroy_on_flag: self.destroy_on_flag,
            shared: self.shared,
            mana_cost: self.mana_cost,
            scenario_id,
            timeout: self.timeout,
            until: self.until.clone(),
            additional: self.additional.clone(),
            min: self.min,
            max: self.max,
        })
    }

    /// Copies the attributes CTFd stores on the challenge itself
    pub fn apply_remote(&mut self, challenge: &Challenge) {
        self.id = Some(challenge.id.to_string());
        self.name = challenge.name.clone();
        self.category = challenge.category.clone();
        self.description = challenge.description.clone();
        self.attribution = challenge.attribution.clone();
        self.connection_info = challenge.connection_info.clone();
        self.max_attempts = challenge.max_attempts;
        self.function = challenge.function.clone();
        self.value = challenge.initial.or(challenge.value).unwrap_or_default();
        self.decay = challenge.decay.unwrap_or_default();
        self.minimum = challenge.minimum.unwrap_or_default();
        self.state = challenge.state.clone();
        self.next = challenge.next_id;
        self.destroy_on_flag = challenge.destroy_on_flag;
        self.shared = challenge.shared;
        self.mana_cost = challenge.mana_cost;
        self.scenario_id = challenge.scenario_id.to_string();
        self.timeout = challenge.timeout;
        self.until = challenge.until.clone();
        self.additional = challenge.additional.clone();
        self.min = challenge.min;
        self.max = challenge.max;
    }

    /// Fetches the challenge and its requirements, tags and topics
    ///
    /// Any failure, including a missing challenge, is reported the same way.
    pub async fn read(client: &Client, id: &str) -> Result<Self, Diagnostic> {
        let challenge_id = parse_id(id).map_err(|e| {
            client_error(format!("Unable to read challenge {}, got error: {}", id, e))
        })?;

        let challenge = client.challenges().get(challenge_id).await.map_err(|e| {
            client_error(format!("Unable to read challenge {}, got error: {}", id, e))
        })?;

        let mut model = Self::default();
        model.apply_remote(&challenge);

        let requirements = client
            .challenges()
            .requirements(challenge_id)
            .await
            .map_err(|e| {
                client_error(format!(
                    "Unable to read challenge {} requirements, got error: {}",
                    challenge_id, e
                ))
            })?;
        model.requirements = requirements.as_ref().map(RequirementsModel::from_api);

        let tags = client
            .tags()
            .list_for_challenge(challenge_id)
            .await
            .map_err(|e| {
                client_error(format!(
                    "Unable to read challenge {} tags, got error: {}",
                    challenge_id, e
                ))
            })?;
        model.tags = tags.into_iter().map(|tag| tag.value).collect();

        let topics = client
            .topics()
            .list_for_challenge(challenge_id)
            .await
            .map_err(|e| {
                client_error(format!(
                    "Unable to read challenge {} topics, got error: {}",
                    challenge_id, e
                ))
            })?;
        model.topics = topics.into_iter().map(|topic| topic.value).collect();

        Ok(model)
    }
}
