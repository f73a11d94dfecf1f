//! Agent runtime request and response types.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Metadata attached to a new thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadMetadata {
    pub user_id: String,
    pub source: String,
}

impl ThreadMetadata {
    /// Metadata for a thread that serves a WhatsApp chat.
    pub fn whatsapp(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            source: "whatsapp".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CreateThreadRequest<'a> {
    pub metadata: &'a ThreadMetadata,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ThreadResponse {
    pub thread_id: String,
}

/// A chat message in run input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputMessage {
    pub role: String,
    pub content: String,
}

impl InputMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunInput {
    pub messages: Vec<InputMessage>,
}

/// Per-run configuration; `configurable` is passed to the graph verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub configurable: Map<String, Value>,
}

/// Body of `POST /threads/{id}/runs/wait`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    pub assistant_id: String,
    pub input: RunInput,
    pub config: RunConfig,
}

impl RunRequest {
    /// A run with a single user message and no configurable keys.
    pub fn user_message(assistant_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            assistant_id: assistant_id.into(),
            input: RunInput {
                messages: vec![InputMessage::user(content)],
            },
            config: RunConfig::default(),
        }
    }

    /// Set one configurable key.
    pub fn with_configurable(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.configurable.insert(key.into(), value.into());
        self
    }
}

/// A message in the final thread state returned by a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMessage {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub content: Value,
}

impl RunMessage {
    /// Message text. Content blocks (`[{ "type": "text", "text": .. }]`) are concatenated.
    pub fn text(&self) -> Option<String> {
        match &self.content {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Array(blocks) => {
                let joined: String = blocks
                    .iter()
                    .filter_map(|b| b.get("text").and_then(Value::as_str))
                    .collect();
                (!joined.is_empty()).then_some(joined)
            }
            _ => None,
        }
    }
}

/// Thread state returned by a blocking run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunResponse {
    #[serde(default)]
    pub messages: Vec<RunMessage>,
}

impl RunResponse {
    /// Text of the last message, if any.
    pub fn last_message_text(&self) -> Option<String> {
        self.messages.last().and_then(RunMessage::text)
    }
}

/// Assistant configuration as stored by the runtime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recursion_limit: Option<u32>,
    #[serde(default)]
    pub configurable: Map<String, Value>,
}

impl AssistantConfig {
    /// Tool-enabled configuration every BargainB assistant starts from.
    pub fn default_for_bargainb() -> Self {
        let configurable = json!({
            "ENABLE_TOOLS": true,
            "ENABLE_PRODUCT_SEARCH": true,
            "ENABLE_PRICE_COMPARISON": true,
            "ENABLE_SHOPPING_LIST": true,
            "ENABLE_STORE_LOCATOR": true,
            "ENABLE_RECIPE_SUGGESTIONS": true,
            "ENABLE_FALLBACK_RESPONSES": true,
            "MAX_TOOL_CALLS_PER_REQUEST": 5,
            "REQUEST_TIMEOUT_SECONDS": 30,
            "TEMPERATURE": 0.7,
            "RESPONSE_STYLE": "helpful",
        });

        Self {
            tags: vec![
                "bargainb".to_string(),
                "grocery".to_string(),
                "whatsapp".to_string(),
            ],
            recursion_limit: Some(25),
            configurable: into_map(configurable),
        }
    }

    /// Default configuration plus per-user `user_preferences` and `ai_behavior`.
    ///
    /// Keys in the overrides replace the defaults one by one.
    pub fn for_user(user_preferences: Option<&Value>, ai_behavior: Option<&Value>) -> Self {
        let mut config = Self::default_for_bargainb();

        let mut preferences = into_map(json!({
            "budget_limit": 100,
            "dietary_restrictions": [],
            "preferred_stores": ["Albert Heijn", "Jumbo", "Dirk"],
            "language": "dutch",
            "region": "netherlands",
        }));
        merge_object(&mut preferences, user_preferences);

        let mut behavior = into_map(json!({
            "response_style": "friendly",
            "price_sensitivity": "balanced",
            "health_focus": true,
        }));
        merge_object(&mut behavior, ai_behavior);

        config
            .configurable
            .insert("user_preferences".to_string(), Value::Object(preferences));
        config
            .configurable
            .insert("ai_behavior".to_string(), Value::Object(behavior));
        config
    }

    /// Apply a partial configuration on top of this one.
    ///
    /// `tags` and `recursion_limit` are replaced when present; `configurable`
    /// keys are merged.
    pub fn merged_with(mut self, patch: &Value) -> Self {
        if let Some(tags) = patch.get("tags").and_then(Value::as_array) {
            self.tags = tags
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect();
        }
        if let Some(limit) = patch.get("recursion_limit").and_then(Value::as_u64) {
            self.recursion_limit = u32::try_from(limit).ok();
        }
        merge_object(&mut self.configurable, patch.get("configurable"));
        self
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn merge_object(target: &mut Map<String, Value>, overrides: Option<&Value>) {
    if let Some(Value::Object(overrides)) = overrides {
        for (key, value) in overrides {
            target.insert(key.clone(), value.clone());
        }
    }
}

/// An assistant as returned by the runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assistant {
    pub assistant_id: String,
    #[serde(default)]
    pub graph_id: String,
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub metadata: Value,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub version: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Body of `POST /assistants`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAssistant {
    pub graph_id: String,
    pub config: AssistantConfig,
    pub metadata: Value,
    pub name: String,
}

/// Body of `PATCH /assistants/{id}`; unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistantUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<AssistantConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Body of `POST /assistants/search`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantSearch {
    pub metadata: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph_id: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

impl Default for AssistantSearch {
    fn default() -> Self {
        Self {
            metadata: Value::Object(Map::new()),
            graph_id: None,
            limit: 10,
            offset: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_enables_tools() {
        let config = AssistantConfig::default_for_bargainb();
        assert_eq!(config.tags, vec!["bargainb", "grocery", "whatsapp"]);
        assert_eq!(config.recursion_limit, Some(25));
        assert_eq!(config.configurable["ENABLE_TOOLS"], true);
        assert_eq!(config.configurable["MAX_TOOL_CALLS_PER_REQUEST"], 5);
        assert_eq!(config.configurable["TEMPERATURE"], 0.7);
        assert_eq!(config.configurable["RESPONSE_STYLE"], "helpful");
    }

    #[test]
    fn test_for_user_merges_preferences() {
        let prefs = json!({ "budget_limit": 60, "language": "english" });
        let config = AssistantConfig::for_user(Some(&prefs), None);

        let user = &config.configurable["user_preferences"];
        assert_eq!(user["budget_limit"], 60);
        assert_eq!(user["language"], "english");
        assert_eq!(user["region"], "netherlands");
        assert_eq!(user["preferred_stores"][0], "Albert Heijn");
        assert_eq!(config.configurable["ai_behavior"]["response_style"], "friendly");
        assert_eq!(config.configurable["ENABLE_PRODUCT_SEARCH"], true);
    }

    #[test]
    fn test_merged_with_patch() {
        let patch = json!({ "recursion_limit": 40, "configurable": { "TEMPERATURE": 0.2 } });
        let config = AssistantConfig::default_for_bargainb().merged_with(&patch);
        assert_eq!(config.recursion_limit, Some(40));
        assert_eq!(config.configurable["TEMPERATURE"], 0.2);
        assert_eq!(config.configurable["ENABLE_TOOLS"], true);
        assert_eq!(config.tags.len(), 3);
    }

    #[test]
    fn test_run_request_shape() {
        let request = RunRequest::user_message("asst-1", "hoi").with_configurable("user_id", "u1");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            json!({
                "assistant_id": "asst-1",
                "input": { "messages": [{ "role": "user", "content": "hoi" }] },
                "config": { "configurable": { "user_id": "u1" } }
            })
        );
    }

    #[test]
    fn test_last_message_text() {
        let response: RunResponse = serde_json::from_value(json!({
            "messages": [
                { "type": "human", "content": "hoi" },
                { "type": "ai", "content": [{ "type": "text", "text": "Melk is " }, { "type": "text", "text": "goedkoop bij Dirk." }] }
            ]
        }))
        .unwrap();
        assert_eq!(
            response.last_message_text().as_deref(),
            Some("Melk is goedkoop bij Dirk.")
        );

        assert_eq!(RunResponse::default().last_message_text(), None);
    }
}
