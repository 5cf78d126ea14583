use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Context keys read by the resolver.
pub mod context_keys {
    pub const CLIENT_TYPE: &str = "clientType";
    pub const CONTENT_ID: &str = "contentId";
    pub const USER_ID: &str = "userId";
    pub const PERSONA: &str = "persona";
    pub const ASKED_CONTACT_DETAILS: &str = "askedContactDetails";
    pub const LAST_INTENT: &str = "lastIntent";
    pub const NODE_NAME: &str = "nodeName";
    pub const OUTPUT_LANGUAGE: &str = "outputLanguage";
    pub const PENDING_LANGUAGE_SELECTION: &str = "pendingLanguageSelection";
    pub const GEOLOCATION: &str = "geolocation";
}

/// 意图
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Intent {
    #[serde(alias = "intent")]
    pub name: String,
    #[serde(default)]
    pub confidence: f64,
}

/// 识别出的实体
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entity {
    pub entity: String,
    pub value: String,
}

/// 对话引擎输出
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct DialogOutput {
    #[serde(alias = "text")]
    pub text_lines: Vec<String>,
    #[serde(alias = "nodes_visited")]
    pub visited_nodes: Vec<String>,
    #[serde(alias = "required")]
    pub required_entity_names: BTreeSet<String>,
    pub action: Option<String>,
}

/// A single resolved dialog-engine turn.
///
/// Immutable input to the resolver; lives for one `resolve` call.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct DialogTurn {
    pub intents: Vec<Intent>,
    pub entities: Vec<Entity>,
    pub output: DialogOutput,
    pub context: Map<String, Value>,
}

/// 地理位置
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Geolocation {
    pub lat: f64,
    pub lng: f64,
}

impl Geolocation {
    fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

impl DialogTurn {
    /// Non-empty string value of a context field.
    pub fn context_str(&self, key: &str) -> Option<&str> {
        self.context
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn persona(&self) -> Option<&str> {
        self.context_str(context_keys::PERSONA)
    }

    pub fn node_name(&self) -> Option<&str> {
        self.context_str(context_keys::NODE_NAME)
    }

    pub fn output_language(&self) -> Option<&str> {
        self.context_str(context_keys::OUTPUT_LANGUAGE)
    }

    pub fn last_visited_node(&self) -> Option<&str> {
        self.output
            .visited_nodes
            .last()
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Pending follow-up action, if the dialog set one.
    pub fn follow_up_action(&self) -> Option<&str> {
        self.output.action.as_deref().filter(|s| !s.is_empty())
    }

    /// Valid `{lat, lng}` pair from the context; anything else reads as absent.
    pub fn geolocation(&self) -> Option<Geolocation> {
        let raw = self.context.get(context_keys::GEOLOCATION)?.as_object()?;
        let location = Geolocation {
            lat: raw.get("lat")?.as_f64()?,
            lng: raw.get("lng")?.as_f64()?,
        };
        location.is_valid().then_some(location)
    }

    /// Values bound to a required entity name.
    ///
    /// Recognised entities win; otherwise the value is read from the context,
    /// which may hold a string, a list of strings or a list of `{value}` objects.
    pub fn required_entity_values(&self, name: &str) -> Vec<String> {
        let recognised: Vec<String> = self
            .entities
            .iter()
            .filter(|e| e.entity == name)
            .map(|e| e.value.clone())
            .collect();
        if !recognised.is_empty() {
            return recognised;
        }

        match self.context.get(name) {
            Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Object(obj) => obj.get("value").and_then(Value::as_str).map(str::to_string),
                    _ => None,
                })
                .filter(|s| !s.is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Recognised entities that are not required by the current dialog node.
    pub fn optional_entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities
            .iter()
            .filter(|e| !self.output.required_entity_names.contains(&e.entity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn turn_with_context(context: Value) -> DialogTurn {
        DialogTurn {
            context: context.as_object().cloned().unwrap_or_default(),
            ..DialogTurn::default()
        }
    }

    #[test]
    fn test_deserialize_dialog_engine_aliases() {
        let turn: DialogTurn = serde_json::from_value(json!({
            "intents": [{"intent": "opening_hours", "confidence": 0.92}],
            "entities": [{"entity": "city", "value": "Berlin"}],
            "output": {
                "text": ["Hello"],
                "nodes_visited": ["root", "hours"],
                "required": ["city"],
                "action": "book"
            },
            "context": {"persona": "friendly"}
        }))
        .unwrap();

        assert_eq!(turn.intents[0].name, "opening_hours");
        assert_eq!(turn.last_visited_node(), Some("hours"));
        assert!(turn.output.required_entity_names.contains("city"));
        assert_eq!(turn.follow_up_action(), Some("book"));
        assert_eq!(turn.persona(), Some("friendly"));
    }

    #[test]
    fn test_geolocation_requires_both_coordinates() {
        assert!(turn_with_context(json!({})).geolocation().is_none());
        assert!(
            turn_with_context(json!({"geolocation": {"lat": 52.5}}))
                .geolocation()
                .is_none()
        );
        assert!(
            turn_with_context(json!({"geolocation": {"lat": "52.5", "lng": 13.4}}))
                .geolocation()
                .is_none()
        );
        assert!(
            turn_with_context(json!({"geolocation": {"lat": 120.0, "lng": 13.4}}))
                .geolocation()
                .is_none()
        );

        let location = turn_with_context(json!({"geolocation": {"lat": 52.5, "lng": 13.4}}))
            .geolocation()
            .unwrap();
        assert_eq!(location, Geolocation { lat: 52.5, lng: 13.4 });
    }

    #[test]
    fn test_required_entity_values_prefers_recognised_entities() {
        let mut turn = turn_with_context(json!({"city": "Hamburg"}));
        turn.entities.push(Entity {
            entity: "city".into(),
            value: "Berlin".into(),
        });
        assert_eq!(turn.required_entity_values("city"), vec!["Berlin"]);
    }

    #[test]
    fn test_required_entity_values_falls_back_to_context() {
        let turn = turn_with_context(json!({
            "city": "Hamburg",
            "product": [{"value": "loan"}, {"value": "card"}],
            "tags": ["a", "", 3],
        }));
        assert_eq!(turn.required_entity_values("city"), vec!["Hamburg"]);
        assert_eq!(turn.required_entity_values("product"), vec!["loan", "card"]);
        assert_eq!(turn.required_entity_values("tags"), vec!["a"]);
        assert!(turn.required_entity_values("missing").is_empty());
    }

    #[test]
    fn test_empty_action_is_absent() {
        let mut turn = DialogTurn::default();
        turn.output.action = Some(String::new());
        assert!(turn.follow_up_action().is_none());
    }
}
