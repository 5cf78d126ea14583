//! Content repository documents.
//!
//! Document elements are modelled as an explicit tagged union keyed by
//! `elementType`, so every consumer matches exhaustively on element kind.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Element names with meaning to the resolver.
pub mod element_names {
    /// Toggle marking a document as carrying attachments.
    pub const ATTACHMENTS_FLAG: &str = "attachments";
    /// Inline list of attachment references.
    pub const ATTACHMENT_REFS: &str = "attachment";
    /// Filter expression selecting attachments by search.
    pub const ATTACHMENT_QUERY: &str = "attachmentquery";
    /// Taxonomy used for specificity tie-breaks.
    pub const FILTER: &str = "filter";
    /// Quick-reply action buttons.
    pub const QUICK_REPLIES: &str = "quickreplies";
}

/// URL reference to another content document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentReference {
    #[serde(default)]
    pub url: String,
}

/// 图片的单个版本
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rendition {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// A quick-reply action: either still a reference or the fetched document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum QuickReply {
    Resolved(Box<ContentDocument>),
    Pending(ContentReference),
}

/// 文档元素值
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "elementType", rename_all = "camelCase")]
pub enum ElementValue {
    /// Single text, number or toggle value.
    #[serde(
        alias = "toggle",
        alias = "text",
        alias = "number",
        alias = "formattedtext",
        alias = "date"
    )]
    Scalar {
        #[serde(default)]
        value: Value,
    },
    /// Multi-valued element.
    List { values: Vec<Value> },
    Link {
        #[serde(rename = "linkText", default)]
        text: String,
        #[serde(rename = "linkURL")]
        url: String,
    },
    Image { renditions: BTreeMap<String, Rendition> },
    /// Category / taxonomy paths.
    Category { categories: Vec<String> },
    /// References to other documents.
    Reference { values: Vec<ContentReference> },
    QuickReplies { values: Vec<QuickReply> },
    /// Element kinds the resolver has no use for; kept so the document still loads.
    #[serde(other)]
    Other,
}

impl ElementValue {
    pub fn kind(&self) -> &'static str {
        match self {
            ElementValue::Scalar { .. } => "scalar",
            ElementValue::List { .. } => "list",
            ElementValue::Link { .. } => "link",
            ElementValue::Image { .. } => "image",
            ElementValue::Category { .. } => "category",
            ElementValue::Reference { .. } => "reference",
            ElementValue::QuickReplies { .. } => "quickReplies",
            ElementValue::Other => "other",
        }
    }
}

/// A document as delivered by the content repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentDocument {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub elements: BTreeMap<String, ElementValue>,
}

/// A search hit with its relevance score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredDocument {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub elements: BTreeMap<String, ElementValue>,
}

impl ScoredDocument {
    /// True only when the element is a scalar holding boolean `true`.
    pub fn flag(&self, name: &str) -> bool {
        matches!(
            self.elements.get(name),
            Some(ElementValue::Scalar { value: Value::Bool(true) })
        )
    }

    /// Number of taxonomy paths on the filter element; 0 when absent.
    pub fn specificity(&self) -> usize {
        match self.elements.get(element_names::FILTER) {
            Some(ElementValue::Category { categories }) => categories.len(),
            _ => 0,
        }
    }
}

impl From<ContentDocument> for ScoredDocument {
    fn from(document: ContentDocument) -> Self {
        Self {
            id: document.id,
            name: document.name,
            score: 0.0,
            elements: document.elements,
        }
    }
}

/// 搜索结果集，按相关度降序
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultSet {
    pub total_found: usize,
    pub documents: Vec<ScoredDocument>,
}

impl SearchResultSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_documents(documents: Vec<ScoredDocument>) -> Self {
        Self {
            total_found: documents.len(),
            documents,
        }
    }

    pub fn top(&self) -> Option<&ScoredDocument> {
        if self.total_found == 0 {
            return None;
        }
        self.documents.first()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.documents.iter().map(|d| d.id.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_element_value_tagging() {
        let elements: BTreeMap<String, ElementValue> = serde_json::from_value(json!({
            "attachments": {"elementType": "scalar", "value": true},
            "filter": {"elementType": "category", "categories": ["a/b", "a/c"]},
            "more": {"elementType": "link", "linkText": "Docs", "linkURL": "https://x"},
            "hero": {"elementType": "image", "renditions": {"default": {"url": "/img.png"}}},
            "attachment": {"elementType": "reference", "values": [{"url": "/a/1"}]},
        }))
        .unwrap();

        assert_eq!(elements["attachments"].kind(), "scalar");
        assert_eq!(elements["filter"].kind(), "category");
        assert!(matches!(&elements["more"], ElementValue::Link { text, .. } if text == "Docs"));
        assert_eq!(elements["hero"].kind(), "image");
        assert!(matches!(&elements["attachment"], ElementValue::Reference { values } if values.len() == 1));
    }

    #[test]
    fn test_delivery_element_types() {
        let elements: BTreeMap<String, ElementValue> = serde_json::from_value(json!({
            "attachments": {"elementType": "toggle", "value": true},
            "title": {"elementType": "text", "value": "Opening hours"},
            "body": {"elementType": "formattedtext", "value": "<p>9 to 5</p>"},
            "rank": {"elementType": "number", "value": 3},
            "subtitle": {"elementType": "text"},
            "map": {"elementType": "location", "latitude": 53.3, "longitude": -6.2},
        }))
        .unwrap();

        assert!(matches!(&elements["attachments"], ElementValue::Scalar { value } if *value == json!(true)));
        assert_eq!(elements["title"].kind(), "scalar");
        assert_eq!(elements["body"].kind(), "scalar");
        assert!(matches!(&elements["rank"], ElementValue::Scalar { value } if *value == json!(3)));
        assert!(matches!(&elements["subtitle"], ElementValue::Scalar { value } if value.is_null()));
        assert_eq!(elements["map"], ElementValue::Other);

        let doc = ScoredDocument {
            id: "1".into(),
            name: "doc".into(),
            score: 1.0,
            elements,
        };
        assert!(doc.flag(element_names::ATTACHMENTS_FLAG));
    }

    #[test]
    fn test_quick_reply_untagged_resolution() {
        let pending: QuickReply = serde_json::from_value(json!({"url": "/qr/1"})).unwrap();
        assert!(matches!(pending, QuickReply::Pending(ref r) if r.url == "/qr/1"));

        let resolved: QuickReply =
            serde_json::from_value(json!({"id": "qr1", "name": "Yes", "elements": {}})).unwrap();
        assert!(matches!(resolved, QuickReply::Resolved(ref d) if d.id == "qr1"));
    }

    #[test]
    fn test_flag_requires_boolean_true() {
        let mut doc = ScoredDocument {
            id: "1".into(),
            name: "doc".into(),
            score: 1.0,
            elements: BTreeMap::new(),
        };
        assert!(!doc.flag(element_names::ATTACHMENTS_FLAG));

        doc.elements.insert(
            element_names::ATTACHMENTS_FLAG.into(),
            ElementValue::Scalar { value: json!("true") },
        );
        assert!(!doc.flag(element_names::ATTACHMENTS_FLAG));

        doc.elements.insert(
            element_names::ATTACHMENTS_FLAG.into(),
            ElementValue::Scalar { value: json!(true) },
        );
        assert!(doc.flag(element_names::ATTACHMENTS_FLAG));
    }

    #[test]
    fn test_specificity_defaults_to_zero() {
        let mut doc = ScoredDocument {
            id: "1".into(),
            name: "doc".into(),
            score: 1.0,
            elements: BTreeMap::new(),
        };
        assert_eq!(doc.specificity(), 0);

        doc.elements.insert(
            element_names::FILTER.into(),
            ElementValue::Category {
                categories: vec!["x".into(), "y".into()],
            },
        );
        assert_eq!(doc.specificity(), 2);
    }

    #[test]
    fn test_top_of_empty_set() {
        assert!(SearchResultSet::empty().top().is_none());
    }
}
