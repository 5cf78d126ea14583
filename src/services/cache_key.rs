//! Cache key derivation.
//!
//! A turn is projected onto the fields that decide which content is shown,
//! serialised canonically and hashed with BLAKE3. Request noise such as
//! timestamps, raw coordinates or transcripts never reaches the hash.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

use crate::error::{AppError, Result};
use crate::models::dialog::{DialogOutput, DialogTurn, Entity, Intent, context_keys};

const CACHE_KEY_SCHEMA_VERSION: u32 = 1;

/// 256-bit digest of a [`CacheProjection`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey(blake3::Hash);

impl CacheKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    pub fn to_hex(&self) -> String {
        self.0.to_hex().to_string()
    }

    /// Short form for log lines.
    pub fn prefix(&self) -> String {
        self.0.to_hex().as_str()[..12].to_string()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CacheKey({})", self.prefix())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeneralContext {
    client_type: Option<Value>,
    content_id: Option<Value>,
    user_id: Option<Value>,
    persona: Option<Value>,
    asked_contact_details: Option<Value>,
    last_intent: Option<Value>,
    node_name: Option<Value>,
    output_language: Option<Value>,
    pending_language_selection: Option<Value>,
}

/// The "meaningful" subset of a turn.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheProjection<'a> {
    schema_version: u32,
    intents: &'a [Intent],
    entities: &'a [Entity],
    output: &'a DialogOutput,
    general_context: GeneralContext,
}

impl<'a> CacheProjection<'a> {
    pub fn of(turn: &'a DialogTurn) -> Self {
        let field = |key: &str| turn.context.get(key).map(canonical);

        Self {
            schema_version: CACHE_KEY_SCHEMA_VERSION,
            intents: &turn.intents,
            entities: &turn.entities,
            output: &turn.output,
            general_context: GeneralContext {
                client_type: field(context_keys::CLIENT_TYPE),
                content_id: field(context_keys::CONTENT_ID),
                user_id: field(context_keys::USER_ID),
                persona: field(context_keys::PERSONA),
                asked_contact_details: field(context_keys::ASKED_CONTACT_DETAILS),
                last_intent: field(context_keys::LAST_INTENT),
                node_name: field(context_keys::NODE_NAME),
                output_language: field(context_keys::OUTPUT_LANGUAGE),
                pending_language_selection: field(context_keys::PENDING_LANGUAGE_SELECTION),
            },
        }
    }
}

/// Rebuilds objects with sorted keys so serialisation never depends on map order.
fn canonical(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonical(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical).collect()),
        other => other.clone(),
    }
}

/// Derives cache keys from dialog turns. Pure, performs no I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheKeyDeriver;

impl CacheKeyDeriver {
    pub fn new() -> Self {
        Self
    }

    pub fn derive(&self, turn: &DialogTurn) -> Result<CacheKey> {
        let projection = CacheProjection::of(turn);
        let mut hasher = blake3::Hasher::new();
        serde_json::to_writer(&mut hasher, &projection).map_err(|e| {
            AppError::Serialization(format!("Failed to encode cache projection: {}", e))
        })?;
        Ok(CacheKey(hasher.finalize()))
    }
}
