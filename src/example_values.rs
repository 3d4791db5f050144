//! Example values for request fields, loaded from a JSON document keyed by
//! proto field name:
//!
//! ```json
//! {
//!     "language_type_mappings": {
//!         "objc": { "string_prefix": "@\"", "string_suffix": "\"" }
//!     },
//!     "amount_cents": 1250,
//!     "card_token": "tok_visa",
//!     "card_type": "e:CardType.VISA"
//! }
//! ```
//!
//! Strings starting with `e:` name an enum value and render as the quoted
//! value name.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

const ENUM_PREFIX: &str = "e:";

/// How one language spells literals.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LanguageMapping {
    pub string_prefix: String,
    pub string_suffix: String,
    pub true_value: String,
    pub false_value: String,
    pub array_prefix: String,
    pub array_suffix: String,
}

impl Default for LanguageMapping {
    fn default() -> Self {
        Self {
            string_prefix: "\"".to_string(),
            string_suffix: "\"".to_string(),
            true_value: "true".to_string(),
            false_value: "false".to_string(),
            array_prefix: "[".to_string(),
            array_suffix: "]".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ExampleValues {
    #[serde(default)]
    language_type_mappings: BTreeMap<String, LanguageMapping>,
    #[serde(flatten)]
    values: BTreeMap<String, Value>,
}

impl ExampleValues {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Literal for `field` in `language`, `None` when the document has no
    /// value for it.
    pub fn value_for(&self, language: &str, field: &str) -> Option<String> {
        let raw = self.values.get(field)?;
        Some(self.literal(language, raw))
    }

    fn literal(&self, language: &str, raw: &Value) -> String {
        let default = LanguageMapping::default();
        let mapping = self.language_type_mappings.get(language).unwrap_or(&default);

        match raw {
            Value::String(text) => match text.strip_prefix(ENUM_PREFIX) {
                Some(variant) => {
                    let name = variant.rsplit('.').next().unwrap_or(variant);
                    format!("\"{name}\"")
                }
                None => format!("{}{text}{}", mapping.string_prefix, mapping.string_suffix),
            },
            Value::Bool(true) => mapping.true_value.clone(),
            Value::Bool(false) => mapping.false_value.clone(),
            Value::Array(items) => {
                let items: Vec<String> = items.iter().map(|item| self.literal(language, item)).collect();
                format!("{}{}{}", mapping.array_prefix, items.join(", "), mapping.array_suffix)
            }
            other => other.to_string(),
        }
    }
}
