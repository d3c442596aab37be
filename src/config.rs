// ⚙️ Comparator Configuration - Entities and rules as data
//
// Each entity names its key field on both sides, the designated nested fields,
// and the normalization rules for each source. Configurations are plain values
// and can be deserialized from JSON.

use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};

use crate::errors::ComparatorError;
use crate::identifier::UuidRepresentation;
use crate::matcher::KeyFields;
use crate::normalizer::{EmbeddedShape, NormalizationRule, SourceKind};

/// Primary identifier field of document-store exports
pub const DOCUMENT_ID_FIELD: &str = "_id";

// ============================================================================
// ENTITY SPEC
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySpec {
    /// Report name, e.g. "Sellers"
    pub name: String,

    /// Key field as named on the relational side (and, by default, both sides)
    pub key_field: String,

    /// Key field on the document-store side when it is spelled differently
    #[serde(default)]
    pub document_key_field: Option<String>,

    /// Collection name used when an export wraps its array in an object
    #[serde(default)]
    pub collection: Option<String>,

    /// Fields compared structurally instead of as strings
    #[serde(default)]
    pub nested_fields: Vec<String>,

    #[serde(default = "default_document_rules")]
    pub document_rules: Vec<NormalizationRule>,

    #[serde(default)]
    pub relational_rules: Vec<NormalizationRule>,
}

fn default_document_rules() -> Vec<NormalizationRule> {
    vec![NormalizationRule::DecodeBinaryIdentifiers]
}

impl EntitySpec {
    pub fn new(name: &str, key_field: &str) -> Self {
        EntitySpec {
            name: name.to_string(),
            key_field: key_field.to_string(),
            document_key_field: None,
            collection: None,
            nested_fields: Vec::new(),
            document_rules: default_document_rules(),
            relational_rules: Vec::new(),
        }
    }

    pub fn with_document_key_field(mut self, field: &str) -> Self {
        self.document_key_field = Some(field.to_string());
        self
    }

    pub fn with_collection(mut self, collection: &str) -> Self {
        self.collection = Some(collection.to_string());
        self
    }

    pub fn with_nested_field(mut self, field: &str) -> Self {
        self.nested_fields.push(field.to_string());
        self
    }

    pub fn with_document_rule(mut self, rule: NormalizationRule) -> Self {
        self.document_rules.push(rule);
        self
    }

    pub fn with_relational_rule(mut self, rule: NormalizationRule) -> Self {
        self.relational_rules.push(rule);
        self
    }

    /// Rename the document store's `_id` to the relational identifier name
    pub fn renaming_document_id(self, to: &str) -> Self {
        self.with_document_rule(NormalizationRule::rename(DOCUMENT_ID_FIELD, to))
    }

    pub fn key_fields(&self) -> KeyFields {
        KeyFields::new(
            self.document_key_field.as_deref().unwrap_or(&self.key_field),
            &self.key_field,
        )
    }

    pub fn rules_for(&self, source: SourceKind) -> &[NormalizationRule] {
        match source {
            SourceKind::DocumentStore => &self.document_rules,
            SourceKind::Relational => &self.relational_rules,
        }
    }

    pub fn validate(&self) -> Result<(), ComparatorError> {
        let invalid = |reason: String| Err(ComparatorError::InvalidConfig { reason });

        if self.name.trim().is_empty() {
            return invalid("entity name is empty".to_string());
        }
        if self.key_field.trim().is_empty() {
            return invalid(format!("entity '{}' has an empty key field", self.name));
        }
        if self.nested_fields.iter().any(|f| *f == self.key_field) {
            return invalid(format!(
                "entity '{}' designates its key field '{}' as nested",
                self.name, self.key_field
            ));
        }
        for rule in self.document_rules.iter().chain(&self.relational_rules) {
            if let NormalizationRule::RenameField { from, to } = rule {
                if from.is_empty() || to.is_empty() {
                    return invalid(format!("entity '{}' has a rename with an empty name", self.name));
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// COMPARATOR CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparatorConfig {
    #[serde(default)]
    pub entities: Vec<EntitySpec>,

    /// Compare scalar values with case (default: false)
    #[serde(default)]
    pub case_sensitive: bool,

    /// Byte layout for subtype-3 and untyped binary identifiers
    #[serde(default)]
    pub legacy_uuid_representation: UuidRepresentation,
}

impl Default for ComparatorConfig {
    fn default() -> Self {
        ComparatorConfig {
            entities: Vec::new(),
            case_sensitive: false,
            legacy_uuid_representation: UuidRepresentation::CSharpLegacy,
        }
    }
}

impl ComparatorConfig {
    pub fn new(entities: Vec<EntitySpec>) -> Self {
        ComparatorConfig {
            entities,
            ..Default::default()
        }
    }

    /// Load configuration from JSON text
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: ComparatorConfig =
            serde_json::from_str(text).context("Failed to parse comparator configuration")?;
        config
            .validate()
            .context("Comparator configuration is invalid")?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ComparatorError> {
        for (i, entity) in self.entities.iter().enumerate() {
            entity.validate()?;
            if self.entities[..i].iter().any(|e| e.name == entity.name) {
                return Err(ComparatorError::InvalidConfig {
                    reason: format!("entity '{}' is declared twice", entity.name),
                });
            }
        }
        Ok(())
    }

    pub fn entity(&self, name: &str) -> Option<&EntitySpec> {
        self.entities.iter().find(|e| e.name == name)
    }

    /// The seller cache comparison: sellers by CNPJ, integration parameters by seller
    pub fn seller_cache() -> Self {
        ComparatorConfig::new(vec![
            EntitySpec::new("Sellers", "cnpj").renaming_document_id("Id"),
            EntitySpec::new("IntegrationParameters", "sellerId")
                .with_collection("IntegrationParameters")
                .with_nested_field("parameters")
                .with_relational_rule(NormalizationRule::parse_embedded(
                    "parameters",
                    EmbeddedShape::Any,
                )),
        ])
    }
}

// ============================================================================
// TESTS
// ============================================================================
