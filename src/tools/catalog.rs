//! Tool catalog: descriptors, explicit registration, schema export.
//!
//! Tool-providing units register descriptors into a [`CatalogBuilder`] at
//! startup. The built [`ToolCatalog`] is immutable and shared read-only
//! between concurrent dispatches.

use crate::tools::coercion::{CoercionTable, ParamType};
use crate::tools::dispatch::ToolHandler;
use crate::types::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

// =============================================================================
// Parameter definition
// =============================================================================

/// A single formal parameter of a tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDef {
    pub name: String,
    pub param_type: ParamType,
    pub description: String,
    /// Present iff the parameter is optional. `null` is a valid default.
    pub default: Option<Value>,
}

impl ParamDef {
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

// =============================================================================
// Tool descriptor
// =============================================================================

/// One registered operation: metadata plus the body that runs it.
pub struct ToolDescriptor {
    /// Lowercased declared name; the dispatch key.
    pub name: String,
    pub description: String,
    /// Formal parameters in declaration order.
    pub parameters: Vec<ParamDef>,
    handler: Box<dyn ToolHandler>,
}

impl ToolDescriptor {
    /// `declared_name` is lowercased (`GetWeatherForecast` → `getweatherforecast`).
    pub fn new(
        declared_name: &str,
        description: impl Into<String>,
        handler: impl ToolHandler + 'static,
    ) -> Self {
        Self {
            name: declared_name.to_lowercase(),
            description: description.into(),
            parameters: Vec::new(),
            handler: Box::new(handler),
        }
    }

    /// Append a required parameter.
    pub fn param(mut self, name: &str, param_type: ParamType, description: &str) -> Self {
        self.parameters.push(ParamDef {
            name: name.to_string(),
            param_type,
            description: description.to_string(),
            default: None,
        });
        self
    }

    /// Append an optional parameter with its default.
    pub fn optional(
        mut self,
        name: &str,
        param_type: ParamType,
        default: Value,
        description: &str,
    ) -> Self {
        self.parameters.push(ParamDef {
            name: name.to_string(),
            param_type,
            description: description.to_string(),
            default: Some(default),
        });
        self
    }

    pub(crate) fn handler(&self) -> &dyn ToolHandler {
        self.handler.as_ref()
    }

    /// Compact signature for logs.
    ///
    /// Format: `tool(param1: type, param2?: type)`
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .parameters
            .iter()
            .map(|p| {
                let optional = if p.is_required() { "" } else { "?" };
                format!("{}{}: {}", p.name, optional, p.param_type)
            })
            .collect();
        format!("{}({})", self.name, params.join(", "))
    }
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Schema export
// =============================================================================

/// Discovery entry: `{name, description, parameters}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSummary {
    pub name: String,
    pub description: String,
    pub parameters: ParametersSchema,
}

/// JSON-Schema-like object describing a tool's parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParametersSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub properties: BTreeMap<String, PropertySchema>,
    pub required: Vec<String>,
}

/// Schema of a single parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

// =============================================================================
// Tool providers and builder
// =============================================================================

/// A unit that contributes zero or more tools at startup.
pub trait ToolProvider {
    /// Label used in startup logs.
    fn name(&self) -> &str;

    /// Register this unit's descriptors.
    fn register(&self, catalog: &mut CatalogBuilder) -> Result<()>;
}

/// Write-once catalog construction.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    entries: HashMap<String, ToolDescriptor>,
    coercions: CoercionTable,
}

impl CatalogBuilder {
    /// Builder using the built-in coercion table.
    pub fn new() -> Self {
        Self::with_coercions(CoercionTable::builtin())
    }

    pub fn with_coercions(coercions: CoercionTable) -> Self {
        Self {
            entries: HashMap::new(),
            coercions,
        }
    }

    /// Register a tool.
    ///
    /// Fails on a name already taken (no silent overwrite), on duplicate
    /// parameter names, on parameter types missing from the coercion table,
    /// and on defaults that do not coerce to their declared type.
    pub fn register(&mut self, descriptor: ToolDescriptor) -> Result<()> {
        if descriptor.name.is_empty() {
            return Err(Error::validation("Tool name cannot be empty"));
        }
        if self.entries.contains_key(&descriptor.name) {
            return Err(Error::conflict(format!(
                "tool '{}' is already registered",
                descriptor.name
            )));
        }

        let mut seen = HashSet::new();
        for param in &descriptor.parameters {
            if !seen.insert(param.name.as_str()) {
                return Err(Error::conflict(format!(
                    "tool '{}' declares parameter '{}' twice",
                    descriptor.name, param.name
                )));
            }
            if !self.coercions.contains(&param.param_type) {
                return Err(Error::validation(format!(
                    "tool '{}' parameter '{}' has unknown type '{}'",
                    descriptor.name, param.name, param.param_type
                )));
            }
            if let Some(default) = param.default.as_ref().filter(|d| !d.is_null()) {
                self.coercions
                    .coerce_value(&param.name, &param.param_type, default)
                    .map_err(|e| {
                        Error::validation(format!(
                            "tool '{}' has an invalid default: {}",
                            descriptor.name, e
                        ))
                    })?;
            }
        }

        tracing::debug!(tool = %descriptor.signature(), "tool registered");
        self.entries.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    /// Let a provider register all of its tools.
    pub fn register_provider(&mut self, provider: &dyn ToolProvider) -> Result<()> {
        let before = self.entries.len();
        provider.register(self)?;
        tracing::info!(
            provider = provider.name(),
            tools = self.entries.len() - before,
            "tool provider registered"
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn build(self) -> ToolCatalog {
        ToolCatalog {
            entries: self.entries,
            coercions: self.coercions,
        }
    }
}

// =============================================================================
// Tool catalog
// =============================================================================

/// Immutable tool catalog, built once at startup.
#[derive(Debug)]
pub struct ToolCatalog {
    entries: HashMap<String, ToolDescriptor>,
    coercions: CoercionTable,
}

impl ToolCatalog {
    /// Look up a tool; names are matched case-insensitively.
    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.entries.get(&name.to_lowercase())
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All tool names, sorted.
    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    /// All descriptors, sorted by name.
    pub fn list_entries(&self) -> Vec<&ToolDescriptor> {
        let mut entries: Vec<&ToolDescriptor> = self.entries.values().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    pub fn coercions(&self) -> &CoercionTable {
        &self.coercions
    }

    /// Schema export for discovery, sorted by tool name.
    pub fn summaries(&self) -> Vec<ToolSummary> {
        self.list_entries()
            .into_iter()
            .map(|entry| self.summarize(entry))
            .collect()
    }

    fn summarize(&self, entry: &ToolDescriptor) -> ToolSummary {
        let mut properties = BTreeMap::new();
        let mut required = Vec::new();
        for param in &entry.parameters {
            let schema_type = self
                .coercions
                .get(&param.param_type)
                .map(|c| c.schema_type)
                .unwrap_or("string");
            properties.insert(
                param.name.clone(),
                PropertySchema {
                    schema_type: schema_type.to_string(),
                    description: param.description.clone(),
                    default: param.default.clone().filter(|d| !d.is_null()),
                },
            );
            if param.is_required() {
                required.push(param.name.clone());
            }
        }
        ToolSummary {
            name: entry.name.clone(),
            description: entry.description.clone(),
            parameters: ParametersSchema {
                schema_type: "object".to_string(),
                properties,
                required,
            },
        }
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::dispatch::{handler_fn, ToolOutput};
    use crate::types::ToolFailure;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn noop() -> impl ToolHandler {
        handler_fn(|_args| async { Ok::<_, ToolFailure>(ToolOutput::Empty) })
    }

    fn current_weather() -> ToolDescriptor {
        ToolDescriptor::new("GetCurrentWeather", "Current conditions for a state", noop())
            .param("state", ParamType::STRING, "Two-letter state code")
            .optional("city", ParamType::STRING, Value::Null, "Optional city name")
    }

    struct TwoTools;

    impl ToolProvider for TwoTools {
        fn name(&self) -> &str {
            "two"
        }

        fn register(&self, catalog: &mut CatalogBuilder) -> Result<()> {
            catalog.register(current_weather())?;
            catalog.register(
                ToolDescriptor::new("Ping", "Liveness", noop())
                    .optional("echo", ParamType::BOOLEAN, json!(false), "Echo back"),
            )
        }
    }

    #[test]
    fn test_register_and_get() {
        let mut builder = CatalogBuilder::new();
        builder.register(current_weather()).unwrap();
        let catalog = builder.build();

        assert_eq!(catalog.len(), 1);
        assert!(catalog.has_tool("getcurrentweather"));
        assert!(catalog.has_tool("GetCurrentWeather"));
        assert!(!catalog.has_tool("nonexistent"));

        let entry = catalog.get("getcurrentweather").unwrap();
        let names: Vec<&str> = entry.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["state", "city"]);
    }

    #[test]
    fn test_provider_contributes_all_tools() {
        let mut builder = CatalogBuilder::new();
        builder.register_provider(&TwoTools).unwrap();
        let catalog = builder.build();
        assert_eq!(catalog.list_names(), vec!["getcurrentweather", "ping"]);
    }

    #[test]
    fn test_duplicate_name_fails_fast() {
        let mut builder = CatalogBuilder::new();
        builder.register(current_weather()).unwrap();
        let dup = ToolDescriptor::new("getCURRENTweather", "other", noop());
        let err = builder.register(dup).unwrap_err();
        assert!(matches!(err, Error::RegistrationConflict(_)));
        assert_eq!(builder.len(), 1);
        // The original registration survives.
        let catalog = builder.build();
        assert_eq!(
            catalog.get("getcurrentweather").unwrap().description,
            "Current conditions for a state"
        );
    }

    #[test]
    fn test_duplicate_param_fails() {
        let mut builder = CatalogBuilder::new();
        let bad = ToolDescriptor::new("Twice", "", noop())
            .param("a", ParamType::STRING, "")
            .param("a", ParamType::INTEGER, "");
        assert!(matches!(
            builder.register(bad).unwrap_err(),
            Error::RegistrationConflict(_)
        ));
    }

    #[test]
    fn test_unknown_type_and_bad_default_fail() {
        let mut builder = CatalogBuilder::new();
        let unknown = ToolDescriptor::new("When", "", noop())
            .param("at", ParamType::custom("date-time"), "");
        assert!(builder.register(unknown).is_err());

        let bad_default = ToolDescriptor::new("Days", "", noop())
            .optional("days", ParamType::INTEGER, json!("five"), "");
        assert!(builder.register(bad_default).is_err());
        assert!(builder.is_empty());
    }

    #[test]
    fn test_register_empty_name_fails() {
        let mut builder = CatalogBuilder::new();
        assert!(builder.register(ToolDescriptor::new("", "", noop())).is_err());
    }

    #[test]
    fn test_schema_export() {
        let mut builder = CatalogBuilder::new();
        builder.register(current_weather()).unwrap();
        let summaries = builder.build().summaries();

        assert_eq!(summaries.len(), 1);
        let value = serde_json::to_value(&summaries[0]).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "getcurrentweather",
                "description": "Current conditions for a state",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "state": {"type": "string", "description": "Two-letter state code"},
                        "city": {"type": "string", "description": "Optional city name"}
                    },
                    "required": ["state"]
                }
            })
        );
    }

    #[test]
    fn test_schema_includes_non_null_default() {
        let mut builder = CatalogBuilder::new();
        builder
            .register(
                ToolDescriptor::new("Forecast", "", noop())
                    .optional("days", ParamType::INTEGER, json!(5), "Days"),
            )
            .unwrap();
        let summary = &builder.build().summaries()[0];
        let days = &summary.parameters.properties["days"];
        assert_eq!(days.schema_type, "integer");
        assert_eq!(days.default, Some(json!(5)));
        assert!(summary.parameters.required.is_empty());
    }

    #[test]
    fn test_signature_format() {
        assert_eq!(
            current_weather().signature(),
            "getcurrentweather(state: string, city?: string)"
        );
    }
}
