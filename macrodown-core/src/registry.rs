//! Macro registry construction and configuration.
//!
//! A [`Registry`] maps macro names to handlers for one render pass. Entries
//! come either from closures registered programmatically or from qualified
//! `"module:function"` references resolved at configuration time against a
//! [`FunctionTable`] of statically registered functions. Resolution failures
//! are configuration errors, raised before any document is processed.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// A macro handler: one normalized string argument in, markup text out.
///
/// Handlers may have arbitrary side effects; they are invoked strictly in
/// document order. Shared handlers must be safe under concurrent use if the
/// same registry serves concurrent renders of different documents.
pub type Handler = Arc<dyn Fn(&str) -> String + Send + Sync>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read registry config: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Malformed function reference '{0}': expected \"module:function\"")]
    MalformedReference(String),

    #[error("Unresolvable function reference '{reference}' for macro '{name}'")]
    UnresolvedReference { name: String, reference: String },
}

/// Table of statically known functions addressable as `"module:function"`.
///
/// Populated once at process startup; qualified references in registry
/// configuration resolve against it.
#[derive(Clone, Default)]
pub struct FunctionTable {
    functions: HashMap<String, Handler>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `function` under `module:name`.
    pub fn insert(&mut self, module: &str, name: &str, function: fn(&str) -> String) {
        self.functions
            .insert(format!("{module}:{name}"), Arc::new(function));
    }

    /// Resolve a qualified reference into a handler.
    pub fn resolve(&self, reference: &str) -> Option<Handler> {
        self.functions.get(reference).cloned()
    }
}

/// Registry configuration: macro name mapped to a qualified function
/// reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistryConfig(pub BTreeMap<String, String>);

impl RegistryConfig {
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }
}

/// Immutable name-to-handler mapping used for one render pass.
#[derive(Clone, Default)]
pub struct Registry {
    handlers: HashMap<String, Handler>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder {
            handlers: HashMap::new(),
        }
    }

    /// Build a registry from configuration, resolving every qualified
    /// reference against `table`. Fails on the first reference that is
    /// malformed or unknown.
    pub fn from_config(config: &RegistryConfig, table: &FunctionTable) -> Result<Self, ConfigError> {
        let mut handlers = HashMap::new();
        for (name, reference) in &config.0 {
            if reference.split_once(':').is_none() {
                return Err(ConfigError::MalformedReference(reference.clone()));
            }
            let handler =
                table
                    .resolve(reference)
                    .ok_or_else(|| ConfigError::UnresolvedReference {
                        name: name.clone(),
                        reference: reference.clone(),
                    })?;
            handlers.insert(name.clone(), handler);
        }
        Ok(Self { handlers })
    }

    pub fn get(&self, name: &str) -> Option<&Handler> {
        self.handlers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered macro names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Builder for [`Registry`]. Later registrations under the same name win.
pub struct RegistryBuilder {
    handlers: HashMap<String, Handler>,
}

impl RegistryBuilder {
    /// Register a handler closure under `name`.
    pub fn register<F>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.handlers.insert(name.to_string(), Arc::new(handler));
        self
    }

    /// Register a qualified `"module:function"` reference under `name`,
    /// resolved immediately against `table`.
    pub fn register_ref(
        mut self,
        name: &str,
        reference: &str,
        table: &FunctionTable,
    ) -> Result<Self, ConfigError> {
        if reference.split_once(':').is_none() {
            return Err(ConfigError::MalformedReference(reference.to_string()));
        }
        let handler =
            table
                .resolve(reference)
                .ok_or_else(|| ConfigError::UnresolvedReference {
                    name: name.to_string(),
                    reference: reference.to_string(),
                })?;
        self.handlers.insert(name.to_string(), handler);
        Ok(self)
    }

    pub fn build(self) -> Registry {
        Registry {
            handlers: self.handlers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn greet(name: &str) -> String {
        format!("Hello, {name}!")
    }

    fn demo_table() -> FunctionTable {
        let mut table = FunctionTable::new();
        table.insert("demo", "greet", greet);
        table
    }

    #[test]
    fn test_register_closure() {
        let registry = Registry::builder()
            .register("Shout", |v| v.to_uppercase())
            .build();

        let handler = registry.get("Shout").unwrap();
        assert_eq!(handler("hi"), "HI");
        assert!(!registry.contains("Whisper"));
        assert_eq!(registry.len(), 1);
        assert!(!registry.is_empty());
    }

    #[test]
    fn test_empty_registry() {
        let registry = Registry::builder().build();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert!(registry.names().is_empty());
    }

    #[test]
    fn test_register_qualified_reference() {
        let registry = Registry::builder()
            .register_ref("Hello", "demo:greet", &demo_table())
            .unwrap()
            .build();

        let handler = registry.get("Hello").unwrap();
        assert_eq!(handler("Markdown"), "Hello, Markdown!");
    }

    #[test]
    fn test_unresolved_reference_is_config_error() {
        let err = Registry::builder()
            .register_ref("Hello", "demo:missing", &demo_table())
            .err()
            .unwrap();

        assert!(matches!(err, ConfigError::UnresolvedReference { .. }));
    }

    #[test]
    fn test_malformed_reference_is_config_error() {
        let err = Registry::builder()
            .register_ref("Hello", "no-colon", &demo_table())
            .err()
            .unwrap();

        assert!(matches!(err, ConfigError::MalformedReference(_)));
    }

    #[test]
    fn test_from_yaml_config() {
        let config = RegistryConfig::from_yaml("Hello: \"demo:greet\"\n").unwrap();
        let registry = Registry::from_config(&config, &demo_table()).unwrap();

        assert_eq!(registry.names(), vec!["Hello"]);
        assert_eq!(registry.get("Hello").unwrap()("world"), "Hello, world!");
    }

    #[test]
    fn test_from_config_fails_eagerly() {
        let config = RegistryConfig::from_yaml("Nope: \"demo:absent\"\n").unwrap();
        let err = Registry::from_config(&config, &demo_table()).err().unwrap();

        assert!(matches!(
            err,
            ConfigError::UnresolvedReference { ref name, .. } if name == "Nope"
        ));
    }
}
