//! Building cores from configuration.
//!
//! A [`CoreConfig`] names the enhancers a core is built with; an
//! [`EnhancerRegistry`] supplies them.
//!
//! ```json
//! {
//!   "options": { "name": "orders" },
//!   "enhancers": ["audit", "thunk"]
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::compose::compose_async;
use crate::core::{Core, Options};
use crate::deferred::Deferred;
use crate::error::{CoreError, Result};
use crate::factory::{create_core, Enhancer};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    /// Passed to the core as its options.
    pub options: Options,
    /// Registry names, applied in order (first innermost).
    pub enhancers: Vec<String>,
}

impl CoreConfig {
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

/// Named enhancers available to configuration.
#[derive(Clone, Default)]
pub struct EnhancerRegistry {
    entries: BTreeMap<String, Enhancer>,
}

impl EnhancerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enhancer(mut self, name: impl Into<String>, enhancer: Enhancer) -> Self {
        self.register(name, enhancer);
        self
    }

    /// Register `enhancer` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, enhancer: Enhancer) {
        self.entries.insert(name.into(), enhancer);
    }

    pub fn resolve(&self, name: &str) -> Result<Enhancer> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::InvalidEnhancerKind {
                name: name.to_string(),
            })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl fmt::Debug for EnhancerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

/// Resolve every enhancer `config` names, compose them in order and build
/// the core. Nothing is built if any name fails to resolve.
pub fn create_core_from_config(config: &CoreConfig, registry: &EnhancerRegistry) -> Deferred<Core> {
    let enhancers = match config
        .enhancers
        .iter()
        .map(|name| registry.resolve(name))
        .collect::<Result<Vec<_>>>()
    {
        Ok(enhancers) => enhancers,
        Err(error) => return Deferred::failed(error),
    };

    let enhancer = (!enhancers.is_empty()).then(|| compose_async(enhancers));
    create_core(config.options.clone(), enhancer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{apply_plugin, plugin};
    use serde_json::json;

    fn tag(name: &'static str) -> Enhancer {
        apply_plugin([plugin(move |core| {
            let mut trail = core
                .capability::<Vec<&'static str>>("trail")
                .map(|trail| Vec::clone(&trail))
                .unwrap_or_default();
            trail.push(name);
            Deferred::ready(core.with_capability("trail", trail))
        })])
    }

    #[test]
    fn test_parse_config() {
        let config = CoreConfig::from_json(r#"{"options":{"name":"orders"},"enhancers":["a","b"]}"#).unwrap();
        assert_eq!(config.options.get("name"), Some(&json!("orders")));
        assert_eq!(config.enhancers, vec!["a", "b"]);

        assert_eq!(CoreConfig::from_json("{}").unwrap(), CoreConfig::default());
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let err = CoreConfig::from_value(json!({ "plugins": [] })).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn test_enhancers_applied_in_listed_order() {
        let registry = EnhancerRegistry::new()
            .with_enhancer("first", tag("first"))
            .with_enhancer("second", tag("second"));
        let config = CoreConfig::from_value(json!({
            "options": { "name": "ordered" },
            "enhancers": ["second", "first"]
        }))
        .unwrap();

        let core = create_core_from_config(&config, &registry).into_ready().unwrap().unwrap();
        assert_eq!(core.option("name"), Some(&json!("ordered")));
        assert_eq!(
            core.capability::<Vec<&'static str>>("trail").as_deref(),
            Some(&vec!["second", "first"])
        );
    }

    #[test]
    fn test_unregistered_enhancer_is_rejected() {
        let registry = EnhancerRegistry::new().with_enhancer("known", tag("known"));
        let config = CoreConfig {
            enhancers: vec!["known".into(), "missing".into()],
            ..CoreConfig::default()
        };

        let err = create_core_from_config(&config, &registry).into_ready().unwrap().unwrap_err();
        assert!(matches!(err, CoreError::InvalidEnhancerKind { name } if name == "missing"));
        assert_eq!(format!("{registry:?}"), r#"{"known"}"#);
    }

    #[test]
    fn test_no_enhancers_builds_bare_core() {
        let core = create_core_from_config(&CoreConfig::default(), &EnhancerRegistry::new())
            .into_ready()
            .unwrap()
            .unwrap();
        assert!(core.capability_names().is_empty());
    }
}
