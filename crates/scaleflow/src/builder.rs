//! Fluent core construction.

use std::sync::Arc;

use serde_json::Value;

use crate::compose::compose_async;
use crate::core::{Core, Options};
use crate::deferred::Deferred;
use crate::factory::{create_core, Enhancer};
use crate::middleware::{apply_middleware, Middleware};
use crate::plugin::{apply_plugin, initializer, Plugin, PluginStep};

/// Builder for a core assembled from plugins, initializers and middleware.
///
/// Every `with_*` call adds one enhancer; they are composed in call order,
/// so earlier plugins run first and earlier middleware sits further out.
///
/// ```ignore
/// let core = CoreBuilder::new()
///     .option("name", "orders")
///     .with_plugin(plugin(|core| Deferred::ready(core.with_capability("x", 1))))
///     .with_middleware(logger)
///     .build()
///     .await?;
/// ```
#[derive(Default)]
pub struct CoreBuilder {
    options: Options,
    enhancers: Vec<Enhancer>,
}

impl CoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn with_plugin(self, plugin: Plugin) -> Self {
        self.with_enhancer(apply_plugin([plugin]))
    }

    /// Add a parallel group; see [`PluginStep::Parallel`].
    pub fn with_parallel<I>(self, members: I) -> Self
    where
        I: IntoIterator<Item = Plugin>,
    {
        self.with_enhancer(apply_plugin([PluginStep::parallel(members)]))
    }

    pub fn with_initializer<F>(self, init: F) -> Self
    where
        F: Fn(&Core) -> Deferred<()> + Send + Sync + 'static,
    {
        self.with_plugin(initializer(init))
    }

    pub fn with_middleware(self, middleware: Arc<dyn Middleware>) -> Self {
        self.with_enhancer(apply_middleware([middleware]))
    }

    pub fn with_enhancer(mut self, enhancer: Enhancer) -> Self {
        self.enhancers.push(enhancer);
        self
    }

    pub fn build(self) -> Deferred<Core> {
        let enhancer = (!self.enhancers.is_empty()).then(|| compose_async(self.enhancers));
        create_core(self.options, enhancer)
    }
}
