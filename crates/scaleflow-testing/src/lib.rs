//! Testing utilities for scaleflow cores.
//!
//! [`Recorder`] hands out listeners, middleware and plugins that append to
//! one shared call log, so a test can assert on the order in which the
//! pieces of a pipeline ran.
//!
//! ```ignore
//! let recorder = Recorder::new();
//! let core = create_core(
//!     Options::new(),
//!     Some(apply_middleware([recorder.middleware("m1"), recorder.middleware("m2")])),
//! )
//! .await?;
//! core.subscribe(recorder.listener("sub"));
//! core.dispatch(json!({ "type": "go" })).await?;
//!
//! assert_eq!(recorder.entries_after_init(), vec!["m1:go", "m2:go", "sub:go"]);
//! ```

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use scaleflow_core::{middleware, plugin, Action, Core, Deferred, Middleware, Plugin, INIT};
use serde_json::Value;

/// Shared, ordered call log.
#[derive(Clone, Default)]
pub struct Recorder {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Entries not produced by the `INIT` action.
    pub fn entries_after_init(&self) -> Vec<String> {
        let suffix = format!(":{INIT}");
        self.entries()
            .into_iter()
            .filter(|entry| !entry.ends_with(&suffix))
            .collect()
    }

    /// How many entries start with `label:`.
    pub fn count(&self, label: &str) -> usize {
        let prefix = format!("{label}:");
        self.entries()
            .iter()
            .filter(|entry| entry.starts_with(&prefix))
            .count()
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Listener recording `label:<type>`.
    pub fn listener(&self, label: &str) -> impl Fn(&Action) + Send + Sync + 'static {
        let recorder = self.clone();
        let label = label.to_string();
        move |action| recorder.record(format!("{label}:{action}"))
    }

    /// Middleware recording `label:<type>` and passing the action on.
    pub fn middleware(&self, label: &str) -> Arc<dyn Middleware> {
        let recorder = self.clone();
        let label = label.to_string();
        middleware(move |_api, next, action| {
            recorder.record(format!("{label}:{}", type_of(&action)));
            next(action)
        })
    }

    /// Plugin recording `label` when invoked and returning the core as is.
    pub fn plugin(&self, label: &str) -> Plugin {
        let recorder = self.clone();
        let label = label.to_string();
        plugin(move |core| {
            recorder.record(label.clone());
            Deferred::ready(core)
        })
    }

    /// Plugin that waits `delay`, then records `label` and returns the core
    /// as is.
    pub fn delayed_plugin(&self, label: &str, delay: Duration) -> Plugin {
        let recorder = self.clone();
        let label = label.to_string();
        plugin(move |core| {
            let recorder = recorder.clone();
            let label = label.clone();
            Deferred::pending(async move {
                tokio::time::sleep(delay).await;
                recorder.record(label);
                Ok(core)
            })
        })
    }
}

impl std::fmt::Debug for Recorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.entries()).finish()
    }
}

/// `value` after `delay`.
pub fn delayed<T: Send + 'static>(value: T, delay: Duration) -> Deferred<T> {
    Deferred::pending(async move {
        tokio::time::sleep(delay).await;
        Ok(value)
    })
}

/// Plugin adding capability `name` to a new core (new-object discipline).
pub fn capability_plugin<T>(name: &'static str, value: T) -> Plugin
where
    T: Clone + Send + Sync + 'static,
{
    plugin(move |core: Core| Deferred::ready(core.with_capability(name, value.clone())))
}

fn type_of(action: &Value) -> String {
    match action.get("type") {
        Some(Value::String(kind)) => kind.clone(),
        Some(other) => other.to_string(),
        None => action.to_string(),
    }
}
