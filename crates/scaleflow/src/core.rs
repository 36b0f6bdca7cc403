//! The dispatch-and-subscribe core and its capability registry.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::{Map, Value};

use crate::action::Action;
use crate::deferred::Deferred;
use crate::error::{CoreError, Result};
use crate::listeners::{Listener, ListenerList, Unsubscribe};
use crate::middleware::Chain;

/// Construction options. An absent options object is the empty map.
pub type Options = Map<String, Value>;

/// A dispatch function: the base dispatch, or a middleware chain around it.
pub type DispatchFn = Arc<dyn Fn(Value) -> Deferred<Value> + Send + Sync>;

/// A named extension attached to a core by a plugin or initializer.
pub type Capability = Arc<dyn Any + Send + Sync>;

/// Shared handle to an action core.
///
/// Cloning is cheap and keeps reference identity ([`Core::ptr_eq`]).
/// Deriving a core (`with_capability`, installing middleware) produces a new
/// identity that shares the subscriber list and options of its source.
#[derive(Clone)]
pub struct Core {
    inner: Arc<CoreInner>,
}

struct CoreInner {
    options: Arc<Options>,
    dispatch: DispatchFn,
    listeners: Arc<ListenerList>,
    capabilities: DashMap<String, Capability>,
    chain: Chain,
}

impl Core {
    /// A bare core: dispatch validates the action and notifies subscribers.
    pub fn new(options: Options) -> Self {
        let listeners = Arc::new(ListenerList::default());
        let base = base_dispatch(Arc::clone(&listeners));

        Self {
            inner: Arc::new(CoreInner {
                options: Arc::new(options),
                dispatch: Arc::clone(&base),
                listeners,
                capabilities: DashMap::new(),
                chain: Chain::new(base),
            }),
        }
    }

    /// Dispatch through the installed middleware, ending at the base
    /// dispatch. The base dispatch returns the action unchanged.
    pub fn dispatch(&self, action: impl Into<Value>) -> Deferred<Value> {
        (self.inner.dispatch)(action.into())
    }

    /// The dispatch function itself, e.g. to hand to code that outlives a
    /// borrow of the core.
    pub fn dispatcher(&self) -> DispatchFn {
        Arc::clone(&self.inner.dispatch)
    }

    pub fn subscribe<F>(&self, listener: F) -> Unsubscribe
    where
        F: Fn(&Action) + Send + Sync + 'static,
    {
        self.inner.listeners.add(Arc::new(listener))
    }

    /// Subscribe the [`Listener`] registered as capability `name`.
    pub fn subscribe_capability(&self, name: &str) -> Result<Unsubscribe> {
        let listener = self
            .capability::<Listener>(name)
            .ok_or_else(|| CoreError::InvalidListenerKind {
                name: name.to_string(),
            })?;
        Ok(self.inner.listeners.add(Listener::clone(&listener)))
    }

    pub fn options(&self) -> &Options {
        &self.inner.options
    }

    pub fn option(&self, key: &str) -> Option<&Value> {
        self.inner.options.get(key)
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    /// Look up capability `name` as a `T`.
    pub fn capability<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        let entry = self.inner.capabilities.get(name)?;
        Arc::clone(entry.value()).downcast::<T>().ok()
    }

    pub fn has_capability(&self, name: &str) -> bool {
        self.inner.capabilities.contains_key(name)
    }

    pub fn capability_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .capabilities
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Attach a capability to this core in place.
    ///
    /// Append-only: returns `false` and keeps the existing value when `name`
    /// is already taken. Every clone of this handle sees the new capability;
    /// cores derived earlier do not.
    pub fn attach<T: Any + Send + Sync>(&self, name: impl Into<String>, value: T) -> bool {
        let name = name.into();
        match self.inner.capabilities.entry(name) {
            Entry::Occupied(entry) => {
                tracing::debug!(capability = %entry.key(), "capability already attached");
                false
            }
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(value));
                true
            }
        }
    }

    /// A new core carrying every capability of this one plus `name`.
    /// This core is left untouched.
    pub fn with_capability<T: Any + Send + Sync>(&self, name: impl Into<String>, value: T) -> Core {
        let capabilities = self.inner.capabilities.clone();
        capabilities.insert(name.into(), Arc::new(value));
        self.derive(
            Arc::clone(&self.inner.dispatch),
            self.inner.chain.clone(),
            capabilities,
        )
    }

    /// Whether `a` and `b` are the same core, not merely alike.
    pub fn ptr_eq(a: &Core, b: &Core) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    pub(crate) fn chain(&self) -> &Chain {
        &self.inner.chain
    }

    /// A copy of this core whose dispatch is `dispatch`.
    pub(crate) fn with_chain(&self, chain: Chain, dispatch: DispatchFn) -> Core {
        self.derive(dispatch, chain, self.inner.capabilities.clone())
    }

    fn derive(
        &self,
        dispatch: DispatchFn,
        chain: Chain,
        capabilities: DashMap<String, Capability>,
    ) -> Core {
        Core {
            inner: Arc::new(CoreInner {
                options: Arc::clone(&self.inner.options),
                dispatch,
                listeners: Arc::clone(&self.inner.listeners),
                capabilities,
                chain,
            }),
        }
    }
}

impl Default for Core {
    fn default() -> Self {
        Self::new(Options::new())
    }
}

impl fmt::Debug for Core {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Core")
            .field("options", &self.inner.options)
            .field("listeners", &self.inner.listeners.len())
            .field("capabilities", &self.capability_names())
            .field("middleware", &self.inner.chain.depth())
            .finish()
    }
}

fn base_dispatch(listeners: Arc<ListenerList>) -> DispatchFn {
    Arc::new(move |value: Value| {
        let action = match Action::try_from(value) {
            Ok(action) => action,
            Err(error) => return Deferred::failed(error),
        };
        let notified = listeners.notify(&action);
        tracing::trace!(action = %action, listeners = notified, "action dispatched");
        Deferred::ready(Value::from(action))
    })
}
