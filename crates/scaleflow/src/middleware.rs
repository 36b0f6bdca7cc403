//! Middleware: nested wrappers around the base dispatch.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;

use crate::action::Action;
use crate::compose::{compose_async, Step};
use crate::core::{Core, DispatchFn, Options};
use crate::deferred::Deferred;
use crate::factory::{CoreFactory, Enhancer};
use crate::listeners::Unsubscribe;

/// A dispatch wrapper, in two stages.
///
/// `install` runs once per core the middleware is installed on. It may
/// subscribe or set up per-core state through `api`, and returns the step
/// that wraps `next` into this middleware's dispatch. The returned step is
/// kept with the core, so installing further middleware later rebuilds the
/// chain from it without calling `install` again.
///
/// Inside the wrapped dispatch, calling [`MiddlewareApi::dispatch`] instead
/// of `next` re-enters the chain from the outermost middleware.
///
/// Closures `Fn(MiddlewareApi) -> Step<DispatchFn>` are middleware; see
/// [`staged_middleware`]. Middleware with no install work is written as a
/// per-action closure with [`middleware`].
pub trait Middleware: Send + Sync + 'static {
    fn install(&self, api: MiddlewareApi) -> Step<DispatchFn>;
}

impl<F> Middleware for F
where
    F: Fn(MiddlewareApi) -> Step<DispatchFn> + Send + Sync + 'static,
{
    fn install(&self, api: MiddlewareApi) -> Step<DispatchFn> {
        self(api)
    }
}

/// Box an install-stage closure as middleware.
pub fn staged_middleware<F>(install: F) -> Arc<dyn Middleware>
where
    F: Fn(MiddlewareApi) -> Step<DispatchFn> + Send + Sync + 'static,
{
    Arc::new(install)
}

/// Box a per-action closure as middleware. Its install stage only binds the
/// closure to the api.
pub fn middleware<F>(handle: F) -> Arc<dyn Middleware>
where
    F: Fn(&MiddlewareApi, &DispatchFn, Value) -> Deferred<Value> + Send + Sync + 'static,
{
    Arc::new(PerAction(Arc::new(handle)))
}

struct PerAction<F>(Arc<F>);

impl<F> Middleware for PerAction<F>
where
    F: Fn(&MiddlewareApi, &DispatchFn, Value) -> Deferred<Value> + Send + Sync + 'static,
{
    fn install(&self, api: MiddlewareApi) -> Step<DispatchFn> {
        let handle = Arc::clone(&self.0);
        Arc::new(move |next: DispatchFn| {
            let handle = Arc::clone(&handle);
            let api = api.clone();
            let dispatch: DispatchFn = Arc::new(move |action: Value| handle(&api, &next, action));
            Deferred::ready(dispatch)
        })
    }
}

/// The core as seen from inside a middleware.
///
/// Everything but `dispatch` reads the core the middleware was installed
/// on. `dispatch` always goes through the most recently built chain, so an
/// action dispatched from a middleware passes every middleware again.
#[derive(Clone)]
pub struct MiddlewareApi {
    core: Core,
    entry: Arc<RwLock<DispatchFn>>,
}

impl MiddlewareApi {
    pub fn dispatch(&self, action: impl Into<Value>) -> Deferred<Value> {
        let dispatch = Arc::clone(&self.entry.read().unwrap_or_else(PoisonError::into_inner));
        dispatch(action.into())
    }

    pub fn core(&self) -> &Core {
        &self.core
    }

    pub fn options(&self) -> &Options {
        self.core.options()
    }

    pub fn subscribe<F>(&self, listener: F) -> Unsubscribe
    where
        F: Fn(&Action) + Send + Sync + 'static,
    {
        self.core.subscribe(listener)
    }
}

impl fmt::Debug for MiddlewareApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareApi").field("core", &self.core).finish()
    }
}

/// Middleware installed on a core so far, outermost first.
///
/// Installing more middleware appends to `handlers` and recomposes the whole
/// chain around `base`, so middleware installed by an earlier enhancer stays
/// outside middleware installed by a later one. `entry` is shared by every
/// [`MiddlewareApi`] handed out for this core and always holds the newest
/// chain.
#[derive(Clone)]
pub(crate) struct Chain {
    base: DispatchFn,
    handlers: Vec<Step<DispatchFn>>,
    entry: Arc<RwLock<DispatchFn>>,
}

impl Chain {
    pub(crate) fn new(base: DispatchFn) -> Self {
        Self {
            entry: Arc::new(RwLock::new(Arc::clone(&base))),
            base,
            handlers: Vec::new(),
        }
    }

    pub(crate) fn depth(&self) -> usize {
        self.handlers.len()
    }
}

/// Enhancer that wraps the core's dispatch with `middleware`, first entry
/// outermost.
pub fn apply_middleware<I>(middleware: I) -> Enhancer
where
    I: IntoIterator<Item = Arc<dyn Middleware>>,
{
    let middleware: Arc<[Arc<dyn Middleware>]> = middleware.into_iter().collect();
    Arc::new(move |create: CoreFactory| {
        let middleware = Arc::clone(&middleware);
        let factory: CoreFactory = Arc::new(move |options: Options| {
            let middleware = Arc::clone(&middleware);
            create(options).and_then(move |core| install(&core, &middleware))
        });
        Deferred::ready(factory)
    })
}

fn install(core: &Core, middleware: &[Arc<dyn Middleware>]) -> Deferred<Core> {
    let chain = core.chain().clone();
    let api = MiddlewareApi {
        core: core.clone(),
        entry: Arc::clone(&chain.entry),
    };

    let mut handlers = chain.handlers;
    handlers.extend(middleware.iter().map(|middleware| middleware.install(api.clone())));
    tracing::debug!(
        added = middleware.len(),
        depth = handlers.len(),
        "installing middleware"
    );

    // Innermost first: the last handler wraps the base dispatch, the first
    // handler wraps everything else.
    let composed = compose_async(handlers.iter().rev().cloned().collect::<Vec<_>>());
    let base = chain.base;
    let entry = chain.entry;
    let core = core.clone();
    composed(Arc::clone(&base)).map(move |dispatch| {
        *entry.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&dispatch);
        let chain = Chain {
            base,
            handlers,
            entry,
        };
        core.with_chain(chain, dispatch)
    })
}
