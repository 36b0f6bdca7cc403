//! Core factories and the enhancers that transform them.

use std::sync::Arc;

use crate::action::{Action, INIT};
use crate::compose::Step;
use crate::core::{Core, Options};
use crate::deferred::Deferred;

/// Builds a core from options, synchronously or not.
pub type CoreFactory = Arc<dyn Fn(Options) -> Deferred<Core> + Send + Sync>;

/// Transforms a core factory, typically to install middleware or plugins.
///
/// Enhancers are steps, so [`compose_async`](crate::compose_async) chains
/// them: the first enhancer is applied to the base factory first and ends up
/// innermost, which reads as a left-to-right pipeline.
pub type Enhancer = Step<CoreFactory>;

/// The factory enhancers start from: a bare [`Core`], no `INIT` dispatch.
pub fn base_factory() -> CoreFactory {
    Arc::new(|options: Options| Deferred::ready(Core::new(options)))
}

/// Build a core, running it through `enhancer` when one is given.
///
/// Once the final core exists, an [`INIT`] action is dispatched through it,
/// so every installed middleware sees it before any caller-issued action.
/// The result is ready unless some step of the construction was pending.
pub fn create_core(options: Options, enhancer: Option<Enhancer>) -> Deferred<Core> {
    let built = match enhancer {
        Some(enhancer) => {
            enhancer(base_factory()).and_then(move |factory| factory(options))
        }
        None => Deferred::ready(Core::new(options)),
    };
    built.and_then(announce)
}

fn announce(core: Core) -> Deferred<Core> {
    tracing::debug!(?core, "core assembled");
    core.dispatch(Action::new(INIT)).map(move |_| core)
}
