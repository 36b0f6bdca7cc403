//! # Scaleflow
//!
//! An extensible action core: a minimal dispatch-and-subscribe object that
//! grows through middleware and plugins without those extensions knowing
//! about each other.
//!
//! ## Core Concepts
//!
//! - [`Core`] = `dispatch` + `subscribe` + `options`, plus named capabilities
//! - [`Middleware`] = wraps `dispatch`, forming a nested call chain
//! - [`Plugin`] = transforms the core, serially or in a parallel group
//! - [`Enhancer`] = transforms the core factory, installing the above
//!
//! Every extension point may be synchronous or asynchronous. Steps return a
//! [`Deferred`], and a pipeline made only of synchronous steps completes
//! synchronously.
//!
//! ## Architecture
//!
//! ```text
//! create_core(options, enhancer)
//!     │
//!     ▼ compose_async(enhancer₁, enhancer₂, ...)(base_factory)
//! CoreFactory ──► Core ──► dispatch(INIT)
//!                  │
//!                  ▼ dispatch(action)
//!          middleware₁ ─► middleware₂ ─► ... ─► base dispatch
//!               ▲                                  │
//!               └── api.dispatch(...)              ▼
//!                                          listeners (snapshot)
//! ```
//!
//! ## Key Invariants
//!
//! 1. **Base dispatch is identity** - a valid action comes back unchanged
//! 2. **Listener snapshots** - (un)subscribing mid-notification only affects
//!    later dispatches
//! 3. **Middleware nest in install order** - earlier is further out, whether
//!    installed by one `apply_middleware` or several
//! 4. **Serial steps never overlap** - each waits for the previous one
//! 5. **Parallel plugins keep the core** - every member must return the very
//!    core it was given
//!
//! ## Example
//!
//! ```ignore
//! use scaleflow_core::{
//!     apply_middleware, apply_plugin, compose, create_core, middleware, plugin, Deferred,
//!     Options,
//! };
//!
//! let attach_x = plugin(|core| Deferred::ready(core.with_capability("x", 1_i64)));
//! let logger = middleware(|_api, next, action| {
//!     tracing::info!(%action, "dispatching");
//!     next(action)
//! });
//!
//! let core = create_core(
//!     Options::new(),
//!     Some(compose![apply_plugin([attach_x]), apply_middleware([logger])]),
//! )
//! .await?;
//!
//! core.subscribe(|action| println!("{action}"));
//! core.dispatch(serde_json::json!({ "type": "foo" })).await?;
//! assert_eq!(core.capability::<i64>("x").as_deref(), Some(&1));
//! ```

// Core modules
mod action;
mod builder;
mod compose;
mod config;
mod core;
mod deferred;
mod error;
mod factory;
mod listeners;
mod macros;
mod middleware;
mod plugin;


// Re-export action types
pub use action::{Action, INIT};

// Re-export composition primitives
pub use compose::{compose_async, step, Step};
pub use deferred::Deferred;

// Re-export error types
pub use error::{CoreError, Result};

// Re-export core types
pub use crate::core::{Capability, Core, DispatchFn, Options};
pub use listeners::{listener, Listener, Unsubscribe};

// Re-export extension points
pub use middleware::{apply_middleware, middleware, staged_middleware, Middleware, MiddlewareApi};
pub use plugin::{apply_plugin, initializer, plugin, Plugin, PluginStep};

// Re-export construction
pub use builder::CoreBuilder;
pub use config::{create_core_from_config, CoreConfig, EnhancerRegistry};
pub use factory::{base_factory, create_core, CoreFactory, Enhancer};
