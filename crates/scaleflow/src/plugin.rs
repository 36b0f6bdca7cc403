//! Plugins: serial and parallel transforms of the core.
//!
//! Two disciplines coexist and must not be mixed within one step:
//!
//! - A plugin built with [`plugin`] returns a core, usually a new one from
//!   [`Core::with_capability`]. Such plugins only make sense serially.
//! - An initializer built with [`initializer`] mutates the core it is given
//!   through [`Core::attach`] and hands the same core back, which is the only
//!   kind of member a parallel group accepts.

use std::fmt;
use std::future::IntoFuture;
use std::sync::Arc;

use futures::future::join_all;
use smallvec::SmallVec;

use crate::compose::{compose_async, Step};
use crate::core::{Core, Options};
use crate::deferred::Deferred;
use crate::error::{CoreError, Result};
use crate::factory::{CoreFactory, Enhancer};

/// `(core) -> core`, possibly deferred.
pub type Plugin = Step<Core>;

pub fn plugin<F>(f: F) -> Plugin
where
    F: Fn(Core) -> Deferred<Core> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Turn an in-place mutation of the core into a plugin that returns the core
/// it was given once `init` settles.
pub fn initializer<F>(init: F) -> Plugin
where
    F: Fn(&Core) -> Deferred<()> + Send + Sync + 'static,
{
    Arc::new(move |core: Core| {
        let applied = init(&core);
        applied.map(move |()| core)
    })
}

/// One step of [`apply_plugin`].
#[derive(Clone)]
pub enum PluginStep {
    /// Sees the previous step's core; the next step sees its result.
    Serial(Plugin),
    /// Members run concurrently against the same core and must each return
    /// that very core.
    Parallel(Arc<[Plugin]>),
}

impl PluginStep {
    pub fn parallel<I>(members: I) -> Self
    where
        I: IntoIterator<Item = Plugin>,
    {
        Self::Parallel(members.into_iter().collect())
    }

    fn apply(&self, core: Core) -> Deferred<Core> {
        match self {
            Self::Serial(plugin) => plugin(core),
            Self::Parallel(members) => apply_parallel(members, core),
        }
    }

    /// This step as a single plugin, the unit [`compose_async`] chains.
    fn into_plugin(self, index: usize) -> Plugin {
        Arc::new(move |core: Core| {
            tracing::debug!(step = index, kind = ?self, "applying plugin step");
            self.apply(core)
        })
    }
}

impl From<Plugin> for PluginStep {
    fn from(plugin: Plugin) -> Self {
        Self::Serial(plugin)
    }
}

impl From<Vec<Plugin>> for PluginStep {
    fn from(members: Vec<Plugin>) -> Self {
        Self::parallel(members)
    }
}

impl fmt::Debug for PluginStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial(_) => f.write_str("Serial"),
            Self::Parallel(members) => write!(f, "Parallel({})", members.len()),
        }
    }
}

/// Enhancer that applies `steps` in order to the core its factory builds.
///
/// Each step waits for the previous one to settle. The enhanced factory is
/// ready only if every plugin was.
pub fn apply_plugin<I>(steps: I) -> Enhancer
where
    I: IntoIterator,
    I::Item: Into<PluginStep>,
{
    let pipeline = compose_async(
        steps
            .into_iter()
            .enumerate()
            .map(|(index, step)| Into::<PluginStep>::into(step).into_plugin(index)),
    );
    Arc::new(move |create: CoreFactory| {
        let pipeline = Arc::clone(&pipeline);
        let factory: CoreFactory = Arc::new(move |options: Options| {
            let pipeline = Arc::clone(&pipeline);
            create(options).and_then(move |core| pipeline(core))
        });
        Deferred::ready(factory)
    })
}

fn apply_parallel(members: &[Plugin], core: Core) -> Deferred<Core> {
    // Every member is invoked before any result is looked at.
    let results: SmallVec<[Deferred<Core>; 4]> =
        members.iter().map(|member| member(core.clone())).collect();

    if results.iter().all(Deferred::is_ready) {
        let settled = results.into_iter().filter_map(Deferred::into_ready);
        return ensure_unchanged(settled, core).into();
    }

    Deferred::pending(async move {
        let settled = join_all(results.into_iter().map(IntoFuture::into_future)).await;
        ensure_unchanged(settled, core)
    })
}

fn ensure_unchanged<I>(settled: I, core: Core) -> Result<Core>
where
    I: IntoIterator<Item = Result<Core>>,
{
    for (member, result) in settled.into_iter().enumerate() {
        if !Core::ptr_eq(&result?, &core) {
            tracing::warn!(member, "parallel plugin replaced the core");
            return Err(CoreError::ParallelMutationConflict { member });
        }
    }
    Ok(core)
}
