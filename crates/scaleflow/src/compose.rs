//! Sequential composition of sync-or-async steps.

use std::sync::Arc;

use crate::deferred::Deferred;

/// One unary stage of a pipeline.
///
/// Middleware handlers, plugins and enhancers are all steps over their own
/// input type, which is what lets a single [`compose_async`] chain each of
/// them.
pub type Step<T> = Arc<dyn Fn(T) -> Deferred<T> + Send + Sync>;

/// Box a closure as a [`Step`].
pub fn step<T, F>(f: F) -> Step<T>
where
    F: Fn(T) -> Deferred<T> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Compose `steps` into one step that applies them first to last.
///
/// `compose_async([f1, f2, f3])(x)` is `f3(f2(f1(x)))`. A step that returns
/// a pending value is awaited before the next one runs; the composed result
/// is ready only if every step was. No steps gives the identity, a single
/// step is returned as is.
pub fn compose_async<T, I>(steps: I) -> Step<T>
where
    T: Send + 'static,
    I: IntoIterator<Item = Step<T>>,
{
    let mut steps: Vec<Step<T>> = steps.into_iter().collect();
    if steps.len() <= 1 {
        return match steps.pop() {
            Some(only) => only,
            None => Arc::new(|value: T| Deferred::ready(value)),
        };
    }

    let steps: Arc<[Step<T>]> = steps.into();
    Arc::new(move |input: T| {
        steps.iter().fold(Deferred::ready(input), |acc, step| {
            let step = Arc::clone(step);
            acc.and_then(move |value| step(value))
        })
    })
}
