//! The result-or-future union threaded through every composition primitive.
//!
//! Middleware, plugins and enhancers may each be synchronous or not, and the
//! caller is never expected to know which. Every step therefore returns a
//! [`Deferred`], and the only place that distinguishes the two cases is
//! [`Deferred::and_then`].

use std::fmt;
use std::future::{Future, IntoFuture};

use futures::future::{self, BoxFuture, FutureExt};

use crate::error::{CoreError, Result};

/// A value that is available now, or will be once a future settles.
///
/// Chains built with [`and_then`](Deferred::and_then) stay [`Ready`](Deferred::Ready)
/// for as long as every step is ready, so a pipeline of synchronous pieces
/// completes without an executor. As soon as one step is pending, the rest of
/// the chain runs after it settles, in order.
#[must_use = "a deferred value does nothing unless it is inspected or awaited"]
pub enum Deferred<T> {
    /// Settled synchronously.
    Ready(Result<T>),
    /// Settles when the future completes.
    Pending(BoxFuture<'static, Result<T>>),
}

impl<T: Send + 'static> Deferred<T> {
    pub fn ready(value: T) -> Self {
        Self::Ready(Ok(value))
    }

    pub fn failed(error: impl Into<CoreError>) -> Self {
        Self::Ready(Err(error.into()))
    }

    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        Self::Pending(future.boxed())
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Take the settled result, or `None` (dropping the future) if pending.
    pub fn into_ready(self) -> Option<Result<T>> {
        match self {
            Self::Ready(result) => Some(result),
            Self::Pending(_) => None,
        }
    }

    /// Feed the settled value to `f`.
    ///
    /// Runs `f` immediately when ready; otherwise returns a pending value
    /// that awaits this one first. Errors short-circuit and `f` never runs.
    pub fn and_then<U, F>(self, f: F) -> Deferred<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Deferred<U> + Send + 'static,
    {
        match self {
            Self::Ready(Ok(value)) => f(value),
            Self::Ready(Err(error)) => Deferred::Ready(Err(error)),
            Self::Pending(pending) => Deferred::pending(async move {
                let value = pending.await?;
                f(value).await
            }),
        }
    }

    pub fn map<U, F>(self, f: F) -> Deferred<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        self.and_then(move |value| Deferred::ready(f(value)))
    }
}

impl<T> From<Result<T>> for Deferred<T> {
    fn from(result: Result<T>) -> Self {
        Self::Ready(result)
    }
}

impl<T: Send + 'static> IntoFuture for Deferred<T> {
    type Output = Result<T>;
    type IntoFuture = BoxFuture<'static, Result<T>>;

    fn into_future(self) -> Self::IntoFuture {
        match self {
            Self::Ready(result) => future::ready(result).boxed(),
            Self::Pending(pending) => pending,
        }
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(Ok(_)) => f.write_str("Deferred::Ready(Ok(..))"),
            Self::Ready(Err(error)) => write!(f, "Deferred::Ready(Err({error}))"),
            Self::Pending(_) => f.write_str("Deferred::Pending(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_ready_chain_stays_ready() {
        let chained = Deferred::ready(2).and_then(|n| Deferred::ready(n * 10)).map(|n| n + 1);
        assert!(chained.is_ready());
        assert_eq!(chained.into_ready().unwrap().unwrap(), 21);
    }

    #[test]
    fn test_error_short_circuits() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        let chained = Deferred::<i32>::failed(anyhow::anyhow!("boom")).and_then(move |n| {
            flag.store(true, Ordering::SeqCst);
            Deferred::ready(n)
        });

        let err = chained.into_ready().unwrap().unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_pending_infects_the_rest_of_the_chain() {
        let chained = Deferred::pending(async { Ok(1) })
            .and_then(|n| Deferred::ready(n + 1))
            .map(|n| n * 3);

        assert!(!chained.is_ready());
        assert_eq!(chained.await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_ready_values_can_be_awaited() {
        assert_eq!(Deferred::ready("now").await.unwrap(), "now");
    }

    #[test]
    fn test_into_ready_on_pending_is_none() {
        let pending = Deferred::pending(async { Ok(()) });
        assert!(pending.into_ready().is_none());
    }
}
