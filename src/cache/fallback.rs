//! Fallback values for cache misses.

use std::fmt;
use std::future::Future;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;

use crate::error::{CacheError, Result};

type Producer = Box<dyn FnOnce() -> BoxFuture<'static, anyhow::Result<Value>> + Send>;

/// What `get_or` and `fetch` use when a key is absent: either a literal
/// value or a zero-argument async producer.
///
/// A producer is consumed on use, so it runs at most once per call.
pub enum Fallback {
    /// Literal value returned (and, for `fetch`, stored) on a miss
    Value(Value),
    /// Computed on a miss; its error propagates to the caller
    Producer(Producer),
}

impl Fallback {
    /// Wraps a literal value.
    pub fn value(value: impl Into<Value>) -> Self {
        Fallback::Value(value.into())
    }

    /// Wraps an async producer.
    ///
    /// # Example
    /// ```
    /// use stash::cache::Fallback;
    /// use serde_json::json;
    ///
    /// let fallback = Fallback::with(|| async { Ok(json!({"user": 42})) });
    /// # drop(fallback);
    /// ```
    pub fn with<F, Fut>(producer: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        Fallback::Producer(Box::new(move || producer().boxed()))
    }

    /// Produces the fallback value, running the producer if there is one.
    pub async fn resolve(self) -> Result<Value> {
        match self {
            Fallback::Value(value) => Ok(value),
            Fallback::Producer(producer) => producer().await.map_err(CacheError::Fallback),
        }
    }
}

impl fmt::Debug for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fallback::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Fallback::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

impl From<Value> for Fallback {
    fn from(value: Value) -> Self {
        Fallback::Value(value)
    }
}
