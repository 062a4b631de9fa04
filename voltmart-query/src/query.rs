//! The wrapped remote call.

use std::future::Future;

use async_trait::async_trait;

use voltmart_core::error::Result;

/// A remote query parameterised by `P`.
///
/// Implemented for any `Fn(P) -> impl Future<Output = Result<T>>`, so
/// closures over a data source can be debounced directly.
#[async_trait]
pub trait Query<P: Send + 'static>: Send + Sync + 'static {
    /// Value produced by a successful run.
    type Output: Send + Sync + 'static;

    /// Runs the query once.
    async fn run(&self, params: P) -> Result<Self::Output>;
}

#[async_trait]
impl<P, F, Fut, T> Query<P> for F
where
    P: Send + 'static,
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send,
    T: Send + Sync + 'static,
{
    type Output = T;

    async fn run(&self, params: P) -> Result<T> {
        (self)(params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voltmart_core::error::SyncError;

    struct Doubler;

    #[async_trait]
    impl Query<u32> for Doubler {
        type Output = u32;

        async fn run(&self, params: u32) -> Result<u32> {
            Ok(params * 2)
        }
    }

    #[tokio::test]
    async fn test_struct_query() {
        assert_eq!(Doubler.run(21).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_closure_query() {
        let query = |name: String| async move {
            if name.is_empty() {
                Err(SyncError::InvalidPayload("empty name".into()))
            } else {
                Ok(name.len())
            }
        };
        assert_eq!(query.run("tesla".into()).await.unwrap(), 5);
        assert!(query.run(String::new()).await.is_err());
    }
}
