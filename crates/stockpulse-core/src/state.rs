use std::fmt::Display;
use std::future::Future;

use serde::Serialize;
use tokio::sync::mpsc;

/// Consumer-facing state of one request.
///
/// `Loading` is transient and always precedes exactly one terminal state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum FetchState<T> {
    Loading,
    Success(T),
    Error(String),
}

impl<T> FetchState<T> {
    pub fn from_result<E>(result: Result<T, E>) -> Self
    where
        E: Display,
    {
        match result {
            Ok(value) => Self::Success(value),
            Err(error) => Self::Error(error.to_string()),
        }
    }

    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Loading)
    }

    pub fn success(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }
}

/// Run `operation` on the runtime and stream its progress.
///
/// The receiver yields `Loading` immediately, then one terminal state, then
/// closes. Dropping the receiver does not cancel the operation.
pub fn observe<T, E, F>(operation: F) -> mpsc::Receiver<FetchState<T>>
where
    T: Send + 'static,
    E: Display + Send + 'static,
    F: Future<Output = Result<T, E>> + Send + 'static,
{
    let (sender, receiver) = mpsc::channel(2);
    tokio::spawn(async move {
        if sender.send(FetchState::Loading).await.is_err() {
            tracing::debug!("observer dropped before loading state");
        }
        let terminal = FetchState::from_result(operation.await);
        if sender.send(terminal).await.is_err() {
            tracing::debug!("observer dropped before terminal state");
        }
    });
    receiver
}

/// Like [`observe`] for operations that cannot fail.
pub fn observe_infallible<T, F>(operation: F) -> mpsc::Receiver<FetchState<T>>
where
    T: Send + 'static,
    F: Future<Output = T> + Send + 'static,
{
    observe(async move { Ok::<T, std::convert::Infallible>(operation.await) })
}
