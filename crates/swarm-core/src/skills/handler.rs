//! SkillHandler - the typed contract a skill implements.
//!
//! A handler takes a decoded task and returns the result text that goes into
//! the delivery comment. It may suspend on I/O.

use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;

use crate::domain::{HandlerError, TaskDescriptor};

/// Executes one task.
///
/// # Example
/// ```ignore
/// struct Echo;
///
/// #[async_trait]
/// impl SkillHandler for Echo {
///     async fn handle(&self, task: &TaskDescriptor) -> Result<String, HandlerError> {
///         Ok(format!("echo: {}", task.title()))
///     }
/// }
/// ```
#[async_trait]
pub trait SkillHandler: Send + Sync {
    async fn handle(&self, task: &TaskDescriptor) -> Result<String, HandlerError>;
}

/// Adapter that turns an async closure into a `SkillHandler`.
///
/// The closure receives an owned copy of the task so the returned future can
/// be `'static`.
pub struct FnHandler<F, Fut> {
    f: F,
    _marker: PhantomData<fn() -> Fut>,
}

impl<F, Fut> FnHandler<F, Fut>
where
    F: Fn(TaskDescriptor) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, HandlerError>> + Send,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<F, Fut> SkillHandler for FnHandler<F, Fut>
where
    F: Fn(TaskDescriptor) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, HandlerError>> + Send,
{
    async fn handle(&self, task: &TaskDescriptor) -> Result<String, HandlerError> {
        (self.f)(task.clone()).await
    }
}

/// Shorthand for `FnHandler::new`.
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F, Fut>
where
    F: Fn(TaskDescriptor) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, HandlerError>> + Send,
{
    FnHandler::new(f)
}
