//! Cancellation and deadlines for repository calls.
//!
//! Storage calls block only at the I/O boundary. A [`CallContext`] lets the
//! caller bound that blocking: the storage layer checks it between
//! statements and polls [`CallContext::interrupt_probe`] while a statement
//! runs.

use std::{
    panic::{AssertUnwindSafe, RefUnwindSafe},
    time::{Duration, Instant},
};

use tokio_util::sync::CancellationToken;

use crate::ContextError;

/// Deadline and cancellation state for one call.
///
/// # Examples
///
/// ```
/// use housing_core::{CallContext, ContextError};
///
/// let (ctx, handle) = CallContext::background().cancellable();
/// assert!(ctx.check().is_ok());
/// handle.cancel();
/// assert_eq!(ctx.check(), Err(ContextError::Cancelled));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    token: Option<CancellationToken>,
}

impl CallContext {
    /// A context that never expires and cannot be cancelled.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    /// A context expiring `timeout` from now.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now().checked_add(timeout),
            token: None,
        }
    }

    /// A context expiring at `deadline`.
    #[must_use]
    pub const fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            token: None,
        }
    }

    /// Attach a fresh cancellation token, returning the handle that trips
    /// it.
    #[must_use]
    pub fn cancellable(self) -> (Self, CancelHandle) {
        let token = CancellationToken::new();
        let handle = CancelHandle(token.clone());
        (self.with_token(token), handle)
    }

    /// Stop the call when `token` is cancelled.
    ///
    /// Passing a child token lets a caller cancel a group of calls at once
    /// while each keeps its own deadline.
    #[must_use]
    pub fn with_token(self, token: CancellationToken) -> Self {
        Self {
            token: Some(token),
            ..self
        }
    }

    /// Deadline, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fail if the call was cancelled or its deadline passed.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::Cancelled`] or [`ContextError::DeadlineExceeded`].
    pub fn check(&self) -> Result<(), ContextError> {
        if self
            .token
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
        {
            return Err(ContextError::Cancelled);
        }
        if self
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
        {
            return Err(ContextError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Whether the context can ever stop a call.
    #[must_use]
    pub const fn is_bounded(&self) -> bool {
        self.deadline.is_some() || self.token.is_some()
    }

    /// Closure returning `true` once the call should stop.
    ///
    /// The closure owns its state so it can be handed to a storage driver.
    /// It only reads the token and the clock.
    #[must_use]
    pub fn interrupt_probe(&self) -> impl FnMut() -> bool + Send + RefUnwindSafe + 'static {
        let ctx = AssertUnwindSafe(self.clone());
        move || ctx.check().is_err()
    }
}

/// Trips the cancellation token of a [`CallContext`].
#[derive(Debug, Clone)]
pub struct CancelHandle(CancellationToken);

impl CancelHandle {
    /// Cancel every call running under the associated context.
    pub fn cancel(&self) {
        self.0.cancel();
    }

    /// The underlying token, for callers that cancel from async code.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.0.clone()
    }
}
