//! Request-scoped context propagated through every service call (§5).

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::id::EnvironmentId;

/// Carries cancellation, deadline, and correlation data through a single
/// service call and every outbound call it makes (repository, scheduler,
/// activity emitter, media/widget lookups).
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub environment_id: EnvironmentId,
    pub actor_id: Option<Uuid>,
    pub correlation_id: Uuid,
    pub deadline: Option<DateTime<Utc>>,
    cancellation: CancellationToken,
}

impl RequestContext {
    pub fn new(environment_id: EnvironmentId) -> Self {
        Self {
            environment_id,
            actor_id: None,
            correlation_id: Uuid::new_v4(),
            deadline: None,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_actor(mut self, actor_id: Uuid) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = id;
        self
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_canceled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// A child context for a downstream call (e.g. the scheduler or the
    /// activity emitter); shares cancellation with the parent.
    pub fn child(&self) -> Self {
        Self {
            environment_id: self.environment_id,
            actor_id: self.actor_id,
            correlation_id: self.correlation_id,
            deadline: self.deadline,
            cancellation: self.cancellation.clone(),
        }
    }

    /// Bail out with [`Error::Canceled`] if the context was canceled before
    /// the caller's commit point.
    pub fn check_canceled(&self) -> Result<()> {
        if self.is_canceled() {
            Err(Error::Canceled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_context_is_not_canceled() {
        let ctx = RequestContext::new(EnvironmentId::new());
        assert!(ctx.check_canceled().is_ok());
    }

    #[test]
    fn cancellation_propagates_to_children() {
        let ctx = RequestContext::new(EnvironmentId::new());
        let child = ctx.child();
        ctx.cancel();
        assert!(child.is_canceled());
        assert!(matches!(child.check_canceled(), Err(Error::Canceled)));
    }
}
