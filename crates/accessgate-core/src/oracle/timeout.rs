use super::MembershipOracle;
use crate::context::CallContext;
use crate::errors::OracleError;
use crate::group::Group;
use async_trait::async_trait;
use std::time::Duration;

/// Bounds every membership check with a deadline.
///
/// An elapsed deadline is an infrastructure failure, not a denial.
#[derive(Debug, Clone)]
pub struct TimeoutOracle<O> {
    inner: O,
    after: Duration,
}

impl<O> TimeoutOracle<O> {
    pub fn new(inner: O, after: Duration) -> Self {
        Self { inner, after }
    }

    pub fn timeout(&self) -> Duration {
        self.after
    }
}

#[async_trait]
impl<O: MembershipOracle> MembershipOracle for TimeoutOracle<O> {
    async fn is_member(&self, group: Group, ctx: &CallContext) -> Result<bool, OracleError> {
        match tokio::time::timeout(self.after, self.inner.is_member(group, ctx)).await {
            Ok(result) => result,
            Err(_) => Err(OracleError::Timeout {
                group,
                after: self.after,
            }),
        }
    }
}
