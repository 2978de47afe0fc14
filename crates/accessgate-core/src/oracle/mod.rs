//! Membership oracles: answer "is the principal in this group?".

use crate::context::CallContext;
use crate::errors::OracleError;
use crate::group::{Group, GroupSet};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

pub mod directory;
pub mod timeout;

pub use directory::DirectoryOracle;
pub use timeout::TimeoutOracle;

/// Answers group membership for the principal carried by a call context.
///
/// A negative answer is `Ok(false)`. `Err` is reserved for infrastructure
/// failures and must never be coerced into a denial by callers.
#[async_trait]
pub trait MembershipOracle: Send + Sync {
    async fn is_member(&self, group: Group, ctx: &CallContext) -> Result<bool, OracleError>;
}

#[async_trait]
impl<T: MembershipOracle + ?Sized> MembershipOracle for Arc<T> {
    async fn is_member(&self, group: Group, ctx: &CallContext) -> Result<bool, OracleError> {
        (**self).is_member(group, ctx).await
    }
}

/// Fixed principal → groups table.
#[derive(Debug, Clone, Default)]
pub struct StaticOracle {
    members: HashMap<String, GroupSet>,
}

impl StaticOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_table(table: &BTreeMap<String, Vec<Group>>) -> Self {
        let members = table
            .iter()
            .map(|(principal, groups)| (principal.clone(), groups.iter().copied().collect()))
            .collect();
        Self { members }
    }

    pub fn with_member(
        mut self,
        principal: impl Into<String>,
        groups: impl IntoIterator<Item = Group>,
    ) -> Self {
        self.members
            .entry(principal.into())
            .or_default()
            .extend(groups);
        self
    }
}

#[async_trait]
impl MembershipOracle for StaticOracle {
    async fn is_member(&self, group: Group, ctx: &CallContext) -> Result<bool, OracleError> {
        Ok(self
            .members
            .get(&ctx.principal().id)
            .is_some_and(|groups| groups.contains(&group)))
    }
}
