//! Gate: block a call unless the principal is in at least one required group.

use crate::context::CallContext;
use crate::errors::{AccessError, ConfigError};
use crate::evaluator::evaluate_groups;
use crate::group::{Group, GroupSet};
use crate::oracle::MembershipOracle;
use tracing::{info, warn};

/// Non-empty set of groups, any one of which admits the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredGroups(GroupSet);

impl RequiredGroups {
    pub fn new(
        operation: &str,
        groups: impl IntoIterator<Item = Group>,
    ) -> Result<Self, ConfigError> {
        let set: GroupSet = groups.into_iter().collect();
        if set.is_empty() {
            return Err(ConfigError::EmptyRequiredGroups {
                operation: operation.to_string(),
            });
        }
        Ok(Self(set))
    }

    pub fn one(group: Group) -> Self {
        Self(GroupSet::from([group]))
    }

    pub fn groups(&self) -> &GroupSet {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct Gate {
    required: RequiredGroups,
}

impl Gate {
    pub fn new(required: RequiredGroups) -> Self {
        Self { required }
    }

    pub fn required(&self) -> &RequiredGroups {
        &self.required
    }

    /// `Ok(())` admits the call. Leaves the context untouched either way.
    pub async fn check<O>(
        &self,
        operation: &str,
        oracle: &O,
        ctx: &CallContext,
    ) -> Result<(), AccessError>
    where
        O: MembershipOracle + ?Sized,
    {
        let memberships = evaluate_groups(oracle, self.required.groups(), ctx).await?;

        if let Some(group) = memberships.granted().next() {
            info!(
                operation,
                call_id = ctx.call_id(),
                principal = %ctx.principal().id,
                group = %group,
                "gate allowed"
            );
            return Ok(());
        }

        warn!(
            operation,
            call_id = ctx.call_id(),
            principal = %ctx.principal().id,
            required = ?self.required.groups(),
            "gate denied"
        );
        Err(AccessError::Forbidden {
            operation: operation.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Principal;
    use crate::oracle::StaticOracle;

    fn gate(groups: &[Group]) -> Gate {
        Gate::new(RequiredGroups::new("op", groups.iter().copied()).unwrap())
    }

    #[test]
    fn test_empty_required_groups_is_misconfiguration() {
        let err = RequiredGroups::new("getMembersOf", []).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::EmptyRequiredGroups { operation } if operation == "getMembersOf"
        ));
    }

    #[tokio::test]
    async fn test_any_matching_group_allows() {
        let oracle = StaticOracle::new().with_member("alice", [Group::SysAdmins]);
        let ctx = CallContext::new(Principal::new("alice"));

        gate(&[Group::SuperUser, Group::SysAdmins])
            .check("op", &oracle, &ctx)
            .await
            .unwrap();
        assert_eq!(ctx.access_rights(), None);
    }

    #[tokio::test]
    async fn test_no_matching_group_is_forbidden() {
        let oracle = StaticOracle::new().with_member("alice", [Group::General]);
        let ctx = CallContext::new(Principal::new("alice"));

        let err = gate(&[Group::SuperUser])
            .check("op", &oracle, &ctx)
            .await
            .unwrap_err();
        assert!(err.is_forbidden());
    }
}
