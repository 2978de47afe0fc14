//! Group-set evaluation: concurrent fan-out to the oracle, then a barrier.

use crate::context::CallContext;
use crate::errors::OracleError;
use crate::group::{Group, GroupSet};
use crate::oracle::MembershipOracle;
use futures::future::join_all;
use std::collections::BTreeMap;
use tracing::debug;

/// Membership answers for exactly the groups that were requested.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Memberships(BTreeMap<Group, bool>);

impl Memberships {
    pub fn any(&self) -> bool {
        self.0.values().any(|member| *member)
    }

    pub fn is_member(&self, group: Group) -> bool {
        self.0.get(&group).copied().unwrap_or(false)
    }

    pub fn groups(&self) -> impl Iterator<Item = Group> + '_ {
        self.0.keys().copied()
    }

    /// Groups the principal belongs to.
    pub fn granted(&self) -> impl Iterator<Item = Group> + '_ {
        self.0
            .iter()
            .filter_map(|(group, member)| member.then_some(*group))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Check every group in `groups` against the oracle.
///
/// All checks are started before any is awaited and the call only returns
/// once every check has settled. A failure does not cancel the others; when
/// several fail, the error for the lowest group wins.
pub async fn evaluate_groups<O>(
    oracle: &O,
    groups: &GroupSet,
    ctx: &CallContext,
) -> Result<Memberships, OracleError>
where
    O: MembershipOracle + ?Sized,
{
    let checks = groups.iter().map(|&group| async move {
        let result = oracle.is_member(group, ctx).await;
        (group, result)
    });
    let settled = join_all(checks).await;

    let mut memberships = BTreeMap::new();
    for (group, result) in settled {
        let member = result?;
        debug!(
            call_id = ctx.call_id(),
            principal = %ctx.principal().id,
            group = %group,
            member,
            "membership checked"
        );
        memberships.insert(group, member);
    }
    Ok(Memberships(memberships))
}
