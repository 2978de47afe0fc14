//! Capability annotation: compute `{read, write}` for the caller and attach it
//! to the call context. Never blocks a call.

use crate::context::{AccessCapability, CallContext};
use crate::errors::AccessError;
use crate::evaluator::evaluate_groups;
use crate::group::GroupSet;
use crate::oracle::MembershipOracle;
use tracing::debug;

/// Read-enabling and write-enabling groups. Either may be empty; an empty
/// set grants nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilityGroups {
    pub read: GroupSet,
    pub write: GroupSet,
}

impl CapabilityGroups {
    /// Every distinct group, checked once even when listed for both flags.
    pub fn union(&self) -> GroupSet {
        self.read.union(&self.write).copied().collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CapabilityAnnotator {
    groups: CapabilityGroups,
}

impl CapabilityAnnotator {
    pub fn new(groups: CapabilityGroups) -> Self {
        Self { groups }
    }

    pub fn groups(&self) -> &CapabilityGroups {
        &self.groups
    }

    /// Compute the capability and write it into `ctx`.
    ///
    /// On an oracle failure no capability is left on the context.
    pub async fn annotate<O>(
        &self,
        operation: &str,
        oracle: &O,
        ctx: &mut CallContext,
    ) -> Result<AccessCapability, AccessError>
    where
        O: MembershipOracle + ?Sized,
    {
        let union = self.groups.union();
        ctx.set_access_rights(Some(AccessCapability::default()));

        let evaluated = evaluate_groups(oracle, &union, ctx).await;
        let memberships = match evaluated {
            Ok(memberships) => memberships,
            Err(e) => {
                ctx.set_access_rights(None);
                return Err(e.into());
            }
        };

        let mut rights = AccessCapability::default();
        for group in memberships.granted() {
            if self.groups.read.contains(&group) {
                rights.read = true;
            }
            if self.groups.write.contains(&group) {
                rights.write = true;
            }
        }
        ctx.set_access_rights(Some(rights));

        debug!(
            operation,
            call_id = ctx.call_id(),
            principal = %ctx.principal().id,
            read = rights.read,
            write = rights.write,
            "capability annotated"
        );
        Ok(rights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Principal;
    use crate::group::Group;
    use crate::oracle::StaticOracle;

    fn groups(read: &[Group], write: &[Group]) -> CapabilityGroups {
        CapabilityGroups {
            read: read.iter().copied().collect(),
            write: write.iter().copied().collect(),
        }
    }

    #[test]
    fn test_union_deduplicates() {
        let g = groups(&[Group::HrRu, Group::HrAdmins], &[Group::HrAdmins]);
        assert_eq!(g.union().len(), 2);
    }

    #[tokio::test]
    async fn test_read_only_member() {
        let oracle = StaticOracle::new().with_member("alice", [Group::HrRu]);
        let mut ctx = CallContext::new(Principal::new("alice"));
        let annotator = CapabilityAnnotator::new(groups(&[Group::HrRu], &[Group::HrAdmins]));

        let rights = annotator.annotate("op", &oracle, &mut ctx).await.unwrap();

        let expected = AccessCapability {
            read: true,
            write: false,
        };
        assert_eq!(rights, expected);
        assert_eq!(ctx.access_rights(), Some(expected));
    }

    #[tokio::test]
    async fn test_empty_groups_still_attach_capability() {
        let oracle = StaticOracle::new();
        let mut ctx = CallContext::new(Principal::new("alice"));

        CapabilityAnnotator::default()
            .annotate("op", &oracle, &mut ctx)
            .await
            .unwrap();

        assert_eq!(ctx.access_rights(), Some(AccessCapability::default()));
    }

    #[tokio::test]
    async fn test_reannotation_overwrites_previous_value() {
        let oracle = StaticOracle::new();
        let mut ctx = CallContext::new(Principal::new("alice"));
        ctx.set_access_rights(Some(AccessCapability {
            read: true,
            write: true,
        }));

        CapabilityAnnotator::new(groups(&[Group::HrRu], &[]))
            .annotate("op", &oracle, &mut ctx)
            .await
            .unwrap();

        assert_eq!(ctx.access_rights(), Some(AccessCapability::default()));
    }
}
