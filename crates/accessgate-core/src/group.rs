//! Closed set of authorization groups.
//!
//! Groups are never free-form strings inside the evaluator: a typo in a
//! declaration must fail at load time instead of silently evaluating to
//! "never a member".

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Group {
    General,
    GeneralExcMe,
    Me,
    TechPortal,
    HrRu,
    WikiEditors,
    HrEditors,
    HrAdmins,
    Reviewers,
    DevelopmentPlanReviewers,
    MatricesReviewers,
    Feedback,
    WorkspacePlanner,
    SysAdmins,
    SuperUser,
    Librarian,
    AadCreators,
    AadUserEditors,
    AadGroupEditors,
    AgileManagers,
}

impl Group {
    pub const ALL: [Group; 20] = [
        Group::General,
        Group::GeneralExcMe,
        Group::Me,
        Group::TechPortal,
        Group::HrRu,
        Group::WikiEditors,
        Group::HrEditors,
        Group::HrAdmins,
        Group::Reviewers,
        Group::DevelopmentPlanReviewers,
        Group::MatricesReviewers,
        Group::Feedback,
        Group::WorkspacePlanner,
        Group::SysAdmins,
        Group::SuperUser,
        Group::Librarian,
        Group::AadCreators,
        Group::AadUserEditors,
        Group::AadGroupEditors,
        Group::AgileManagers,
    ];

    /// Declared spelling, as used in registry files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "GENERAL",
            Self::GeneralExcMe => "GENERAL_EXC_ME",
            Self::Me => "ME",
            Self::TechPortal => "TECH_PORTAL",
            Self::HrRu => "HR_RU",
            Self::WikiEditors => "WIKI_EDITORS",
            Self::HrEditors => "HR_EDITORS",
            Self::HrAdmins => "HR_ADMINS",
            Self::Reviewers => "REVIEWERS",
            Self::DevelopmentPlanReviewers => "DEVELOPMENT_PLAN_REVIEWERS",
            Self::MatricesReviewers => "MATRICES_REVIEWERS",
            Self::Feedback => "FEEDBACK",
            Self::WorkspacePlanner => "WORKSPACE_PLANNER",
            Self::SysAdmins => "SYS_ADMINS",
            Self::SuperUser => "SUPER_USER",
            Self::Librarian => "LIBRARIAN",
            Self::AadCreators => "AAD_CREATORS",
            Self::AadUserEditors => "AAD_USER_EDITORS",
            Self::AadGroupEditors => "AAD_GROUP_EDITORS",
            Self::AgileManagers => "AGILE_MANAGERS",
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown group '{0}'")]
pub struct UnknownGroup(pub String);

impl FromStr for Group {
    type Err = UnknownGroup;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Group::ALL
            .iter()
            .copied()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| UnknownGroup(s.to_string()))
    }
}

/// Deduplicated set of groups. Ordering only makes logs and error
/// selection deterministic; it carries no meaning.
pub type GroupSet = BTreeSet<Group>;
