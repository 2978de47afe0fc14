//! Operation registry: declared authorization metadata per operation, and the
//! dispatcher that serves calls through it.
//!
//! Declarations are validated when they are loaded. An unknown group name or a
//! gate with no groups is a startup failure, never a per-call surprise.
//!
//! ```yaml
//! operations:
//!   getMembersOf:
//!     allowedGroups: [SUPER_USER]
//!   employeeProfile:
//!     allowRead: [HR_RU]
//!     allowWrite: [HR_ADMINS]
//!   selfProfile:
//!     annotate: true
//!   isAuthenticated: {}
//! ```
//!
//! `annotate: true` marks an operation as annotated when both lists are
//! absent; the caller then always sees `{read: false, write: false}`.

use crate::capability::{CapabilityAnnotator, CapabilityGroups};
use crate::context::CallContext;
use crate::errors::{AccessError, ConfigError};
use crate::gate::{Gate, RequiredGroups};
use crate::group::{Group, GroupSet};
use crate::interceptor::{Interceptor, OperationHandler, ProtectedOperation};
use crate::oracle::MembershipOracle;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// One operation as written in a registry file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OperationDecl {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_groups: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_read: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_write: Option<Vec<String>>,
    /// Attach `access_rights` even when neither list is given.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub annotate: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RegistryFile {
    #[serde(default)]
    operations: BTreeMap<String, Option<OperationDecl>>,
}

/// Validated authorization for one operation. The gate, when present, runs
/// before the capability annotation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationPolicy {
    pub gate: Option<RequiredGroups>,
    pub capability: Option<CapabilityGroups>,
}

impl OperationPolicy {
    pub fn unguarded() -> Self {
        Self::default()
    }

    pub fn gated(required: RequiredGroups) -> Self {
        Self {
            gate: Some(required),
            capability: None,
        }
    }

    pub fn annotated(groups: CapabilityGroups) -> Self {
        Self {
            gate: None,
            capability: Some(groups),
        }
    }

    pub fn from_decl(operation: &str, decl: &OperationDecl) -> Result<Self, ConfigError> {
        let gate = match &decl.allowed_groups {
            Some(names) => Some(RequiredGroups::new(
                operation,
                parse_groups(operation, names)?,
            )?),
            None => None,
        };

        let capability = if decl.annotate || decl.allow_read.is_some() || decl.allow_write.is_some() {
            let read = parse_groups(operation, decl.allow_read.as_deref().unwrap_or_default())?;
            let write = parse_groups(operation, decl.allow_write.as_deref().unwrap_or_default())?;
            Some(CapabilityGroups { read, write })
        } else {
            None
        };

        Ok(Self { gate, capability })
    }

    pub fn is_unguarded(&self) -> bool {
        self.gate.is_none() && self.capability.is_none()
    }

    /// Every group this operation can ask the oracle about.
    pub fn groups(&self) -> GroupSet {
        let mut groups = GroupSet::new();
        if let Some(required) = &self.gate {
            groups.extend(required.groups().iter().copied());
        }
        if let Some(capability) = &self.capability {
            groups.extend(capability.union());
        }
        groups
    }

    fn interceptors(&self) -> Vec<Arc<dyn Interceptor>> {
        let mut chain: Vec<Arc<dyn Interceptor>> = Vec::new();
        if let Some(required) = &self.gate {
            chain.push(Arc::new(Gate::new(required.clone())));
        }
        if let Some(groups) = &self.capability {
            chain.push(Arc::new(CapabilityAnnotator::new(groups.clone())));
        }
        chain
    }
}

fn parse_groups(operation: &str, names: &[String]) -> Result<GroupSet, ConfigError> {
    names
        .iter()
        .map(|name| {
            name.parse::<Group>()
                .map_err(|_| ConfigError::UnknownGroup {
                    operation: operation.to_string(),
                    name: name.clone(),
                })
        })
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct OperationRegistry {
    operations: BTreeMap<String, OperationPolicy>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(mut self, operation: impl Into<String>, policy: OperationPolicy) -> Self {
        self.operations.insert(operation.into(), policy);
        self
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let file: RegistryFile = serde_yaml::from_str(content)?;
        let mut operations = BTreeMap::new();
        for (name, decl) in file.operations {
            let policy = OperationPolicy::from_decl(&name, &decl.unwrap_or_default())?;
            operations.insert(name, policy);
        }
        Ok(Self { operations })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn get(&self, operation: &str) -> Option<&OperationPolicy> {
        self.operations.get(operation)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OperationPolicy)> {
        self.operations.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Wrap `handler` with the interceptors declared for `operation`.
    pub fn bind(
        &self,
        operation: &str,
        handler: Arc<dyn OperationHandler>,
    ) -> Result<ProtectedOperation, ConfigError> {
        let policy = self
            .get(operation)
            .ok_or_else(|| ConfigError::UndeclaredOperation(operation.to_string()))?;

        let protected = policy
            .interceptors()
            .into_iter()
            .fold(ProtectedOperation::new(operation, handler), |op, i| {
                op.with_interceptor(i)
            });
        debug!(
            operation,
            interceptors = ?protected.interceptor_kinds(),
            "operation bound"
        );
        Ok(protected)
    }
}

/// Dispatches calls by operation name through their protected wrappers.
#[derive(Clone)]
pub struct Schema {
    oracle: Arc<dyn MembershipOracle>,
    operations: BTreeMap<String, ProtectedOperation>,
}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("operations", &self.operations)
            .finish_non_exhaustive()
    }
}

impl Schema {
    pub fn new(oracle: Arc<dyn MembershipOracle>) -> Self {
        Self {
            oracle,
            operations: BTreeMap::new(),
        }
    }

    pub fn with_operation(mut self, operation: ProtectedOperation) -> Self {
        self.operations
            .insert(operation.name().to_string(), operation);
        self
    }

    pub fn operation(&self, name: &str) -> Option<&ProtectedOperation> {
        self.operations.get(name)
    }

    pub fn oracle(&self) -> &dyn MembershipOracle {
        self.oracle.as_ref()
    }

    pub async fn call(
        &self,
        operation: &str,
        ctx: CallContext,
        args: Value,
    ) -> Result<Value, AccessError> {
        let protected = self
            .operations
            .get(operation)
            .ok_or_else(|| AccessError::UnknownOperation(operation.to_string()))?;
        protected.invoke(self.oracle.as_ref(), ctx, args).await
    }
}
