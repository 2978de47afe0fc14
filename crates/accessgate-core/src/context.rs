//! Per-invocation call context.

use serde::{Deserialize, Serialize};

/// Identity attached to an incoming call. Authentication happened upstream;
/// the evaluator never inspects this beyond handing it to the oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// Read/write capability computed for a single call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessCapability {
    pub read: bool,
    pub write: bool,
}

/// Mutable state threaded through one operation invocation.
///
/// Owned exclusively by its call; never shared across invocations.
#[derive(Debug, Clone)]
pub struct CallContext {
    call_id: String,
    principal: Principal,
    access_rights: Option<AccessCapability>,
}

impl CallContext {
    pub fn new(principal: Principal) -> Self {
        Self {
            call_id: format!("call_{}", uuid::Uuid::new_v4()),
            principal,
            access_rights: None,
        }
    }

    pub fn with_call_id(mut self, call_id: impl Into<String>) -> Self {
        self.call_id = call_id.into();
        self
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Capability written by the annotator. `None` when the operation is not
    /// capability-annotated.
    pub fn access_rights(&self) -> Option<AccessCapability> {
        self.access_rights
    }

    pub(crate) fn set_access_rights(&mut self, rights: Option<AccessCapability>) {
        self.access_rights = rights;
    }
}
