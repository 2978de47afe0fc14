//! Group-membership access control for named operations.
//!
//! Two protection modes share one mechanism: intercept an operation call,
//! check the caller's membership in a set of groups concurrently, then either
//! block the call ([`Gate`]) or attach a `{read, write}` capability to the call
//! context ([`CapabilityAnnotator`]) before the real handler runs.
//!
//! ```text
//! OperationRegistry ──bind──▶ ProtectedOperation [Gate?, CapabilityAnnotator?] ──▶ handler
//!                                     │
//!                                     └─ evaluate_groups ─ join_all ─▶ MembershipOracle
//! ```

pub mod capability;
pub mod config;
pub mod context;
pub mod errors;
pub mod evaluator;
pub mod gate;
pub mod group;
pub mod interceptor;
pub mod operations;
pub mod oracle;
pub mod registry;

pub use capability::{CapabilityAnnotator, CapabilityGroups};
pub use config::{AccessgateConfig, DirectoryConfig};
pub use context::{AccessCapability, CallContext, Principal};
pub use errors::{AccessError, ConfigError, OracleError, FORBIDDEN_MESSAGE};
pub use evaluator::{evaluate_groups, Memberships};
pub use gate::{Gate, RequiredGroups};
pub use group::{Group, GroupSet};
pub use interceptor::{Interceptor, OperationHandler, ProtectedOperation};
pub use oracle::{DirectoryOracle, MembershipOracle, StaticOracle, TimeoutOracle};
pub use registry::{OperationDecl, OperationPolicy, OperationRegistry, Schema};
