//! Access-group administration operations served behind the registry.

use crate::context::CallContext;
use crate::errors::{AccessError, ConfigError};
use crate::gate::RequiredGroups;
use crate::group::Group;
use crate::interceptor::OperationHandler;
use crate::oracle::MembershipOracle;
use crate::registry::{OperationPolicy, OperationRegistry, Schema};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub const GET_MEMBERS_OF: &str = "getMembersOf";
pub const UPDATE_ACCESS_GROUP: &str = "updateAccessGroup";
pub const IS_AUTHENTICATED: &str = "isAuthenticated";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Employee {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: None,
        }
    }
}

/// Storage for access-group rosters.
#[async_trait]
pub trait MemberStore: Send + Sync {
    async fn members_of(&self, group: &str) -> anyhow::Result<Vec<Employee>>;

    async fn set_members(&self, group: &str, members: &[String]) -> anyhow::Result<()>;
}

#[derive(Debug, Default)]
pub struct InMemoryMemberStore {
    employees: RwLock<BTreeMap<String, Employee>>,
    groups: RwLock<BTreeMap<String, Vec<String>>>,
}

impl InMemoryMemberStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_employee(&self, employee: Employee) {
        self.employees
            .write()
            .await
            .insert(employee.id.clone(), employee);
    }
}

#[async_trait]
impl MemberStore for InMemoryMemberStore {
    /// Roster ids with no employee record are skipped.
    async fn members_of(&self, group: &str) -> anyhow::Result<Vec<Employee>> {
        let groups = self.groups.read().await;
        let Some(ids) = groups.get(group) else {
            return Ok(Vec::new());
        };
        let employees = self.employees.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| employees.get(id).cloned())
            .collect())
    }

    async fn set_members(&self, group: &str, members: &[String]) -> anyhow::Result<()> {
        self.groups
            .write()
            .await
            .insert(group.to_string(), members.to_vec());
        Ok(())
    }
}

fn parse_args<T: DeserializeOwned>(operation: &str, args: Value) -> Result<T, AccessError> {
    serde_json::from_value(args).map_err(|e| AccessError::InvalidArguments {
        operation: operation.to_string(),
        reason: e.to_string(),
    })
}

#[derive(Debug, Deserialize)]
struct GetMembersOfArgs {
    group: String,
}

pub struct GetMembersOf {
    store: Arc<dyn MemberStore>,
}

impl GetMembersOf {
    pub fn new(store: Arc<dyn MemberStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl OperationHandler for GetMembersOf {
    async fn call(&self, _ctx: &CallContext, args: Value) -> Result<Value, AccessError> {
        let args: GetMembersOfArgs = parse_args(GET_MEMBERS_OF, args)?;
        let members = self
            .store
            .members_of(&args.group)
            .await
            .map_err(AccessError::Handler)?;
        serde_json::to_value(members).map_err(|e| AccessError::Handler(e.into()))
    }
}

#[derive(Debug, Deserialize)]
pub struct AccessGroupInput {
    pub name: String,
    #[serde(default)]
    pub members: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct UpdateAccessGroupArgs {
    input: AccessGroupInput,
}

pub struct UpdateAccessGroup {
    store: Arc<dyn MemberStore>,
}

impl UpdateAccessGroup {
    pub fn new(store: Arc<dyn MemberStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl OperationHandler for UpdateAccessGroup {
    /// Replaces the roster and returns the group name. Without `members`
    /// nothing is written and the result is `null`.
    async fn call(&self, _ctx: &CallContext, args: Value) -> Result<Value, AccessError> {
        let UpdateAccessGroupArgs { input } = parse_args(UPDATE_ACCESS_GROUP, args)?;
        let Some(members) = input.members else {
            return Ok(Value::Null);
        };
        self.store
            .set_members(&input.name, &members)
            .await
            .map_err(AccessError::Handler)?;
        Ok(Value::String(input.name))
    }
}

/// Liveness probe for an already-authenticated caller.
pub struct IsAuthenticated;

#[async_trait]
impl OperationHandler for IsAuthenticated {
    async fn call(&self, _ctx: &CallContext, _args: Value) -> Result<Value, AccessError> {
        Ok(Value::Bool(true))
    }
}

pub fn default_registry() -> OperationRegistry {
    OperationRegistry::new()
        .declare(
            GET_MEMBERS_OF,
            OperationPolicy::gated(RequiredGroups::one(Group::SuperUser)),
        )
        .declare(
            UPDATE_ACCESS_GROUP,
            OperationPolicy::gated(RequiredGroups::one(Group::SuperUser)),
        )
        .declare(IS_AUTHENTICATED, OperationPolicy::unguarded())
}

/// Bind the access-group operations against `registry`.
pub fn build_schema(
    registry: &OperationRegistry,
    store: Arc<dyn MemberStore>,
    oracle: Arc<dyn MembershipOracle>,
) -> Result<Schema, ConfigError> {
    Ok(Schema::new(oracle)
        .with_operation(registry.bind(GET_MEMBERS_OF, Arc::new(GetMembersOf::new(store.clone())))?)
        .with_operation(registry.bind(UPDATE_ACCESS_GROUP, Arc::new(UpdateAccessGroup::new(store)))?)
        .with_operation(registry.bind(IS_AUTHENTICATED, Arc::new(IsAuthenticated))?))
}
