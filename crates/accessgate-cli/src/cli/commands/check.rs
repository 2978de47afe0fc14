use std::sync::Arc;

use accessgate_core::{
    AccessCapability, AccessError, AccessgateConfig, CallContext, ConfigError, MembershipOracle,
    OperationHandler, OperationRegistry, Principal,
};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::cli::args::CheckArgs;
use crate::exit_codes;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Deny,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct DecisionReport {
    pub operation: String,
    pub principal: String,
    pub decision: Decision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_rights: Option<AccessCapability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl DecisionReport {
    pub fn exit_code(&self) -> i32 {
        match self.decision {
            Decision::Allow => exit_codes::SUCCESS,
            Decision::Deny => exit_codes::DENIED,
            Decision::Error => exit_codes::INFRA_ERROR,
        }
    }
}

/// Stands in for the real handler; `check` only runs the interceptors.
struct DryRun;

#[async_trait]
impl OperationHandler for DryRun {
    async fn call(&self, _ctx: &CallContext, _args: Value) -> Result<Value, AccessError> {
        Ok(Value::Null)
    }
}

pub async fn run(args: CheckArgs) -> anyhow::Result<i32> {
    let loaded = OperationRegistry::from_file(&args.registry).and_then(|registry| {
        let config = AccessgateConfig::from_file(&args.config)?.apply_env()?;
        Ok((registry, config.build_oracle()?))
    });
    let (registry, oracle) = match loaded {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("error: {}", e);
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };

    let report = match evaluate(&registry, oracle.as_ref(), &args.operation, &args.principal).await
    {
        Ok(report) => report,
        Err(e) => {
            eprintln!("error: {}", e);
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };

    match report.decision {
        Decision::Allow => info!(
            operation = %report.operation,
            principal = %report.principal,
            "check allowed"
        ),
        Decision::Deny => warn!(
            operation = %report.operation,
            principal = %report.principal,
            "check denied"
        ),
        Decision::Error => error!(
            operation = %report.operation,
            principal = %report.principal,
            reason = report.reason.as_deref().unwrap_or_default(),
            "check could not be decided"
        ),
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(report.exit_code())
}

pub async fn evaluate(
    registry: &OperationRegistry,
    oracle: &dyn MembershipOracle,
    operation: &str,
    principal: &str,
) -> Result<DecisionReport, ConfigError> {
    let protected = registry.bind(operation, Arc::new(DryRun))?;
    let mut ctx = CallContext::new(Principal::new(principal));

    let (decision, reason) = match protected.authorize(oracle, &mut ctx).await {
        Ok(()) => (Decision::Allow, None),
        Err(e) if e.is_forbidden() => (Decision::Deny, Some(e.to_string())),
        Err(e) => (Decision::Error, Some(e.to_string())),
    };

    Ok(DecisionReport {
        operation: operation.to_string(),
        principal: principal.to_string(),
        decision,
        access_rights: ctx.access_rights(),
        reason,
    })
}
