//! Interceptor chain placed in front of an operation handler.
//!
//! A protected operation runs its interceptors in declaration order. The first
//! interceptor error ends the call; the handler is invoked only after every
//! interceptor has passed.

use crate::capability::CapabilityAnnotator;
use crate::context::CallContext;
use crate::errors::AccessError;
use crate::gate::Gate;
use crate::oracle::MembershipOracle;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info_span, Instrument};

#[async_trait]
pub trait Interceptor: Send + Sync {
    fn kind(&self) -> &'static str;

    async fn before(
        &self,
        operation: &str,
        oracle: &dyn MembershipOracle,
        ctx: &mut CallContext,
    ) -> Result<(), AccessError>;
}

#[async_trait]
impl Interceptor for Gate {
    fn kind(&self) -> &'static str {
        "gate"
    }

    async fn before(
        &self,
        operation: &str,
        oracle: &dyn MembershipOracle,
        ctx: &mut CallContext,
    ) -> Result<(), AccessError> {
        self.check(operation, oracle, ctx).await
    }
}

#[async_trait]
impl Interceptor for CapabilityAnnotator {
    fn kind(&self) -> &'static str {
        "capability"
    }

    async fn before(
        &self,
        operation: &str,
        oracle: &dyn MembershipOracle,
        ctx: &mut CallContext,
    ) -> Result<(), AccessError> {
        self.annotate(operation, oracle, ctx).await.map(|_| ())
    }
}

/// The real work behind an operation.
#[async_trait]
pub trait OperationHandler: Send + Sync {
    async fn call(&self, ctx: &CallContext, args: Value) -> Result<Value, AccessError>;
}

#[derive(Clone)]
pub struct ProtectedOperation {
    name: String,
    interceptors: Vec<Arc<dyn Interceptor>>,
    handler: Arc<dyn OperationHandler>,
}

impl fmt::Debug for ProtectedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtectedOperation")
            .field("name", &self.name)
            .field(
                "interceptors",
                &self.interceptors.iter().map(|i| i.kind()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl ProtectedOperation {
    pub fn new(name: impl Into<String>, handler: Arc<dyn OperationHandler>) -> Self {
        Self {
            name: name.into(),
            interceptors: Vec::new(),
            handler,
        }
    }

    pub fn with_interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interceptor_kinds(&self) -> Vec<&'static str> {
        self.interceptors.iter().map(|i| i.kind()).collect()
    }

    /// Run the interceptors against `ctx`, then the handler.
    pub async fn invoke(
        &self,
        oracle: &dyn MembershipOracle,
        mut ctx: CallContext,
        args: Value,
    ) -> Result<Value, AccessError> {
        let span = info_span!(
            "operation",
            operation = %self.name,
            call_id = ctx.call_id(),
            principal = %ctx.principal().id,
        );

        async move {
            self.authorize(oracle, &mut ctx).await?;
            self.handler.call(&ctx, args).await
        }
        .instrument(span)
        .await
    }

    /// Run only the interceptors, leaving their annotations on `ctx`.
    pub async fn authorize(
        &self,
        oracle: &dyn MembershipOracle,
        ctx: &mut CallContext,
    ) -> Result<(), AccessError> {
        for interceptor in &self.interceptors {
            if let Err(e) = interceptor.before(&self.name, oracle, ctx).await {
                if e.is_infrastructure() {
                    error!(
                        operation = %self.name,
                        interceptor = interceptor.kind(),
                        error = %e,
                        "authorization system failure"
                    );
                }
                return Err(e);
            }
        }
        Ok(())
    }
}
