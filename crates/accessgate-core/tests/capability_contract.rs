use accessgate_core::{
    AccessCapability, AccessError, CallContext, CapabilityAnnotator, CapabilityGroups, Group,
    MembershipOracle, OperationHandler, OperationRegistry, OracleError, Principal, Schema,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Oracle with per-group answers, per-group call counters and a fixed delay.
struct ScriptedOracle {
    answers: HashMap<Group, Result<bool, ()>>,
    delay: Duration,
    calls: Mutex<HashMap<Group, usize>>,
}

impl ScriptedOracle {
    fn new(answers: &[(Group, Result<bool, ()>)]) -> Self {
        Self {
            answers: answers.iter().cloned().collect(),
            delay: Duration::ZERO,
            calls: Mutex::new(HashMap::new()),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn calls_for(&self, group: Group) -> usize {
        self.calls.lock().unwrap().get(&group).copied().unwrap_or(0)
    }

    fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl MembershipOracle for ScriptedOracle {
    async fn is_member(&self, group: Group, _ctx: &CallContext) -> Result<bool, OracleError> {
        *self.calls.lock().unwrap().entry(group).or_default() += 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.answers.get(&group) {
            Some(Ok(member)) => Ok(*member),
            Some(Err(())) => Err(OracleError::Unavailable {
                group,
                reason: "directory unreachable".to_string(),
            }),
            None => Ok(false),
        }
    }
}

/// Records the capability each call saw.
#[derive(Default)]
struct CapturingHandler {
    seen: Mutex<Vec<Option<AccessCapability>>>,
}

#[async_trait]
impl OperationHandler for CapturingHandler {
    async fn call(&self, ctx: &CallContext, _args: Value) -> Result<Value, AccessError> {
        self.seen.lock().unwrap().push(ctx.access_rights());
        Ok(json!(ctx.access_rights()))
    }
}

const REGISTRY: &str = r#"
operations:
  employeeProfile:
    allowRead: [HR_RU]
    allowWrite: [HR_ADMINS]
  wikiPage:
    allowRead: [WIKI_EDITORS, GENERAL]
    allowWrite: [WIKI_EDITORS]
  bareProfile: {}
  annotatedButEmpty:
    allowRead: []
  selfProfile:
    annotate: true
"#;

fn schema_for(
    operation: &str,
    oracle: Arc<ScriptedOracle>,
    handler: Arc<CapturingHandler>,
) -> Schema {
    let registry = OperationRegistry::from_yaml_str(REGISTRY).unwrap();
    Schema::new(oracle).with_operation(registry.bind(operation, handler).unwrap())
}

fn ctx() -> CallContext {
    CallContext::new(Principal::new("alice"))
}

#[tokio::test]
async fn test_read_member_only_gets_read() {
    let oracle = Arc::new(ScriptedOracle::new(&[
        (Group::HrRu, Ok(true)),
        (Group::HrAdmins, Ok(false)),
    ]));
    let handler = Arc::new(CapturingHandler::default());
    let schema = schema_for("employeeProfile", oracle.clone(), handler.clone());

    let out = schema.call("employeeProfile", ctx(), Value::Null).await.unwrap();

    assert_eq!(out, json!({"read": true, "write": false}));
    assert_eq!(
        *handler.seen.lock().unwrap(),
        vec![Some(AccessCapability {
            read: true,
            write: false
        })]
    );
}

#[tokio::test]
async fn test_group_in_both_lists_is_checked_once() {
    let oracle = Arc::new(ScriptedOracle::new(&[(Group::WikiEditors, Ok(true))]));
    let handler = Arc::new(CapturingHandler::default());
    let schema = schema_for("wikiPage", oracle.clone(), handler.clone());

    let out = schema.call("wikiPage", ctx(), Value::Null).await.unwrap();

    assert_eq!(out, json!({"read": true, "write": true}));
    assert_eq!(oracle.calls_for(Group::WikiEditors), 1);
    assert_eq!(oracle.calls_for(Group::General), 1);
    assert_eq!(oracle.total_calls(), 2);
}

#[tokio::test]
async fn test_empty_lists_still_annotate_and_call_handler() {
    let oracle = Arc::new(ScriptedOracle::new(&[]));
    let handler = Arc::new(CapturingHandler::default());
    let schema = schema_for("annotatedButEmpty", oracle.clone(), handler.clone());

    let out = schema
        .call("annotatedButEmpty", ctx(), Value::Null)
        .await
        .unwrap();

    assert_eq!(out, json!({"read": false, "write": false}));
    assert_eq!(handler.seen.lock().unwrap().len(), 1);
    assert_eq!(oracle.total_calls(), 0);
}

#[tokio::test]
async fn test_absent_lists_on_annotator_yield_no_rights() {
    let oracle = ScriptedOracle::new(&[(Group::SuperUser, Ok(true))]);
    let mut ctx = ctx();

    let rights = CapabilityAnnotator::new(CapabilityGroups::default())
        .annotate("op", &oracle, &mut ctx)
        .await
        .unwrap();

    assert_eq!(rights, AccessCapability::default());
    assert_eq!(ctx.access_rights(), Some(AccessCapability::default()));
}

#[tokio::test]
async fn test_annotated_without_lists_through_registry() {
    let oracle = Arc::new(ScriptedOracle::new(&[(Group::SuperUser, Ok(true))]));
    let handler = Arc::new(CapturingHandler::default());
    let schema = schema_for("selfProfile", oracle.clone(), handler.clone());

    let out = schema.call("selfProfile", ctx(), Value::Null).await.unwrap();

    assert_eq!(out, json!({"read": false, "write": false}));
    assert_eq!(
        *handler.seen.lock().unwrap(),
        vec![Some(AccessCapability::default())]
    );
    assert_eq!(oracle.total_calls(), 0);
}

#[tokio::test]
async fn test_non_member_is_never_blocked() {
    let oracle = Arc::new(ScriptedOracle::new(&[]));
    let handler = Arc::new(CapturingHandler::default());
    let schema = schema_for("employeeProfile", oracle, handler.clone());

    let out = schema.call("employeeProfile", ctx(), Value::Null).await.unwrap();

    assert_eq!(out, json!({"read": false, "write": false}));
    assert_eq!(handler.seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unannotated_operation_has_no_rights() {
    let oracle = Arc::new(ScriptedOracle::new(&[]));
    let handler = Arc::new(CapturingHandler::default());
    let schema = schema_for("bareProfile", oracle, handler.clone());

    schema.call("bareProfile", ctx(), Value::Null).await.unwrap();

    assert_eq!(*handler.seen.lock().unwrap(), vec![None]);
}

#[tokio::test]
async fn test_oracle_failure_skips_handler() {
    let oracle = Arc::new(ScriptedOracle::new(&[
        (Group::HrRu, Ok(true)),
        (Group::HrAdmins, Err(())),
    ]));
    let handler = Arc::new(CapturingHandler::default());
    let schema = schema_for("employeeProfile", oracle.clone(), handler.clone());

    let err = schema
        .call("employeeProfile", ctx(), Value::Null)
        .await
        .unwrap_err();

    assert!(err.is_infrastructure());
    assert!(handler.seen.lock().unwrap().is_empty());
    assert_eq!(oracle.total_calls(), 2);
}

#[tokio::test]
async fn test_oracle_failure_leaves_no_partial_capability() {
    let oracle = ScriptedOracle::new(&[(Group::HrRu, Ok(true)), (Group::HrAdmins, Err(()))]);
    let annotator = CapabilityAnnotator::new(CapabilityGroups {
        read: [Group::HrRu].into_iter().collect(),
        write: [Group::HrAdmins].into_iter().collect(),
    });
    let mut ctx = ctx();

    annotator
        .annotate("employeeProfile", &oracle, &mut ctx)
        .await
        .unwrap_err();

    assert_eq!(ctx.access_rights(), None);
}

#[tokio::test(start_paused = true)]
async fn test_slow_oracle_latency_is_max_not_sum() {
    let oracle = Arc::new(
        ScriptedOracle::new(&[
            (Group::WikiEditors, Ok(false)),
            (Group::General, Ok(true)),
        ])
        .with_delay(Duration::from_millis(300)),
    );
    let handler = Arc::new(CapturingHandler::default());
    let schema = schema_for("wikiPage", oracle, handler);

    let started = tokio::time::Instant::now();
    let out = schema.call("wikiPage", ctx(), Value::Null).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(out, json!({"read": true, "write": false}));
    assert!(elapsed < Duration::from_millis(600), "took {:?}", elapsed);
}

#[tokio::test]
async fn test_concurrent_calls_are_independent() {
    let oracle = Arc::new(ScriptedOracle::new(&[(Group::HrRu, Ok(true))]));
    let handler = Arc::new(CapturingHandler::default());
    let schema = Arc::new(schema_for("employeeProfile", oracle, handler.clone()));

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..16 {
        let schema = schema.clone();
        tasks.spawn(async move {
            let ctx = CallContext::new(Principal::new(format!("user-{i}")));
            schema.call("employeeProfile", ctx, Value::Null).await
        });
    }
    while let Some(res) = tasks.join_next().await {
        assert_eq!(res.unwrap().unwrap(), json!({"read": true, "write": false}));
    }
    assert_eq!(handler.seen.lock().unwrap().len(), 16);
}
