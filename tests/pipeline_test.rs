use message_interceptor::pipeline::{PIPELINE_ABORTED_BY_ATTRIBUTE, PIPELINE_ERROR_ATTRIBUTE};
use message_interceptor::{
    ChainState, Context, InterceptorChain, InterceptorError, Message, PipelineDispatcher, PipelineInterceptor,
};
use serde_json::json;
use std::sync::{Arc, Mutex};

type CallLog = Arc<Mutex<Vec<String>>>;

enum Behavior {
    // chain.proceed 호출
    Continue,
    // 체인을 멈추고 false 반환
    Stop,
    // 체인을 멈추고 오류 반환
    Fail,
    Panic,
    // 메시지를 바꿔서 진행
    Rename(&'static str),
}

struct Step {
    name: String,
    log: CallLog,
    behavior: Behavior,
}

impl Step {
    fn new(name: &str, log: &CallLog, behavior: Behavior) -> Self {
        Self {
            name: name.to_string(),
            log: Arc::clone(log),
            behavior,
        }
    }
}

impl PipelineInterceptor for Step {
    fn name(&self) -> &str {
        &self.name
    }

    fn intercept(
        &self,
        message: Message,
        context: &mut Context,
        chain: &mut InterceptorChain,
    ) -> Result<bool, InterceptorError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:{}", self.name, message.kind()));
        match self.behavior {
            Behavior::Continue => chain.proceed(message, context),
            Behavior::Stop => Ok(false),
            Behavior::Fail => Err(InterceptorError::execution(&self.name, "broken step")),
            Behavior::Panic => panic!("step exploded"),
            Behavior::Rename(kind) => chain.proceed(message.with_kind(kind), context),
        }
    }
}

/// 체인 상태를 기록한 뒤 결과를 설정하는 마지막 단계
struct Terminal;

impl PipelineInterceptor for Terminal {
    fn name(&self) -> &str {
        "terminal"
    }

    fn intercept(
        &self,
        message: Message,
        context: &mut Context,
        chain: &mut InterceptorChain,
    ) -> Result<bool, InterceptorError> {
        context.set_attribute("terminal.exhausted", chain.state() == ChainState::Exhausted);
        context.set_attribute("terminal.remaining", chain.remaining());
        context.set_result(json!({ "kind": message.kind(), "payload": message.payload() }));
        chain.proceed(message, context)
    }
}

fn calls(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

#[test]
fn test_empty_pipeline_succeeds_without_side_effects() {
    let pipeline = PipelineDispatcher::new();
    let mut context = Context::new();

    assert!(pipeline.process(Message::new("anything", json!(null)), &mut context));
    assert_eq!(context.attribute_count(), 0);
    assert!(context.result().is_none());
    assert!(context.is_successful());
}

#[test]
fn test_chain_runs_every_interceptor_in_order() {
    let log = CallLog::default();
    let pipeline = PipelineDispatcher::named("ordered");
    pipeline.register(Step::new("a", &log, Behavior::Continue));
    pipeline.register(Step::new("b", &log, Behavior::Continue));
    pipeline.register(Terminal);

    let mut context = Context::new();
    assert!(pipeline.process(Message::new("ping", json!(1)), &mut context));

    assert_eq!(calls(&log), vec!["a:ping", "b:ping"]);
    assert_eq!(context.attribute_as::<bool>("terminal.exhausted"), Some(true));
    assert_eq!(context.attribute_as::<usize>("terminal.remaining"), Some(0));
    assert_eq!(context.result(), Some(&json!({"kind": "ping", "payload": 1})));
    assert!(context.is_completed());
}

#[test]
fn test_short_circuit_skips_the_rest() {
    let log = CallLog::default();
    let pipeline = PipelineDispatcher::new();
    pipeline.register(Step::new("a", &log, Behavior::Continue));
    pipeline.register(Step::new("gate", &log, Behavior::Stop));
    pipeline.register(Step::new("c", &log, Behavior::Continue));

    let mut context = Context::new();
    assert!(!pipeline.process(Message::new("ping", json!(1)), &mut context));

    assert_eq!(calls(&log), vec!["a:ping", "gate:ping"]);
    assert!(!context.is_successful());
    assert!(!context.has_attribute(PIPELINE_ERROR_ATTRIBUTE));
    assert_eq!(
        context.attribute_as::<String>(PIPELINE_ABORTED_BY_ATTRIBUTE).as_deref(),
        Some("gate")
    );
}

/// 아무 속성도 남기지 않고 체인을 멈추는 인터셉터
struct Reject;

impl PipelineInterceptor for Reject {
    fn name(&self) -> &str {
        "reject"
    }

    fn intercept(
        &self,
        _message: Message,
        _context: &mut Context,
        _chain: &mut InterceptorChain,
    ) -> Result<bool, InterceptorError> {
        Ok(false)
    }
}

#[test]
fn test_silent_stop_leaves_a_cause_in_context() {
    let pipeline = PipelineDispatcher::new();
    pipeline.register(Reject);
    pipeline.register(Terminal);

    let mut context = Context::new();
    assert!(!pipeline.process(Message::new("ping", json!(1)), &mut context));

    assert_eq!(context.attribute_count(), 1);
    assert_eq!(
        context.attribute_as::<String>(PIPELINE_ABORTED_BY_ATTRIBUTE).as_deref(),
        Some("reject")
    );
    assert!(context.result().is_none());
}

#[test]
fn test_successful_run_records_no_abort() {
    let log = CallLog::default();
    let pipeline = PipelineDispatcher::new();
    pipeline.register(Step::new("a", &log, Behavior::Continue));

    let mut context = Context::new();
    assert!(pipeline.process(Message::new("ping", json!(1)), &mut context));
    assert!(!context.has_attribute(PIPELINE_ABORTED_BY_ATTRIBUTE));
}

#[test]
fn test_downstream_sees_substituted_message() {
    let log = CallLog::default();
    let pipeline = PipelineDispatcher::new();
    pipeline.register(Step::new("rename", &log, Behavior::Rename("renamed")));
    pipeline.register(Step::new("after", &log, Behavior::Continue));
    pipeline.register(Terminal);

    let mut context = Context::new();
    assert!(pipeline.process(Message::new("original", json!("body")), &mut context));

    assert_eq!(calls(&log), vec!["rename:original", "after:renamed"]);
    assert_eq!(context.result_as::<serde_json::Value>().unwrap()["kind"], "renamed");
}

#[test]
fn test_interceptor_error_becomes_false_with_error_attribute() {
    let log = CallLog::default();
    let pipeline = PipelineDispatcher::new();
    pipeline.register(Step::new("a", &log, Behavior::Continue));
    pipeline.register(Step::new("broken", &log, Behavior::Fail));
    pipeline.register(Step::new("c", &log, Behavior::Continue));

    let mut context = Context::new();
    assert!(!pipeline.process(Message::new("ping", json!(1)), &mut context));

    assert_eq!(calls(&log), vec!["a:ping", "broken:ping"]);
    let error = context.attribute_as::<String>(PIPELINE_ERROR_ATTRIBUTE).unwrap();
    assert!(error.contains("broken step"));
    assert!(!context.is_successful());
}

#[test]
fn test_panicking_interceptor_is_contained() {
    let log = CallLog::default();
    let pipeline = PipelineDispatcher::new();
    pipeline.register(Step::new("explodes", &log, Behavior::Panic));

    let mut context = Context::new();
    assert!(!pipeline.process(Message::new("ping", json!(1)), &mut context));

    let error = context.attribute_as::<String>(PIPELINE_ERROR_ATTRIBUTE).unwrap();
    assert!(error.contains("step exploded"));
}

#[test]
fn test_process_and_transform_projects_only_on_success() {
    let log = CallLog::default();
    let pipeline = PipelineDispatcher::new();
    pipeline.register(Step::new("a", &log, Behavior::Continue));
    pipeline.register(Terminal);

    let mut context = Context::new();
    let kind = pipeline.process_and_transform(Message::new("order", json!(5)), &mut context, |ctx| {
        ctx.result().and_then(|r| r["kind"].as_str().map(str::to_string))
    });
    assert_eq!(kind.as_deref(), Some("order"));

    let failing = PipelineDispatcher::new();
    failing.register(Step::new("gate", &log, Behavior::Stop));
    let mut context = Context::new();
    let projected: Option<i32> =
        failing.process_and_transform(Message::new("order", json!(5)), &mut context, |_| Some(1));
    assert!(projected.is_none());
}

#[test]
fn test_each_process_uses_a_fresh_chain() {
    let log = CallLog::default();
    let pipeline = PipelineDispatcher::new();
    pipeline.register(Step::new("a", &log, Behavior::Continue));

    for _ in 0..3 {
        let mut context = Context::new();
        assert!(pipeline.process(Message::new("tick", json!(null)), &mut context));
    }
    assert_eq!(calls(&log).len(), 3);
}

/// 실행 중에 자신이 속한 파이프라인에 새 인터셉터를 등록하는 단계
struct SelfModifying {
    pipeline: Arc<PipelineDispatcher>,
    log: CallLog,
}

impl PipelineInterceptor for SelfModifying {
    fn name(&self) -> &str {
        "self-modifying"
    }

    fn intercept(
        &self,
        message: Message,
        context: &mut Context,
        chain: &mut InterceptorChain,
    ) -> Result<bool, InterceptorError> {
        if self.pipeline.len() == 1 {
            self.pipeline.register(Step::new("late", &self.log, Behavior::Continue));
        }
        chain.proceed(message, context)
    }
}

#[test]
fn test_registration_during_execution_applies_to_next_run() {
    let log = CallLog::default();
    let pipeline = Arc::new(PipelineDispatcher::new());
    pipeline.register(SelfModifying {
        pipeline: Arc::clone(&pipeline),
        log: Arc::clone(&log),
    });

    let mut context = Context::new();
    assert!(pipeline.process(Message::new("first", json!(null)), &mut context));
    assert!(calls(&log).is_empty());
    assert_eq!(pipeline.len(), 2);

    let mut context = Context::new();
    assert!(pipeline.process(Message::new("second", json!(null)), &mut context));
    assert_eq!(calls(&log), vec!["late:second"]);
}

#[test]
fn test_unregister_removes_interceptor() {
    let log = CallLog::default();
    let pipeline = PipelineDispatcher::new();
    let a = pipeline.register(Step::new("a", &log, Behavior::Continue));
    pipeline.register(Step::new("b", &log, Behavior::Continue));

    assert!(!pipeline.register_shared(Arc::clone(&a)));
    assert!(pipeline.unregister(&a));
    assert_eq!(pipeline.interceptor_names(), vec!["b"]);
}
