use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, debug_span, error, info, warn};

use crate::context::Context;
use crate::interceptor::{panic_message, Interceptor, OperationError, Registry};
use crate::logging::{log_execution, ExecutionLog};
use super::DispatchError;

/// 어떤 인터셉터가 전처리에서 실행을 중단시켰는지
pub const ABORTED_BY_ATTRIBUTE: &str = "dispatch.aborted_by";
/// 사람이 읽을 수 있는 실패 원인
pub const ERROR_ATTRIBUTE: &str = "dispatch.error";
/// 작업 오류가 인터셉터에 의해 처리되었는지
pub const EXCEPTION_HANDLED_ATTRIBUTE: &str = "dispatch.exception_handled";
/// 작업 오류를 처리한 인터셉터 이름
pub const EXCEPTION_HANDLER_ATTRIBUTE: &str = "dispatch.exception_handler";
/// 후처리 실패 기록 접두사 (`dispatch.post_process.error.<name>`)
pub const POST_PROCESS_ERROR_PREFIX: &str = "dispatch.post_process.error.";

/// 디스패치 진행 단계
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPhase {
    Idle,
    PreProcessing,
    Executing,
    Success,
    HandlingException,
    PostProcessing,
    Done,
}

/// 선형 모델의 디스패처
///
/// 등록된 인터셉터를 전처리(등록 순) → 작업 실행 → 오류 처리(등록 순, 첫 번째
/// 처리자 우선) → 후처리(등록 역순) 순서로 호출합니다. 각 디스패치는 시작 시점의
/// 인터셉터 스냅샷으로 동작하므로 실행 중 등록/해제는 다음 디스패치부터 반영됩니다.
#[derive(Debug)]
pub struct Dispatcher {
    name: String,
    interceptors: Registry<dyn Interceptor>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::named("dispatcher")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interceptors: Registry::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 인터셉터를 등록하고 등록된 핸들을 반환합니다.
    ///
    /// 반환된 `Arc`는 `unregister`에 사용할 수 있습니다.
    pub fn register<I: Interceptor + 'static>(&self, interceptor: I) -> Arc<dyn Interceptor> {
        let interceptor: Arc<dyn Interceptor> = Arc::new(interceptor);
        self.register_shared(Arc::clone(&interceptor));
        interceptor
    }

    /// 이미 공유 중인 인터셉터를 등록합니다. 같은 인스턴스는 한 번만 등록됩니다.
    pub fn register_shared(&self, interceptor: Arc<dyn Interceptor>) -> bool {
        let name = interceptor.name().to_string();
        let registered = self.interceptors.register(interceptor);
        if registered {
            debug!(dispatcher = %self.name, interceptor = %name, "인터셉터 등록");
        } else {
            warn!(dispatcher = %self.name, interceptor = %name, "이미 등록된 인터셉터");
        }
        registered
    }

    pub fn unregister(&self, interceptor: &Arc<dyn Interceptor>) -> bool {
        let removed = self.interceptors.unregister(interceptor);
        if removed {
            debug!(dispatcher = %self.name, interceptor = %interceptor.name(), "인터셉터 해제");
        }
        removed
    }

    /// 인터셉터 목록 전체를 원자적으로 교체합니다.
    pub fn replace_all(&self, interceptors: Vec<Arc<dyn Interceptor>>) {
        debug!(dispatcher = %self.name, count = interceptors.len(), "인터셉터 목록 교체");
        self.interceptors.replace(interceptors);
    }

    pub fn interceptor_names(&self) -> Vec<String> {
        self.interceptors
            .snapshot()
            .iter()
            .map(|i| i.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// 인터셉터 체인으로 감싸 작업을 실행합니다.
    ///
    /// 반환값은 컨텍스트의 최종 성공 여부입니다. 인터셉터의 패닉은 오류와 같이
    /// 취급됩니다(전처리는 중단, 후처리는 기록 후 계속). 작업 오류를 어떤 인터셉터도
    /// 처리하지 않으면 `DispatchError::Unhandled`가 반환되고 후처리는 실행되지
    /// 않습니다. 작업 오류가 처리된 경우에도 후처리는 실행되지 않습니다.
    ///
    /// ```
    /// use message_interceptor::{Context, Dispatcher};
    /// use serde_json::json;
    ///
    /// let dispatcher = Dispatcher::new();
    /// let mut context = Context::with_input(2);
    /// let ok = dispatcher
    ///     .dispatch(&mut context, |ctx| {
    ///         let n = ctx.input().and_then(|v| v.as_i64()).unwrap_or(0);
    ///         Ok(json!(n * 21))
    ///     })
    ///     .unwrap();
    /// assert!(ok);
    /// assert_eq!(context.result(), Some(&json!(42)));
    /// ```
    pub fn dispatch<F>(&self, context: &mut Context, operation: F) -> Result<bool, DispatchError>
    where
        F: FnOnce(&mut Context) -> Result<Value, OperationError>,
    {
        let span = debug_span!(
            "dispatch",
            dispatcher = %self.name,
            execution_id = %context.execution_id()
        );
        let _enter = span.enter();

        let interceptors = self.interceptors.snapshot();
        let mut phase = DispatchPhase::Idle;
        debug!(?phase, count = interceptors.len(), "디스패치 시작");

        phase = DispatchPhase::PreProcessing;
        debug!(?phase);
        for interceptor in interceptors.iter() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| interceptor.pre_process(context)));
            let proceed = match outcome {
                Ok(Ok(proceed)) => proceed,
                Ok(Err(e)) => {
                    error!(interceptor = %interceptor.name(), error = %e, "전처리 실패");
                    context.set_attribute(ERROR_ATTRIBUTE, e.to_string());
                    false
                }
                Err(payload) => {
                    let reason = panic_message(payload.as_ref());
                    error!(interceptor = %interceptor.name(), error = %reason, "전처리 중 패닉");
                    context.set_attribute(ERROR_ATTRIBUTE, format!("panic: {}", reason));
                    false
                }
            };
            if !proceed {
                info!(interceptor = %interceptor.name(), "전처리에서 실행 중단");
                context.set_attribute(ABORTED_BY_ATTRIBUTE, interceptor.name());
                context.set_successful(false);
                context.complete();
                self.finish(context, DispatchPhase::Done);
                return Ok(false);
            }
        }

        phase = DispatchPhase::Executing;
        debug!(?phase);
        match operation(context) {
            Ok(result) => {
                context.set_result(result);
                context.complete();
                context.set_successful(true);
                phase = DispatchPhase::Success;
                debug!(?phase);
            }
            Err(operation_error) => {
                context.complete();
                context.set_successful(false);
                phase = DispatchPhase::HandlingException;
                debug!(?phase, error = %operation_error);

                let mut handler = None;
                for interceptor in interceptors.iter() {
                    let claimed = panic::catch_unwind(AssertUnwindSafe(|| {
                        interceptor.handle_exception(context, &operation_error)
                    }))
                    .unwrap_or_else(|payload| {
                        warn!(
                            interceptor = %interceptor.name(),
                            error = %panic_message(payload.as_ref()),
                            "오류 처리 중 패닉, 처리하지 않은 것으로 간주"
                        );
                        false
                    });
                    if claimed {
                        handler = Some(Arc::clone(interceptor));
                        break;
                    }
                }

                return match handler {
                    Some(handler) => {
                        info!(interceptor = %handler.name(), error = %operation_error, "작업 오류 처리됨");
                        context.set_successful(true);
                        context.set_attribute(EXCEPTION_HANDLED_ATTRIBUTE, true);
                        context.set_attribute(EXCEPTION_HANDLER_ATTRIBUTE, handler.name());
                        // 처리된 오류는 후처리를 건너뜁니다
                        self.finish(context, DispatchPhase::Done);
                        Ok(context.is_successful())
                    }
                    None => {
                        error!(error = %operation_error, "처리되지 않은 작업 오류");
                        context.set_attribute(ERROR_ATTRIBUTE, operation_error.to_string());
                        self.finish(context, DispatchPhase::Done);
                        Err(DispatchError::Unhandled {
                            execution_id: context.execution_id().to_string(),
                            source: operation_error,
                        })
                    }
                };
            }
        }

        phase = DispatchPhase::PostProcessing;
        debug!(?phase);
        for interceptor in interceptors.iter().rev() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| interceptor.post_process(context)));
            let failure = match outcome {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e.to_string()),
                Err(payload) => Some(format!("panic: {}", panic_message(payload.as_ref()))),
            };
            if let Some(reason) = failure {
                warn!(interceptor = %interceptor.name(), error = %reason, "후처리 실패, 계속 진행");
                context.set_attribute(format!("{}{}", POST_PROCESS_ERROR_PREFIX, interceptor.name()), reason);
            }
        }

        self.finish(context, DispatchPhase::Done);
        Ok(context.is_successful())
    }

    fn finish(&self, context: &Context, phase: DispatchPhase) {
        debug!(?phase, successful = context.is_successful(), "디스패치 종료");
        log_execution(&ExecutionLog::from_context(&self.name, context));
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
