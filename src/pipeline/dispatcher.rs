use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, debug_span, error, warn};

use crate::context::{Context, Message};
use crate::interceptor::{panic_message, Registry};
use crate::logging::{log_execution, ExecutionLog};
use super::{InterceptorChain, PipelineInterceptor};

/// 체인 실행 중 빠져나온 오류의 설명
pub const PIPELINE_ERROR_ATTRIBUTE: &str = "pipeline.error";

/// 파이프라인 모델의 디스패처
///
/// 실행마다 등록소 스냅샷으로 새 `InterceptorChain`을 만들고 첫 인터셉터부터
/// 시작합니다. 이 디스패처는 호출자에게 오류를 던지지 않습니다. 실패는 항상
/// `false` 반환값과 컨텍스트 상태로 전달됩니다.
#[derive(Debug)]
pub struct PipelineDispatcher {
    name: String,
    interceptors: Registry<dyn PipelineInterceptor>,
}

impl PipelineDispatcher {
    pub fn new() -> Self {
        Self::named("pipeline")
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
    pub fn register<I: PipelineInterceptor + 'static>(&self, interceptor: I) -> Arc<dyn PipelineInterceptor> {
        let interceptor: Arc<dyn PipelineInterceptor> = Arc::new(interceptor);
        self.register_shared(Arc::clone(&interceptor));
        interceptor
    }

    /// 이미 공유 중인 인터셉터를 등록합니다. 같은 인스턴스는 한 번만 등록됩니다.
    pub fn register_shared(&self, interceptor: Arc<dyn PipelineInterceptor>) -> bool {
        let name = interceptor.name().to_string();
        let registered = self.interceptors.register(interceptor);
        if registered {
            debug!(pipeline = %self.name, interceptor = %name, "파이프라인 인터셉터 등록");
        } else {
            warn!(pipeline = %self.name, interceptor = %name, "이미 등록된 파이프라인 인터셉터");
        }
        registered
    }

    pub fn unregister(&self, interceptor: &Arc<dyn PipelineInterceptor>) -> bool {
        self.interceptors.unregister(interceptor)
    }

    pub fn replace_all(&self, interceptors: Vec<Arc<dyn PipelineInterceptor>>) {
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

    /// 메시지를 파이프라인에 통과시킵니다.
    ///
    /// 인터셉터가 없으면 경고만 남기고 `true`를 반환합니다. 체인에서 오류나
    /// 패닉이 빠져나오면 `pipeline.error`에 기록하고 `false`를 반환합니다.
    pub fn process(&self, message: Message, context: &mut Context) -> bool {
        let snapshot = self.interceptors.snapshot();
        if snapshot.is_empty() {
            warn!(pipeline = %self.name, "등록된 인터셉터가 없는 파이프라인");
            return true;
        }

        let span = debug_span!(
            "pipeline",
            pipeline = %self.name,
            execution_id = %context.execution_id(),
            kind = %message.kind()
        );
        let _enter = span.enter();
        debug!(count = snapshot.len(), "파이프라인 시작");

        let mut chain = InterceptorChain::new(snapshot);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| chain.proceed(message, context)));

        let succeeded = match outcome {
            Ok(Ok(succeeded)) => succeeded,
            Ok(Err(e)) => {
                error!(error = %e, "파이프라인 실행 오류");
                context.set_attribute(PIPELINE_ERROR_ATTRIBUTE, e.to_string());
                false
            }
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                error!(error = %reason, "파이프라인 인터셉터 패닉");
                context.set_attribute(PIPELINE_ERROR_ATTRIBUTE, format!("panic: {}", reason));
                false
            }
        };

        if !succeeded {
            context.set_successful(false);
        }
        context.complete();
        log_execution(&ExecutionLog::from_context(&self.name, context));
        succeeded
    }

    /// 파이프라인을 실행하고, 성공한 경우에만 최종 컨텍스트에 `projection`을 적용합니다.
    pub fn process_and_transform<T, F>(&self, message: Message, context: &mut Context, projection: F) -> Option<T>
    where
        F: FnOnce(&Context) -> Option<T>,
    {
        if self.process(message, context) {
            projection(context)
        } else {
            None
        }
    }
}

impl Default for PipelineDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
