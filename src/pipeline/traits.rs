use crate::context::{Context, Message};
use crate::interceptor::InterceptorError;
use super::InterceptorChain;

/// 연속 전달(continuation) 방식의 파이프라인 인터셉터 트레이트
///
/// 인터셉터는 메시지를 검사하거나 새 메시지로 교체한 뒤 `chain.proceed`를 호출해
/// 나머지 체인을 실행하거나, `Ok(false)`를 반환해 즉시 중단할 수 있습니다.
pub trait PipelineInterceptor: Send + Sync {
    /// 인터셉터의 고유 이름을 반환합니다.
    fn name(&self) -> &str;

    fn intercept(
        &self,
        message: Message,
        context: &mut Context,
        chain: &mut InterceptorChain,
    ) -> Result<bool, InterceptorError>;
}
