use crate::context::Context;
use super::{InterceptorError, OperationError};

/// 선형 디스패처가 사용하는 3단계 인터셉터 트레이트
///
/// - `pre_process`: 작업 실행 전, 등록 순서대로 호출됩니다. `false`를 반환하면
///   이후 단계가 모두 건너뛰어집니다.
/// - `post_process`: 작업 실행 후, 등록 역순으로 호출됩니다.
/// - `handle_exception`: 작업이 실패했을 때 등록 순서대로 호출되며, 가장 먼저
///   `true`를 반환한 인터셉터가 오류를 처리한 것으로 간주됩니다.
pub trait Interceptor: Send + Sync {
    /// 인터셉터의 고유 이름을 반환합니다.
    fn name(&self) -> &str;

    fn pre_process(&self, context: &mut Context) -> Result<bool, InterceptorError> {
        let _ = context;
        Ok(true)
    }

    fn post_process(&self, context: &mut Context) -> Result<(), InterceptorError> {
        let _ = context;
        Ok(())
    }

    fn handle_exception(&self, context: &mut Context, error: &OperationError) -> bool {
        let _ = (context, error);
        false
    }
}
