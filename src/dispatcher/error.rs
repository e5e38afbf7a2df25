use crate::interceptor::OperationError;

/// 선형 디스패처가 호출자에게 전달하는 오류
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// 어떤 인터셉터도 처리하지 않은 작업 오류
    #[error("실행 {execution_id}의 작업 오류를 처리한 인터셉터가 없음: {source}")]
    Unhandled {
        execution_id: String,
        #[source]
        source: OperationError,
    },
}

impl DispatchError {
    pub fn execution_id(&self) -> &str {
        match self {
            Self::Unhandled { execution_id, .. } => execution_id,
        }
    }

    /// 원래의 작업 오류를 꺼냅니다.
    pub fn into_source(self) -> OperationError {
        match self {
            Self::Unhandled { source, .. } => source,
        }
    }
}
