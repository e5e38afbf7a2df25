/// 디스패처가 감싸는 작업이 반환하는 오류 타입입니다.
pub type OperationError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// 인터셉터 자신의 코드에서 발생한 오류입니다.
#[derive(Debug, thiserror::Error)]
pub enum InterceptorError {
    #[error("설정 오류: {0}")]
    Config(String),

    #[error("잘못된 메시지: {0}")]
    InvalidMessage(String),

    #[error("인터셉터 {interceptor} 실행 실패: {message}")]
    Execution {
        interceptor: String,
        message: String,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl InterceptorError {
    pub fn execution(interceptor: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution {
            interceptor: interceptor.into(),
            message: message.into(),
        }
    }
}

/// `catch_unwind`이 돌려준 패닉 값을 읽을 수 있는 문자열로 바꿉니다.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
