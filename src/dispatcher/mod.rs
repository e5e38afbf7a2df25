//! 선형(3단계) 인터셉터 모델
//!
//! 전처리 → 실행 → 오류 처리 → 후처리 순서를 고정된 인터셉터 목록에 대해 수행합니다.

mod error;
mod linear;

pub use error::DispatchError;
pub use linear::{
    DispatchPhase, Dispatcher, ABORTED_BY_ATTRIBUTE, ERROR_ATTRIBUTE,
    EXCEPTION_HANDLED_ATTRIBUTE, EXCEPTION_HANDLER_ATTRIBUTE, POST_PROCESS_ERROR_PREFIX,
};
