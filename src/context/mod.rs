//! 실행 컨텍스트와 파이프라인 메시지 모델입니다.

mod execution;
mod message;

pub use execution::Context;
pub use message::Message;
