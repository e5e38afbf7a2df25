//! 프레임워크 계약을 사용하는 참조 인터셉터 구현
//!
//! 선형 모델: `BasicAuthInterceptor`, `LoggingInterceptor`, `RecoveryInterceptor`
//! 파이프라인 모델: `TracingInterceptor`, `TransformationInterceptor`, `ValidationInterceptor`

pub mod basic_auth;
pub mod logging;
pub mod recovery;
pub mod trace;
pub mod transform;
pub mod validation;

pub use basic_auth::{BasicAuthConfig, BasicAuthInterceptor};
pub use logging::LoggingInterceptor;
pub use recovery::{RecoveryConfig, RecoveryInterceptor};
pub use trace::TracingInterceptor;
pub use transform::TransformationInterceptor;
pub use validation::{ValidationConfig, ValidationInterceptor};
