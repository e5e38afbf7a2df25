//! Message Interceptor는 작업 단위 주위에 인증, 추적, 라우팅, 변환, 검증 같은
//! 공통 관심사를 조합하기 위한 인터셉션 프레임워크입니다.
//!
//! # 주요 기능
//!
//! - 선형 디스패처: 전처리 / 후처리(역순) / 오류 처리(첫 처리자 우선) 3단계 모델
//! - 파이프라인: 각 인터셉터가 `chain.proceed`로 나머지 체인 진행 여부를 결정
//! - 라우팅: 조건에 맞는 메시지를 다른 파이프라인으로 위임하고 결과를 병합
//! - copy-on-write 등록소: 실행 중인 디스패치는 시작 시점의 스냅샷으로 동작
//!
//! # 선형 디스패처
//!
//! ```
//! use message_interceptor::{Context, Dispatcher, Interceptor, InterceptorError};
//! use serde_json::json;
//!
//! struct RequireUser;
//!
//! impl Interceptor for RequireUser {
//!     fn name(&self) -> &str {
//!         "require-user"
//!     }
//!
//!     fn pre_process(&self, context: &mut Context) -> Result<bool, InterceptorError> {
//!         Ok(context.has_attribute("security.user"))
//!     }
//! }
//!
//! let dispatcher = Dispatcher::new();
//! dispatcher.register(RequireUser);
//!
//! let mut context = Context::new();
//! let ok = dispatcher.dispatch(&mut context, |_| Ok(json!("done"))).unwrap();
//! assert!(!ok);
//! assert_eq!(context.attribute_as::<String>("dispatch.aborted_by").as_deref(), Some("require-user"));
//! ```
//!
//! # 파이프라인과 라우팅
//!
//! ```
//! use std::sync::Arc;
//! use message_interceptor::{
//!     Context, InterceptorChain, InterceptorError, KindMatcher, Message, PipelineDispatcher,
//!     PipelineInterceptor, Route, RoutingInterceptor,
//! };
//! use serde_json::json;
//!
//! struct Complete;
//!
//! impl PipelineInterceptor for Complete {
//!     fn name(&self) -> &str {
//!         "complete"
//!     }
//!
//!     fn intercept(
//!         &self,
//!         message: Message,
//!         context: &mut Context,
//!         chain: &mut InterceptorChain,
//!     ) -> Result<bool, InterceptorError> {
//!         context.set_result(message.payload().clone());
//!         chain.proceed(message, context)
//!     }
//! }
//!
//! let orders = Arc::new(PipelineDispatcher::named("orders"));
//! orders.register(Complete);
//!
//! let main = PipelineDispatcher::named("main");
//! main.register(RoutingInterceptor::new().with_route(Route::for_kind(
//!     "orders",
//!     KindMatcher::parse("order.*").unwrap(),
//!     Arc::clone(&orders),
//! )));
//!
//! let mut context = Context::new();
//! assert!(main.process(Message::new("order.created", json!({"id": 7})), &mut context));
//! assert_eq!(context.result(), Some(&json!({"id": 7})));
//! assert_eq!(context.attribute_as::<String>("routing.route").as_deref(), Some("orders"));
//! ```

pub mod context;
pub mod dispatcher;
pub mod interceptor;
pub mod interceptors;
pub mod logging;
pub mod manager;
pub mod pipeline;
pub mod settings;

pub use context::{Context, Message};
pub use dispatcher::{DispatchError, Dispatcher};
pub use interceptor::{Interceptor, InterceptorError, OperationError, Registry};
pub use manager::InterceptorManager;
pub use pipeline::{
    ChainState, InterceptorChain, KindMatcher, PipelineDispatcher, PipelineInterceptor, Route,
    RoutingInterceptor,
};
pub use settings::Settings;
