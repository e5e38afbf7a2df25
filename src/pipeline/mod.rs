//! 연속 전달(chain of responsibility) 방식의 파이프라인 모델

mod chain;
mod dispatcher;
mod matcher;
mod routing;
mod traits;

pub use chain::{ChainState, InterceptorChain, PIPELINE_ABORTED_BY_ATTRIBUTE};
pub use dispatcher::{PipelineDispatcher, PIPELINE_ERROR_ATTRIBUTE};
pub use matcher::{KindMatcher, KindMatcherKind};
pub use routing::{Route, RoutePredicate, RoutingInterceptor, ROUTE_ATTRIBUTE, ROUTE_TARGET_ATTRIBUTE};
pub use traits::PipelineInterceptor;
