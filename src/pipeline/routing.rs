use std::sync::Arc;

use tracing::{debug, info};

use crate::context::{Context, Message};
use crate::interceptor::{InterceptorError, Registry};
use super::{InterceptorChain, KindMatcher, PipelineDispatcher, PipelineInterceptor};

/// 선택된 라우트 이름
pub const ROUTE_ATTRIBUTE: &str = "routing.route";
/// 선택된 라우트의 대상 파이프라인 이름
pub const ROUTE_TARGET_ATTRIBUTE: &str = "routing.target";

pub type RoutePredicate = Box<dyn Fn(&Message) -> bool + Send + Sync>;

/// 조건과 대상 파이프라인으로 이루어진 라우트
pub struct Route {
    name: String,
    predicate: RoutePredicate,
    target: Arc<PipelineDispatcher>,
}

impl Route {
    pub fn new<P>(name: impl Into<String>, predicate: P, target: Arc<PipelineDispatcher>) -> Self
    where
        P: Fn(&Message) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            predicate: Box::new(predicate),
            target,
        }
    }

    /// 메시지 타입 패턴으로 라우트를 만듭니다.
    pub fn for_kind(name: impl Into<String>, matcher: KindMatcher, target: Arc<PipelineDispatcher>) -> Self {
        Self::new(name, move |message: &Message| matcher.matches(message.kind()), target)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> &Arc<PipelineDispatcher> {
        &self.target
    }

    pub fn matches(&self, message: &Message) -> bool {
        (self.predicate)(message)
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("target", &self.target.name())
            .finish()
    }
}

/// 조건에 맞는 메시지를 다른 파이프라인으로 위임하는 인터셉터
///
/// 라우트는 등록 순서대로 검사하며 첫 번째로 일치한 라우트만 사용합니다.
/// 일치하면 부모 속성을 복사한 자식 컨텍스트로 대상 파이프라인을 실행하고,
/// 자식의 결과와 속성을 부모에 다시 합친 뒤 로컬 체인은 더 진행하지 않습니다.
/// 일치하는 라우트가 없으면 로컬 체인을 계속 진행합니다.
#[derive(Debug)]
pub struct RoutingInterceptor {
    name: String,
    routes: Registry<Route>,
}

impl RoutingInterceptor {
    pub fn new() -> Self {
        Self::named("routing")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            routes: Registry::new(),
        }
    }

    pub fn with_route(self, route: Route) -> Self {
        self.add_route(route);
        self
    }

    /// 라우트를 추가합니다. 같은 이름의 라우트가 있으면 `false`입니다.
    pub fn add_route(&self, route: Route) -> bool {
        let name = route.name().to_string();
        let added = self
            .routes
            .register_unless(Arc::new(route), |existing| existing.name() == name);
        if added {
            debug!(router = %self.name, route = %name, "라우트 추가");
        }
        added
    }

    pub fn remove_route(&self, name: &str) -> bool {
        self.routes.remove_where(|route| route.name() == name)
    }

    pub fn route_names(&self) -> Vec<String> {
        self.routes
            .snapshot()
            .iter()
            .map(|r| r.name().to_string())
            .collect()
    }
}

impl Default for RoutingInterceptor {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineInterceptor for RoutingInterceptor {
    fn name(&self) -> &str {
        &self.name
    }

    fn intercept(
        &self,
        message: Message,
        context: &mut Context,
        chain: &mut InterceptorChain,
    ) -> Result<bool, InterceptorError> {
        let routes = self.routes.snapshot();
        let route = match routes.iter().find(|route| route.matches(&message)) {
            Some(route) => route,
            None => {
                debug!(router = %self.name, kind = %message.kind(), "일치하는 라우트 없음, 체인 계속");
                return chain.proceed(message, context);
            }
        };

        info!(
            router = %self.name,
            route = %route.name(),
            target = %route.target().name(),
            kind = %message.kind(),
            "메시지 라우팅"
        );
        context.set_attribute(ROUTE_ATTRIBUTE, route.name());
        context.set_attribute(ROUTE_TARGET_ATTRIBUTE, route.target().name());

        let mut child = Context::new();
        child.extend_attributes(context.snapshot_attributes());

        let succeeded = route.target().process(message, &mut child);

        match child.take_result() {
            Some(result) => context.set_result(result),
            None => context.clear_result(),
        }
        context.extend_attributes(child.take_attributes());

        debug!(route = %route.name(), succeeded, "라우트 실행 완료");
        Ok(succeeded)
    }
}
