use std::collections::HashMap;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::context::{Context, Message};
use crate::interceptor::InterceptorError;
use crate::pipeline::{InterceptorChain, KindMatcher, PipelineInterceptor};

/// 변환 실패 기록 접두사 (`transform.error.<name>`)
pub const TRANSFORM_ERROR_PREFIX: &str = "transform.error.";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HeadersConfig {
    /// 추가할 헤더 이름 → 값
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// 적용할 메시지 타입 패턴. 없으면 모든 메시지에 적용합니다.
    #[serde(default)]
    pub kind: Option<String>,
}

pub type TransformFn = Box<dyn Fn(&Message) -> Result<Message, InterceptorError> + Send + Sync>;

/// 메시지를 새 메시지로 변환한 뒤 체인을 계속하는 인터셉터
///
/// 변환에 실패하면 `transform.error.<name>`을 남기고 체인을 중단합니다.
pub struct TransformationInterceptor {
    name: String,
    applies_to: Option<KindMatcher>,
    transform: TransformFn,
}

impl TransformationInterceptor {
    pub fn new<F>(name: impl Into<String>, transform: F) -> Self
    where
        F: Fn(&Message) -> Result<Message, InterceptorError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            applies_to: None,
            transform: Box::new(transform),
        }
    }

    /// 설정된 헤더를 메시지에 덧붙이는 변환기를 만듭니다.
    pub fn headers(name: impl Into<String>, headers: HashMap<String, String>) -> Self {
        Self::new(name, move |message: &Message| Ok(message.with_headers(headers.clone())))
    }

    pub fn from_config(name: impl Into<String>, config: &HeadersConfig) -> Result<Self, InterceptorError> {
        let interceptor = Self::headers(name, config.headers.clone());
        match &config.kind {
            Some(pattern) => Ok(interceptor.applies_to(KindMatcher::parse(pattern)?)),
            None => Ok(interceptor),
        }
    }

    /// 지정한 타입의 메시지에만 변환을 적용합니다. 나머지는 그대로 통과합니다.
    pub fn applies_to(mut self, matcher: KindMatcher) -> Self {
        self.applies_to = Some(matcher);
        self
    }
}

impl PipelineInterceptor for TransformationInterceptor {
    fn name(&self) -> &str {
        &self.name
    }

    fn intercept(
        &self,
        message: Message,
        context: &mut Context,
        chain: &mut InterceptorChain,
    ) -> Result<bool, InterceptorError> {
        if let Some(matcher) = &self.applies_to {
            if !matcher.matches(message.kind()) {
                return chain.proceed(message, context);
            }
        }

        match (self.transform)(&message) {
            Ok(transformed) => {
                debug!(interceptor = %self.name, kind = %transformed.kind(), "메시지 변환");
                chain.proceed(transformed, context)
            }
            Err(e) => {
                warn!(interceptor = %self.name, error = %e, "메시지 변환 실패");
                context.set_attribute(format!("{}{}", TRANSFORM_ERROR_PREFIX, self.name), e.to_string());
                Ok(false)
            }
        }
    }
}
