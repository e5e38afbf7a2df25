use std::sync::Arc;

use tracing::trace;

use crate::context::{Context, Message};
use crate::interceptor::{InterceptorError, Snapshot};
use super::PipelineInterceptor;

/// 체인을 `false`로 처음 멈춘 인터셉터 이름
pub const PIPELINE_ABORTED_BY_ATTRIBUTE: &str = "pipeline.aborted_by";

/// 체인의 현재 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    /// 다음에 호출할 인터셉터 위치
    Active { next: usize },
    /// 모든 인터셉터를 소진함. 이후 `proceed`는 항상 성공을 반환합니다.
    Exhausted,
}

/// 한 번의 파이프라인 실행을 위한 체인
///
/// 불변 스냅샷과 앞으로만 움직이는 커서로 구성됩니다.
pub struct InterceptorChain {
    interceptors: Snapshot<dyn PipelineInterceptor>,
    cursor: usize,
}

impl InterceptorChain {
    pub fn new(interceptors: Snapshot<dyn PipelineInterceptor>) -> Self {
        Self {
            interceptors,
            cursor: 0,
        }
    }

    /// 다음 인터셉터에 메시지를 전달합니다.
    ///
    /// 남은 인터셉터가 없으면 아무 것도 호출하지 않고 `Ok(true)`를 반환합니다.
    /// 인터셉터가 `Ok(false)`를 반환하면 `pipeline.aborted_by`에 가장 안쪽의
    /// 중단 지점만 기록합니다.
    pub fn proceed(&mut self, message: Message, context: &mut Context) -> Result<bool, InterceptorError> {
        let next = match self.interceptors.get(self.cursor) {
            Some(interceptor) => Arc::clone(interceptor),
            None => return Ok(true),
        };
        self.cursor += 1;
        trace!(
            interceptor = %next.name(),
            position = self.cursor - 1,
            kind = %message.kind(),
            "체인 진행"
        );
        let outcome = next.intercept(message, context, self);
        if matches!(outcome, Ok(false)) && !context.has_attribute(PIPELINE_ABORTED_BY_ATTRIBUTE) {
            context.set_attribute(PIPELINE_ABORTED_BY_ATTRIBUTE, next.name());
        }
        outcome
    }

    /// 커서를 처음으로 되돌립니다. 같은 호출자가 의도적으로 재실행할 때만 사용합니다.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    pub fn state(&self) -> ChainState {
        if self.cursor >= self.interceptors.len() {
            ChainState::Exhausted
        } else {
            ChainState::Active { next: self.cursor }
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.state() == ChainState::Exhausted
    }

    /// 아직 호출되지 않은 인터셉터 수
    pub fn remaining(&self) -> usize {
        self.interceptors.len().saturating_sub(self.cursor)
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }
}

impl std::fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("len", &self.interceptors.len())
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    struct Passthrough;

    impl PipelineInterceptor for Passthrough {
        fn name(&self) -> &str {
            "passthrough"
        }

        fn intercept(
            &self,
            message: Message,
            context: &mut Context,
            chain: &mut InterceptorChain,
        ) -> Result<bool, InterceptorError> {
            let seen = context.attribute_as::<u32>("seen").unwrap_or(0);
            context.set_attribute("seen", seen + 1);
            chain.proceed(message, context)
        }
    }

    fn chain_of(n: usize) -> InterceptorChain {
        let interceptors: Vec<Arc<dyn PipelineInterceptor>> =
            (0..n).map(|_| Arc::new(Passthrough) as Arc<dyn PipelineInterceptor>).collect();
        InterceptorChain::new(Arc::new(interceptors))
    }

    #[test]
    fn test_exhausted_chain_is_terminal_and_repeatable() {
        let mut chain = chain_of(2);
        let mut context = Context::new();
        let message = Message::new("a", Value::Null);

        assert_eq!(chain.state(), ChainState::Active { next: 0 });
        assert!(chain.proceed(message.clone(), &mut context).unwrap());
        assert!(chain.is_exhausted());
        assert_eq!(context.attribute_as::<u32>("seen"), Some(2));

        // 소진된 체인은 아무 것도 호출하지 않음
        assert!(chain.proceed(message.clone(), &mut context).unwrap());
        assert!(chain.proceed(message, &mut context).unwrap());
        assert_eq!(context.attribute_as::<u32>("seen"), Some(2));
    }

    #[test]
    fn test_reset_allows_replay() {
        let mut chain = chain_of(3);
        let mut context = Context::new();
        let message = Message::new("a", Value::Null);

        chain.proceed(message.clone(), &mut context).unwrap();
        assert_eq!(chain.remaining(), 0);
        chain.reset();
        assert_eq!(chain.remaining(), 3);
        chain.proceed(message, &mut context).unwrap();
        assert_eq!(context.attribute_as::<u32>("seen"), Some(6));
    }

    struct Halt;

    impl PipelineInterceptor for Halt {
        fn name(&self) -> &str {
            "halt"
        }

        fn intercept(
            &self,
            _message: Message,
            _context: &mut Context,
            _chain: &mut InterceptorChain,
        ) -> Result<bool, InterceptorError> {
            Ok(false)
        }
    }

    #[test]
    fn test_stop_records_innermost_interceptor() {
        let interceptors: Vec<Arc<dyn PipelineInterceptor>> = vec![Arc::new(Passthrough), Arc::new(Halt)];
        let mut chain = InterceptorChain::new(Arc::new(interceptors));
        let mut context = Context::new();

        assert!(!chain.proceed(Message::new("a", Value::Null), &mut context).unwrap());
        // Passthrough도 false를 돌려받지만 처음 멈춘 Halt만 남음
        assert_eq!(
            context.attribute_as::<String>(PIPELINE_ABORTED_BY_ATTRIBUTE).as_deref(),
            Some("halt")
        );
    }

    #[test]
    fn test_empty_chain() {
        let mut chain = chain_of(0);
        let mut context = Context::new();
        assert!(chain.is_exhausted());
        assert!(chain.proceed(Message::new("a", Value::Null), &mut context).unwrap());
        assert_eq!(context.attribute_count(), 0);
    }
}
