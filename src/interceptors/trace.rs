use std::time::Instant;

use serde_json::{json, Value};
use tracing::{debug, info_span};
use uuid::Uuid;

use crate::context::{Context, Message};
use crate::interceptor::InterceptorError;
use crate::pipeline::{InterceptorChain, PipelineInterceptor};

pub const TRACE_ID_ATTRIBUTE: &str = "trace.id";
pub const SPAN_ID_ATTRIBUTE: &str = "trace.span_id";
pub const PARENT_SPAN_ID_ATTRIBUTE: &str = "trace.parent_span_id";
/// 완료된 span 기록 목록
pub const SPANS_ATTRIBUTE: &str = "trace.spans";

pub const TRACE_ID_HEADER: &str = "x-trace-id";
pub const SPAN_ID_HEADER: &str = "x-span-id";

/// 로컬 span 정보를 컨텍스트에 기록하는 추적 인터셉터
///
/// 나머지 체인을 하나의 span으로 감싸고, 체인이 반환된 뒤 `trace.spans`에
/// 기록을 추가합니다. 중첩된 파이프라인(라우팅)도 속성 복사를 통해 같은
/// trace id와 부모 span을 이어받습니다.
pub struct TracingInterceptor {
    name: String,
}

impl TracingInterceptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for TracingInterceptor {
    fn default() -> Self {
        Self::new("tracing")
    }
}

fn new_span_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(16);
    id
}

impl PipelineInterceptor for TracingInterceptor {
    fn name(&self) -> &str {
        &self.name
    }

    fn intercept(
        &self,
        message: Message,
        context: &mut Context,
        chain: &mut InterceptorChain,
    ) -> Result<bool, InterceptorError> {
        let trace_id = match context.attribute_as::<String>(TRACE_ID_ATTRIBUTE) {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4().simple().to_string();
                context.set_attribute(TRACE_ID_ATTRIBUTE, id.clone());
                id
            }
        };
        let parent_span = context.attribute_as::<String>(SPAN_ID_ATTRIBUTE);
        let previous_parent = context.attribute_as::<String>(PARENT_SPAN_ID_ATTRIBUTE);
        let span_id = new_span_id();

        match &parent_span {
            Some(parent) => context.set_attribute(PARENT_SPAN_ID_ATTRIBUTE, parent.clone()),
            None => context.remove_attribute(PARENT_SPAN_ID_ATTRIBUTE),
        };
        context.set_attribute(SPAN_ID_ATTRIBUTE, span_id.clone());

        let message = message
            .with_header(TRACE_ID_HEADER, trace_id.clone())
            .with_header(SPAN_ID_HEADER, span_id.clone());

        let span = info_span!(
            "trace",
            trace_id = %trace_id,
            span_id = %span_id,
            operation = %self.name
        );
        let started = Instant::now();
        let outcome = {
            let _enter = span.enter();
            chain.proceed(message, context)
        };
        let elapsed = started.elapsed();
        debug!(trace_id = %trace_id, span_id = %span_id, elapsed_us = elapsed.as_micros() as u64, "span 종료");

        let record = json!({
            "name": self.name,
            "trace_id": trace_id,
            "span_id": span_id,
            "parent_span_id": parent_span,
            "duration_us": elapsed.as_micros() as u64,
            "successful": matches!(outcome, Ok(true)),
        });
        let mut spans = match context.remove_attribute(SPANS_ATTRIBUTE) {
            Some(Value::Array(spans)) => spans,
            _ => Vec::new(),
        };
        spans.push(record);
        context.set_attribute(SPANS_ATTRIBUTE, spans);

        // 부모 span 복원
        match parent_span {
            Some(parent) => context.set_attribute(SPAN_ID_ATTRIBUTE, parent),
            None => context.remove_attribute(SPAN_ID_ATTRIBUTE),
        };
        match previous_parent {
            Some(parent) => context.set_attribute(PARENT_SPAN_ID_ATTRIBUTE, parent),
            None => context.remove_attribute(PARENT_SPAN_ID_ATTRIBUTE),
        };

        outcome
    }
}
