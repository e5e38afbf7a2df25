use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::context::Context;
use crate::interceptor::{Interceptor, OperationError};

/// 처리한 작업 오류의 설명
pub const RECOVERED_ERROR_ATTRIBUTE: &str = "recovery.error";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecoveryConfig {
    /// 오류 메시지에 포함되어야 하는 문자열. 없으면 모든 오류를 처리합니다.
    #[serde(default)]
    pub pattern: Option<String>,

    /// 오류를 처리했을 때 결과로 설정할 값
    #[serde(default)]
    pub fallback: Value,
}

/// 작업 오류를 대체 결과로 복구하는 인터셉터
pub struct RecoveryInterceptor {
    name: String,
    config: RecoveryConfig,
}

impl RecoveryInterceptor {
    pub fn new(name: impl Into<String>, config: RecoveryConfig) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }

    fn claims(&self, error: &OperationError) -> bool {
        match &self.config.pattern {
            Some(pattern) => error.to_string().contains(pattern.as_str()),
            None => true,
        }
    }
}

impl Interceptor for RecoveryInterceptor {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle_exception(&self, context: &mut Context, error: &OperationError) -> bool {
        if !self.claims(error) {
            return false;
        }
        info!(interceptor = %self.name, error = %error, "대체 결과로 복구");
        context.set_result(self.config.fallback.clone());
        context.set_attribute(RECOVERED_ERROR_ATTRIBUTE, error.to_string());
        true
    }
}
