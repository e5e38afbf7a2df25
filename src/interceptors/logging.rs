use tracing::{info, warn};

use crate::context::Context;
use crate::interceptor::{Interceptor, InterceptorError, OperationError};

/// 각 단계를 로그로 남기는 인터셉터. 흐름에는 관여하지 않습니다.
pub struct LoggingInterceptor {
    name: String,
}

impl LoggingInterceptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for LoggingInterceptor {
    fn default() -> Self {
        Self::new("logging")
    }
}

impl Interceptor for LoggingInterceptor {
    fn name(&self) -> &str {
        &self.name
    }

    fn pre_process(&self, context: &mut Context) -> Result<bool, InterceptorError> {
        info!(
            execution_id = %context.execution_id(),
            input = ?context.input(),
            "Processing started"
        );
        Ok(true)
    }

    fn post_process(&self, context: &mut Context) -> Result<(), InterceptorError> {
        info!(
            execution_id = %context.execution_id(),
            successful = context.is_successful(),
            duration_ms = ?context.duration_ms(),
            "Processing finished"
        );
        Ok(())
    }

    fn handle_exception(&self, context: &mut Context, error: &OperationError) -> bool {
        warn!(
            execution_id = %context.execution_id(),
            error = %error,
            "Operation failed"
        );
        false
    }
}
