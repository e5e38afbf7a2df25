use serde::Deserialize;
use tracing::{debug, warn};

use crate::context::{Context, Message};
use crate::interceptor::InterceptorError;
use crate::pipeline::{InterceptorChain, KindMatcher, PipelineInterceptor};

pub const VALIDATION_ERRORS_ATTRIBUTE: &str = "validation.errors";
pub const VALIDATION_PASSED_ATTRIBUTE: &str = "validation.passed";

pub type ValidationRule = Box<dyn Fn(&Message) -> Result<(), String> + Send + Sync>;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValidationConfig {
    #[serde(default)]
    pub required_headers: Vec<String>,

    /// 허용되는 메시지 타입 패턴 (`KindMatcher` 형식)
    #[serde(default)]
    pub allowed_kinds: Vec<String>,

    #[serde(default)]
    pub require_payload: bool,
}

/// 규칙을 모두 검사하고, 하나라도 실패하면 체인을 중단하는 인터셉터
pub struct ValidationInterceptor {
    name: String,
    rules: Vec<(String, ValidationRule)>,
}

impl ValidationInterceptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
        }
    }

    pub fn from_config(name: impl Into<String>, config: &ValidationConfig) -> Result<Self, InterceptorError> {
        let mut validator = Self::new(name);
        for header in &config.required_headers {
            validator = validator.require_header(header.clone());
        }
        if !config.allowed_kinds.is_empty() {
            let matchers = config
                .allowed_kinds
                .iter()
                .map(|pattern| KindMatcher::parse(pattern))
                .collect::<Result<Vec<_>, _>>()?;
            validator = validator.allow_kinds(matchers);
        }
        if config.require_payload {
            validator = validator.require_payload();
        }
        Ok(validator)
    }

    pub fn with_rule<F>(mut self, name: impl Into<String>, rule: F) -> Self
    where
        F: Fn(&Message) -> Result<(), String> + Send + Sync + 'static,
    {
        self.rules.push((name.into(), Box::new(rule)));
        self
    }

    pub fn require_header(self, header: impl Into<String>) -> Self {
        let header = header.into();
        let rule_name = format!("header:{}", header);
        self.with_rule(rule_name, move |message: &Message| match message.header(&header) {
            Some(_) => Ok(()),
            None => Err(format!("missing header {}", header)),
        })
    }

    pub fn allow_kinds(self, matchers: Vec<KindMatcher>) -> Self {
        self.with_rule("kind", move |message: &Message| {
            if matchers.iter().any(|m| m.matches(message.kind())) {
                Ok(())
            } else {
                Err(format!("kind {} is not allowed", message.kind()))
            }
        })
    }

    pub fn require_payload(self) -> Self {
        self.with_rule("payload", |message: &Message| {
            if message.payload().is_null() {
                Err("payload is empty".to_string())
            } else {
                Ok(())
            }
        })
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

impl PipelineInterceptor for ValidationInterceptor {
    fn name(&self) -> &str {
        &self.name
    }

    fn intercept(
        &self,
        message: Message,
        context: &mut Context,
        chain: &mut InterceptorChain,
    ) -> Result<bool, InterceptorError> {
        let errors: Vec<String> = self
            .rules
            .iter()
            .filter_map(|(rule, check)| check(&message).err().map(|e| format!("{}: {}", rule, e)))
            .collect();

        if !errors.is_empty() {
            warn!(interceptor = %self.name, errors = ?errors, "메시지 검증 실패");
            context.set_attribute(VALIDATION_PASSED_ATTRIBUTE, false);
            context.set_attribute(VALIDATION_ERRORS_ATTRIBUTE, errors);
            return Ok(false);
        }

        debug!(interceptor = %self.name, rules = self.rules.len(), "메시지 검증 통과");
        context.set_attribute(VALIDATION_PASSED_ATTRIBUTE, true);
        chain.proceed(message, context)
    }
}
