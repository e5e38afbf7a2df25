use regex_lite as regex;

use crate::interceptor::InterceptorError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KindMatcherKind {
    Exact,
    Prefix,
    Regex,
    Any,
}

/// 메시지 타입 패턴
///
/// - `*` : 모든 타입
/// - `order.*` : `order.`로 시작하는 타입
/// - `^order\.(created|updated)$` : 정규식
/// - 그 외 : 정확히 일치
#[derive(Debug, Clone)]
pub struct KindMatcher {
    pub kind: KindMatcherKind,
    pub pattern: String,
    regex: Option<regex::Regex>,
}

impl KindMatcher {
    pub fn parse(pattern: &str) -> Result<Self, InterceptorError> {
        if pattern == "*" {
            return Ok(Self {
                kind: KindMatcherKind::Any,
                pattern: String::new(),
                regex: None,
            });
        }

        if pattern.starts_with('^') {
            let re = regex::Regex::new(pattern).map_err(|e| {
                InterceptorError::Config(format!("잘못된 타입 패턴 {}: {}", pattern, e))
            })?;
            return Ok(Self {
                kind: KindMatcherKind::Regex,
                pattern: pattern.to_string(),
                regex: Some(re),
            });
        }

        if pattern.is_empty() {
            return Err(InterceptorError::Config("빈 타입 패턴".to_string()));
        }

        Ok(Self {
            kind: if pattern.ends_with('*') {
                KindMatcherKind::Prefix
            } else {
                KindMatcherKind::Exact
            },
            pattern: pattern.trim_end_matches('*').to_string(),
            regex: None,
        })
    }

    pub fn matches(&self, kind: &str) -> bool {
        match self.kind {
            KindMatcherKind::Any => true,
            KindMatcherKind::Exact => self.pattern == kind,
            KindMatcherKind::Prefix => kind.starts_with(&self.pattern),
            KindMatcherKind::Regex => self
                .regex
                .as_ref()
                .map(|r| r.is_match(kind))
                .unwrap_or(false),
        }
    }
}

impl PartialEq for KindMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.pattern == other.pattern
    }
}

impl Eq for KindMatcher {}
