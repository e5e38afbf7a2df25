use std::collections::HashMap;
use std::fs;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::context::Context;
use crate::interceptor::{Interceptor, InterceptorError};

/// `Basic <base64(user:password)>` 형식의 자격증명이 들어있는 속성
pub const AUTHORIZATION_ATTRIBUTE: &str = "security.authorization";
pub const AUTHENTICATED_ATTRIBUTE: &str = "security.authenticated";
pub const USER_ATTRIBUTE: &str = "security.user";
pub const ERROR_ATTRIBUTE: &str = "security.error";
/// 인증 실패 시 돌려줄 `WWW-Authenticate` 값
pub const CHALLENGE_ATTRIBUTE: &str = "security.challenge";

#[derive(Debug, Clone, Deserialize)]
pub struct BasicAuthConfig {
    /// 사용자 이름 → bcrypt 해시
    #[serde(default)]
    pub users: HashMap<String, String>,

    #[serde(default = "default_realm")]
    pub realm: String,

    /// `.htpasswd` 파일 경로. 지정되면 `users` 대신 사용됩니다.
    #[serde(default)]
    pub htpasswd: Option<String>,
}

fn default_realm() -> String {
    "Restricted".to_string()
}

/// Basic 인증을 위한 인증기 트레이트
///
/// # 지원하는 해시 알고리즘
/// - bcrypt ($2a$, $2b$, $2y$ 접두사)
pub trait Authenticator: Send + Sync {
    /// 사용자 자격증명을 검증합니다.
    fn verify_credentials(&self, username: &str, password: &str) -> bool;
}

/// 설정에 직접 기록된 사용자 목록 기반 인증기
pub struct StaticAuthenticator {
    users: HashMap<String, String>,
}

impl StaticAuthenticator {
    pub fn new(users: HashMap<String, String>) -> Self {
        Self { users }
    }
}

impl Authenticator for StaticAuthenticator {
    fn verify_credentials(&self, username: &str, password: &str) -> bool {
        self.users
            .get(username)
            .map(|hash| verify_password(password, hash))
            .unwrap_or(false)
    }
}

/// .htpasswd 파일 기반 인증기
///
/// # 예시
/// ```text
/// user1:$2y$05$c4WoMPo3SXsafkva.HHa6uXQZWr7oboPiC2bT/r7q1BB8I2s0BRqC
/// ```
pub struct HtpasswdAuthenticator {
    users: HashMap<String, String>,
}

impl HtpasswdAuthenticator {
    pub fn load(path: &str) -> Result<Self, InterceptorError> {
        let content = fs::read_to_string(path).map_err(|e| {
            InterceptorError::Config(format!("htpasswd 파일 {} 읽기 실패: {}", path, e))
        })?;

        let users = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once(':'))
            .map(|(user, hash)| (user.to_string(), hash.to_string()))
            .collect();

        Ok(Self { users })
    }
}

impl Authenticator for HtpasswdAuthenticator {
    fn verify_credentials(&self, username: &str, password: &str) -> bool {
        self.users
            .get(username)
            .map(|hash| verify_password(password, hash))
            .unwrap_or(false)
    }
}

/// 비밀번호 검증 함수
fn verify_password(password: &str, hash: &str) -> bool {
    if hash.starts_with("$2") {
        bcrypt::verify(password, hash).unwrap_or(false)
    } else {
        // bcrypt가 아닌 해시는 지원하지 않음
        false
    }
}

/// 인증기 팩토리
pub fn create_authenticator(config: &BasicAuthConfig) -> Result<Box<dyn Authenticator>, InterceptorError> {
    match &config.htpasswd {
        Some(path) => Ok(Box::new(HtpasswdAuthenticator::load(path)?)),
        None if config.users.is_empty() => Err(InterceptorError::Config(
            "basic-auth에는 users 또는 htpasswd 설정이 필요합니다".to_string(),
        )),
        None => Ok(Box::new(StaticAuthenticator::new(config.users.clone()))),
    }
}

/// Basic 인증 인터셉터
///
/// 전처리에서 `security.authorization` 속성을 검증합니다. 실패하면 실행을 중단하고
/// `security.error`와 `security.challenge`를 남깁니다.
pub struct BasicAuthInterceptor {
    name: String,
    realm: String,
    authenticator: Box<dyn Authenticator>,
}

impl BasicAuthInterceptor {
    pub fn new(name: impl Into<String>, realm: impl Into<String>, authenticator: Box<dyn Authenticator>) -> Self {
        Self {
            name: name.into(),
            realm: realm.into(),
            authenticator,
        }
    }

    pub fn from_config(name: impl Into<String>, config: &BasicAuthConfig) -> Result<Self, InterceptorError> {
        Ok(Self::new(name, config.realm.clone(), create_authenticator(config)?))
    }

    /// Authorization 값에서 자격증명을 추출합니다.
    fn extract_credentials(value: &str) -> Option<(String, String)> {
        let encoded = value.strip_prefix("Basic ")?.trim();
        let decoded = BASE64.decode(encoded).ok()?;
        let pair = String::from_utf8(decoded).ok()?;
        let (user, password) = pair.split_once(':')?;
        Some((user.to_string(), password.to_string()))
    }

    fn reject(&self, context: &mut Context, reason: &str) -> bool {
        warn!(interceptor = %self.name, reason, "인증 실패");
        context.set_attribute(AUTHENTICATED_ATTRIBUTE, false);
        context.set_attribute(ERROR_ATTRIBUTE, reason);
        context.set_attribute(CHALLENGE_ATTRIBUTE, format!("Basic realm=\"{}\"", self.realm));
        false
    }
}

impl Interceptor for BasicAuthInterceptor {
    fn name(&self) -> &str {
        &self.name
    }

    fn pre_process(&self, context: &mut Context) -> Result<bool, InterceptorError> {
        let header = match context.attribute_as::<String>(AUTHORIZATION_ATTRIBUTE) {
            Some(header) => header,
            None => return Ok(self.reject(context, "Missing or invalid Authorization header")),
        };

        match Self::extract_credentials(&header) {
            Some((username, password)) => {
                if self.authenticator.verify_credentials(&username, &password) {
                    debug!(interceptor = %self.name, user = %username, "인증 성공");
                    context.set_attribute(AUTHENTICATED_ATTRIBUTE, true);
                    context.set_attribute(USER_ATTRIBUTE, username);
                    Ok(true)
                } else {
                    Ok(self.reject(context, "Invalid credentials"))
                }
            }
            None => Ok(self.reject(context, "Missing or invalid Authorization header")),
        }
    }
}
