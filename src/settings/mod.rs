use std::{collections::HashMap, env, fs, path::Path};
use serde::Deserialize;
use tracing::{debug, info};

use crate::interceptors::{BasicAuthConfig, ValidationConfig};
use crate::interceptors::transform::HeadersConfig;
use crate::pipeline::KindMatcher;

mod env_var;
mod error;
pub mod interceptor;
pub mod logging;

pub use env_var::parse_env_var;
pub use error::SettingsError;
pub use interceptor::{ordered_configs, InterceptorConfig, InterceptorType, PipelineSettings, RouteSettings};
pub use logging::{LogFormat, LogOutput, LogSettings};

pub type Result<T> = std::result::Result<T, SettingsError>;

/// 설정 파일 경로를 지정하는 환경 변수
pub const CONFIG_FILE_VAR: &str = "INTERCEPT_CONFIG_FILE";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    // 로깅 설정
    #[serde(default)]
    pub logging: LogSettings,

    /// 선형 디스패처 인터셉터 설정
    #[serde(default)]
    pub dispatcher: HashMap<String, InterceptorConfig>,

    /// 이름별 파이프라인 설정
    #[serde(default)]
    pub pipelines: HashMap<String, PipelineSettings>,
}

impl Settings {
    pub fn load() -> Result<Self> {
        if let Ok(config_path) = env::var(CONFIG_FILE_VAR) {
            Self::from_toml_file(&config_path)
        } else {
            Self::from_env()
        }
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).map_err(|e| SettingsError::FileError {
            path: path.as_ref().to_string_lossy().to_string(),
            error: e,
        })?;

        let settings = Self::from_toml_str(&content)?;
        info!("설정 파일 로드 완료: {}", path.as_ref().display());
        Ok(settings)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let settings: Self = toml::from_str(content)
            .map_err(|e| SettingsError::ParseError { source: e })?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn from_env() -> Result<Self> {
        let settings = Self {
            logging: LogSettings::from_env()?,
            dispatcher: HashMap::new(),
            pipelines: HashMap::new(),
        };

        settings.validate()?;
        Ok(settings)
    }

    /// 설정 유효성 검증
    pub fn validate(&self) -> Result<()> {
        for (name, config) in &self.dispatcher {
            if !config.interceptor_type.is_linear() {
                return Err(SettingsError::InvalidConfig(format!(
                    "dispatcher.{}: {:?}는 파이프라인 전용 인터셉터입니다",
                    name, config.interceptor_type
                )));
            }
            Self::validate_interceptor(&format!("dispatcher.{}", name), config)?;
        }

        for (pipeline, pipeline_settings) in &self.pipelines {
            for (name, config) in &pipeline_settings.interceptors {
                let path = format!("pipelines.{}.interceptors.{}", pipeline, name);
                if !config.interceptor_type.is_pipeline() {
                    return Err(SettingsError::InvalidConfig(format!(
                        "{}: {:?}는 선형 디스패처 전용 인터셉터입니다",
                        path, config.interceptor_type
                    )));
                }
                Self::validate_interceptor(&path, config)?;
            }

            let mut route_names = Vec::new();
            for route in &pipeline_settings.routes {
                let referenced_by = format!("pipelines.{}.routes.{}", pipeline, route.name);
                if route_names.contains(&route.name.as_str()) {
                    return Err(SettingsError::InvalidConfig(format!("중복된 라우트: {}", referenced_by)));
                }
                route_names.push(route.name.as_str());

                if !self.pipelines.contains_key(&route.target) {
                    return Err(SettingsError::UnknownPipeline {
                        pipeline: route.target.clone(),
                        referenced_by,
                    });
                }
                KindMatcher::parse(&route.kind)
                    .map_err(|e| SettingsError::InvalidConfig(format!("{}: {}", referenced_by, e)))?;
            }
        }

        self.detect_routing_cycle()
    }

    fn validate_interceptor(path: &str, config: &InterceptorConfig) -> Result<()> {
        if !config.enabled {
            return Ok(());
        }
        let invalid = |e: String| SettingsError::InvalidConfig(format!("{}: {}", path, e));

        match config.interceptor_type {
            InterceptorType::BasicAuth => {
                let auth: BasicAuthConfig = config.settings_as().map_err(|e| invalid(e.to_string()))?;
                if auth.users.is_empty() && auth.htpasswd.is_none() {
                    return Err(invalid("users 또는 htpasswd 설정이 필요합니다".to_string()));
                }
            }
            InterceptorType::Validation => {
                let validation: ValidationConfig = config.settings_as().map_err(|e| invalid(e.to_string()))?;
                for pattern in &validation.allowed_kinds {
                    KindMatcher::parse(pattern).map_err(|e| invalid(e.to_string()))?;
                }
            }
            InterceptorType::Headers => {
                let headers: HeadersConfig = config.settings_as().map_err(|e| invalid(e.to_string()))?;
                if headers.headers.is_empty() {
                    return Err(invalid("headers 설정이 비어 있습니다".to_string()));
                }
            }
            InterceptorType::Recovery => {
                config.settings_as::<crate::interceptors::RecoveryConfig>()
                    .map_err(|e| invalid(e.to_string()))?;
            }
            InterceptorType::Logging | InterceptorType::Tracing => {}
        }
        Ok(())
    }

    /// 라우트 그래프에 순환이 없는지 확인합니다.
    fn detect_routing_cycle(&self) -> Result<()> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit<'a>(
            pipeline: &'a str,
            pipelines: &'a HashMap<String, PipelineSettings>,
            marks: &mut HashMap<&'a str, Mark>,
            path: &mut Vec<String>,
        ) -> Result<()> {
            match marks.get(pipeline) {
                Some(Mark::Done) => return Ok(()),
                Some(Mark::Visiting) => {
                    path.push(pipeline.to_string());
                    return Err(SettingsError::RoutingCycle { path: path.clone() });
                }
                None => {}
            }

            marks.insert(pipeline, Mark::Visiting);
            path.push(pipeline.to_string());
            if let Some(settings) = pipelines.get(pipeline) {
                for route in &settings.routes {
                    visit(&route.target, pipelines, marks, path)?;
                }
            }
            path.pop();
            marks.insert(pipeline, Mark::Done);
            Ok(())
        }

        let mut marks = HashMap::new();
        let mut names: Vec<&String> = self.pipelines.keys().collect();
        names.sort();
        for name in names {
            let mut path = Vec::new();
            visit(name, &self.pipelines, &mut marks, &mut path)?;
        }
        debug!(pipelines = self.pipelines.len(), "라우팅 그래프 검증 완료");
        Ok(())
    }
}
