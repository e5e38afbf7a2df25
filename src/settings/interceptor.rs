use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 설정으로 생성할 수 있는 인터셉터 종류
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum InterceptorType {
    /// 선형 모델: Basic 인증
    BasicAuth,
    /// 선형 모델: 단계별 로그
    Logging,
    /// 선형 모델: 작업 오류 복구
    Recovery,
    /// 파이프라인 모델: 로컬 span 추적
    Tracing,
    /// 파이프라인 모델: 메시지 검증
    Validation,
    /// 파이프라인 모델: 헤더 추가 변환
    Headers,
}

impl InterceptorType {
    /// 선형 디스패처에 등록할 수 있는 종류인지
    pub fn is_linear(&self) -> bool {
        matches!(self, Self::BasicAuth | Self::Logging | Self::Recovery)
    }

    pub fn is_pipeline(&self) -> bool {
        !self.is_linear()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterceptorConfig {
    /// 인터셉터 타입
    pub interceptor_type: InterceptorType,

    /// 인터셉터 활성화 여부
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// 실행 순서 (낮은 숫자가 먼저 실행)
    #[serde(default)]
    pub order: i32,

    /// 인터셉터별 설정
    #[serde(default)]
    pub settings: HashMap<String, serde_json::Value>,
}

fn default_enabled() -> bool {
    true
}

impl InterceptorConfig {
    pub fn new(interceptor_type: InterceptorType) -> Self {
        Self {
            interceptor_type,
            enabled: true,
            order: 0,
            settings: HashMap::new(),
        }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    /// 설정 맵을 타입이 있는 설정 구조체로 변환합니다.
    pub fn settings_as<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(serde_json::to_value(&self.settings)?)
    }
}

/// 활성화된 설정만 골라 실행 순서대로 정렬합니다. 순서가 같으면 이름순입니다.
pub fn ordered_configs(configs: &HashMap<String, InterceptorConfig>) -> Vec<(&String, &InterceptorConfig)> {
    let mut ordered: Vec<_> = configs
        .iter()
        .filter(|(_, config)| config.enabled)
        .collect();
    ordered.sort_by(|(a_name, a), (b_name, b)| a.order.cmp(&b.order).then_with(|| a_name.cmp(b_name)));
    ordered
}

/// 라우트 설정. `kind`는 `KindMatcher` 패턴입니다.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteSettings {
    pub name: String,
    pub kind: String,
    pub target: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineSettings {
    #[serde(default)]
    pub interceptors: HashMap<String, InterceptorConfig>,

    /// 라우팅 인터셉터의 실행 순서
    #[serde(default = "default_routing_order")]
    pub routing_order: i32,

    #[serde(default)]
    pub routes: Vec<RouteSettings>,
}

fn default_routing_order() -> i32 {
    i32::MAX
}
