use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::dispatcher::Dispatcher;
use crate::interceptor::{Interceptor, InterceptorError};
use crate::interceptors::transform::HeadersConfig;
use crate::interceptors::{
    BasicAuthConfig, BasicAuthInterceptor, LoggingInterceptor, RecoveryConfig, RecoveryInterceptor,
    TracingInterceptor, TransformationInterceptor, ValidationConfig, ValidationInterceptor,
};
use crate::pipeline::{KindMatcher, PipelineDispatcher, PipelineInterceptor, Route, RoutingInterceptor};
use crate::settings::{ordered_configs, InterceptorConfig, InterceptorType, PipelineSettings, Settings, SettingsError};

/// 설정으로부터 선형 인터셉터 인스턴스를 생성합니다.
fn create_interceptor(name: &str, config: &InterceptorConfig) -> Result<Arc<dyn Interceptor>, InterceptorError> {
    debug!("인터셉터 생성 시작: name={}, type={:?}, settings={:?}", name, config.interceptor_type, config.settings);

    match config.interceptor_type {
        InterceptorType::BasicAuth => {
            let auth_config: BasicAuthConfig = config.settings_as()?;
            Ok(Arc::new(BasicAuthInterceptor::from_config(name, &auth_config)?))
        }
        InterceptorType::Logging => Ok(Arc::new(LoggingInterceptor::new(name))),
        InterceptorType::Recovery => {
            let recovery_config: RecoveryConfig = config.settings_as()?;
            Ok(Arc::new(RecoveryInterceptor::new(name, recovery_config)))
        }
        other => Err(InterceptorError::Config(format!(
            "{:?}는 선형 디스패처에 등록할 수 없습니다",
            other
        ))),
    }
}

/// 설정으로부터 파이프라인 인터셉터 인스턴스를 생성합니다.
fn create_pipeline_interceptor(
    name: &str,
    config: &InterceptorConfig,
) -> Result<Arc<dyn PipelineInterceptor>, InterceptorError> {
    debug!("파이프라인 인터셉터 생성 시작: name={}, type={:?}", name, config.interceptor_type);

    match config.interceptor_type {
        InterceptorType::Tracing => Ok(Arc::new(TracingInterceptor::new(name))),
        InterceptorType::Validation => {
            let validation_config: ValidationConfig = config.settings_as()?;
            Ok(Arc::new(ValidationInterceptor::from_config(name, &validation_config)?))
        }
        InterceptorType::Headers => {
            let headers_config: HeadersConfig = config.settings_as()?;
            Ok(Arc::new(TransformationInterceptor::from_config(name, &headers_config)?))
        }
        other => Err(InterceptorError::Config(format!(
            "{:?}는 파이프라인에 등록할 수 없습니다",
            other
        ))),
    }
}

/// 선형 인터셉터 목록을 설정 순서대로 만듭니다. 생성에 실패한 항목은 건너뜁니다.
pub fn build_interceptors(configs: &HashMap<String, InterceptorConfig>) -> Vec<Arc<dyn Interceptor>> {
    let mut interceptors = Vec::new();
    for (name, config) in ordered_configs(configs) {
        match create_interceptor(name, config) {
            Ok(interceptor) => interceptors.push(interceptor),
            Err(e) => {
                error!("인터셉터 생성 실패: {}: {}", name, e);
                continue;
            }
        }
    }
    interceptors
}

/// 설정 전체로부터 디스패처와 파이프라인을 구성하고 보관합니다.
#[derive(Debug)]
pub struct InterceptorManager {
    dispatcher: Arc<Dispatcher>,
    pipelines: HashMap<String, Arc<PipelineDispatcher>>,
}

impl InterceptorManager {
    pub fn new(settings: &Settings) -> Result<Self, SettingsError> {
        settings.validate()?;

        let dispatcher = Arc::new(Dispatcher::named("dispatcher"));
        dispatcher.replace_all(build_interceptors(&settings.dispatcher));

        // 라우트가 다른 파이프라인을 참조하므로 먼저 모두 만들어 둡니다
        let pipelines: HashMap<String, Arc<PipelineDispatcher>> = settings
            .pipelines
            .keys()
            .map(|name| (name.clone(), Arc::new(PipelineDispatcher::named(name.clone()))))
            .collect();

        for (name, pipeline_settings) in &settings.pipelines {
            let entries = Self::build_pipeline(name, pipeline_settings, &pipelines);
            if let Some(pipeline) = pipelines.get(name) {
                pipeline.replace_all(entries);
                info!(pipeline = %name, interceptors = ?pipeline.interceptor_names(), "파이프라인 구성 완료");
            }
        }

        Ok(Self { dispatcher, pipelines })
    }

    fn build_pipeline(
        name: &str,
        settings: &PipelineSettings,
        pipelines: &HashMap<String, Arc<PipelineDispatcher>>,
    ) -> Vec<Arc<dyn PipelineInterceptor>> {
        let mut entries: Vec<(i32, String, Arc<dyn PipelineInterceptor>)> = Vec::new();

        for (interceptor_name, config) in ordered_configs(&settings.interceptors) {
            match create_pipeline_interceptor(interceptor_name, config) {
                Ok(interceptor) => entries.push((config.order, interceptor_name.clone(), interceptor)),
                Err(e) => {
                    error!(pipeline = %name, "파이프라인 인터셉터 생성 실패: {}: {}", interceptor_name, e);
                    continue;
                }
            }
        }

        if !settings.routes.is_empty() {
            let router_name = format!("{}.routing", name);
            let router = RoutingInterceptor::named(router_name.clone());
            for route in &settings.routes {
                let target = match pipelines.get(&route.target) {
                    Some(target) => Arc::clone(target),
                    None => {
                        error!(pipeline = %name, route = %route.name, target = %route.target, "알 수 없는 라우트 대상");
                        continue;
                    }
                };
                match KindMatcher::parse(&route.kind) {
                    Ok(matcher) => {
                        router.add_route(Route::for_kind(route.name.clone(), matcher, target));
                    }
                    Err(e) => error!(pipeline = %name, route = %route.name, "라우트 패턴 오류: {}", e),
                }
            }
            entries.push((settings.routing_order, router_name, Arc::new(router)));
        }

        entries.sort_by(|(a_order, a_name, _), (b_order, b_name, _)| {
            a_order.cmp(b_order).then_with(|| a_name.cmp(b_name))
        });
        entries.into_iter().map(|(_, _, interceptor)| interceptor).collect()
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn pipeline(&self, name: &str) -> Option<&Arc<PipelineDispatcher>> {
        self.pipelines.get(name)
    }

    pub fn pipeline_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.pipelines.keys().cloned().collect();
        names.sort();
        names
    }

    /// 선형 디스패처의 인터셉터 구성을 교체합니다.
    ///
    /// 이미 실행 중인 디스패치는 기존 구성으로 끝까지 진행됩니다.
    pub fn update_dispatcher(&self, configs: &HashMap<String, InterceptorConfig>) {
        let interceptors = build_interceptors(configs);
        info!(count = interceptors.len(), "디스패처 인터셉터 구성 갱신");
        self.dispatcher.replace_all(interceptors);
    }
}
