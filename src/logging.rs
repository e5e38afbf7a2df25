use std::path::Path;

use tracing::{error, info, info_span, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

use crate::context::Context;
use crate::settings::{LogFormat, LogOutput, LogSettings};

/// 실패 원인을 찾을 때 확인하는 컨텍스트 속성 (우선순위 순)
pub const ERROR_ATTRIBUTES: &[&str] = &[
    "dispatch.error",
    "pipeline.error",
    "security.error",
    "validation.errors",
    "dispatch.aborted_by",
    "pipeline.aborted_by",
];

/// 로깅 설정에 따라 전역 subscriber를 설치합니다.
///
/// 파일 출력일 경우 반환된 가드가 살아있는 동안에만 로그가 기록됩니다.
/// 이미 subscriber가 설치되어 있으면 아무것도 하지 않습니다.
pub fn init_logging(settings: &LogSettings) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::default().add_directive(LevelFilter::from_level(settings.level).into())
    });

    let (writer, guard) = match &settings.output {
        LogOutput::Stdout => (BoxMakeWriter::new(std::io::stdout), None),
        LogOutput::File(path) => {
            let path = Path::new(path);
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .map(|name| name.to_os_string())
                .unwrap_or_else(|| "message_interceptor.log".into());
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(non_blocking), Some(guard))
        }
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let installed = match settings.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
    if let Err(e) = installed {
        eprintln!("로깅 초기화를 건너뜁니다: {}", e);
    }

    guard
}

/// 완료된 실행 하나에 대한 요약 로그
#[derive(Debug)]
pub struct ExecutionLog {
    pub execution_id: String,
    pub dispatcher: String,
    pub successful: bool,
    pub duration_ms: Option<i64>,
    pub error: Option<String>,
}

impl ExecutionLog {
    pub fn from_context(dispatcher: &str, context: &Context) -> Self {
        let error = ERROR_ATTRIBUTES
            .iter()
            .find_map(|key| context.attribute(key))
            .map(|value| match value.as_str() {
                Some(text) => text.to_string(),
                None => value.to_string(),
            });

        Self {
            execution_id: context.execution_id().to_string(),
            dispatcher: dispatcher.to_string(),
            successful: context.is_successful(),
            duration_ms: context.duration_ms(),
            error,
        }
    }
}

pub fn log_execution(log: &ExecutionLog) {
    let span = info_span!(
        "execution",
        execution_id = %log.execution_id,
        dispatcher = %log.dispatcher,
        duration_ms = ?log.duration_ms
    );
    let _enter = span.enter();

    match (log.successful, &log.error) {
        (true, None) => info!("Execution completed successfully"),
        (true, Some(error)) => warn!(error = %error, "Execution completed with warning"),
        (false, Some(error)) => error!(error = %error, "Execution failed"),
        (false, None) => warn!("Execution short-circuited"),
    }
}
