use std::env;
use std::process;

use serde_json::{json, Value};
use tracing::{error, info};

use message_interceptor::logging::init_logging;
use message_interceptor::{Context, InterceptorManager, Message, Settings};

/// 사용법: message_interceptor [kind] [payload-json]
fn main() {
    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("설정 로드 실패: {}", e);
            process::exit(1);
        }
    };

    let _guard = init_logging(&settings.logging);

    let manager = match InterceptorManager::new(&settings) {
        Ok(manager) => manager,
        Err(e) => {
            error!("인터셉터 구성 실패: {}", e);
            process::exit(1);
        }
    };

    let mut args = env::args().skip(1);
    let kind = args.next().unwrap_or_else(|| "demo".to_string());
    let payload = match args.next() {
        Some(raw) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
        None => json!({"hello": "world"}),
    };

    let mut context = Context::with_input(payload.clone());
    match manager
        .dispatcher()
        .dispatch(&mut context, |ctx| Ok(ctx.input().cloned().unwrap_or(Value::Null)))
    {
        Ok(successful) => info!(successful, result = ?context.result(), "디스패치 완료"),
        Err(e) => error!("디스패치 실패: {}", e),
    }

    for name in manager.pipeline_names() {
        if let Some(pipeline) = manager.pipeline(&name) {
            let mut context = Context::new();
            let successful = pipeline.process(Message::new(kind.clone(), payload.clone()), &mut context);
            info!(
                pipeline = %name,
                successful,
                attributes = context.attribute_count(),
                "파이프라인 처리 완료"
            );
        }
    }
}
