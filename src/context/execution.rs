use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;
use time::{Duration, OffsetDateTime};
use tracing::warn;
use uuid::Uuid;

/// 하나의 실행 단위에 대한 상태를 담는 컨텍스트입니다.
///
/// 컨텍스트는 실행마다 새로 만들어지며, 모든 인터셉터 단계와 실행되는 작업이
/// 같은 인스턴스를 순서대로 수정합니다. 여러 스레드에서 동시에 수정하는 것을
/// 전제로 하지 않으므로 내부 동기화가 없습니다.
#[derive(Debug)]
pub struct Context {
    execution_id: String,
    start_time: OffsetDateTime,
    end_time: Option<OffsetDateTime>,
    input: Option<Value>,
    result: Option<Value>,
    successful: bool,
    attributes: HashMap<String, Value>,
}

impl Context {
    /// 새로운 컨텍스트를 생성합니다.
    pub fn new() -> Self {
        Self {
            execution_id: Uuid::new_v4().to_string(),
            start_time: OffsetDateTime::now_utc(),
            end_time: None,
            input: None,
            result: None,
            successful: true,
            attributes: HashMap::new(),
        }
    }

    /// 초기 입력값을 가진 컨텍스트를 생성합니다.
    pub fn with_input(input: impl Into<Value>) -> Self {
        let mut context = Self::new();
        context.input = Some(input.into());
        context
    }

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    pub fn start_time(&self) -> OffsetDateTime {
        self.start_time
    }

    pub fn end_time(&self) -> Option<OffsetDateTime> {
        self.end_time
    }

    /// 종료 시각을 설정합니다.
    ///
    /// 시작 시각보다 이른 값은 시작 시각으로 보정됩니다.
    pub fn set_end_time(&mut self, end_time: OffsetDateTime) {
        if end_time < self.start_time {
            warn!(
                execution_id = %self.execution_id,
                "종료 시각이 시작 시각보다 이르므로 시작 시각으로 보정합니다"
            );
            self.end_time = Some(self.start_time);
        } else {
            self.end_time = Some(end_time);
        }
    }

    /// 아직 종료 시각이 없다면 현재 시각으로 기록합니다.
    pub fn complete(&mut self) {
        if self.end_time.is_none() {
            self.set_end_time(OffsetDateTime::now_utc());
        }
    }

    pub fn is_completed(&self) -> bool {
        self.end_time.is_some()
    }

    /// 실행 시간. 종료 시각이 기록되기 전에는 `None`입니다.
    pub fn duration(&self) -> Option<Duration> {
        self.end_time.map(|end| end - self.start_time)
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.duration().map(|d| d.whole_milliseconds() as i64)
    }

    pub fn input(&self) -> Option<&Value> {
        self.input.as_ref()
    }

    pub fn set_input(&mut self, input: impl Into<Value>) {
        self.input = Some(input.into());
    }

    pub fn take_input(&mut self) -> Option<Value> {
        self.input.take()
    }

    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// 결과를 요청한 타입으로 변환해 반환합니다. 변환할 수 없으면 `None`입니다.
    pub fn result_as<T: DeserializeOwned>(&self) -> Option<T> {
        self.result.as_ref().and_then(|v| T::deserialize(v).ok())
    }

    pub fn set_result(&mut self, result: impl Into<Value>) {
        self.result = Some(result.into());
    }

    pub fn take_result(&mut self) -> Option<Value> {
        self.result.take()
    }

    pub fn clear_result(&mut self) {
        self.result = None;
    }

    pub fn is_successful(&self) -> bool {
        self.successful
    }

    pub fn set_successful(&mut self, successful: bool) {
        self.successful = successful;
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// 속성을 요청한 타입으로 읽습니다.
    ///
    /// 키가 없거나 저장된 값이 `T`로 변환되지 않으면 `None`을 반환합니다.
    /// 타입 불일치는 오류가 아닙니다.
    ///
    /// ```
    /// use message_interceptor::Context;
    ///
    /// let mut context = Context::new();
    /// context.set_attribute("x", 42);
    /// assert_eq!(context.attribute_as::<i64>("x"), Some(42));
    /// assert_eq!(context.attribute_as::<String>("x"), None);
    /// ```
    pub fn attribute_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes.get(key).and_then(|v| T::deserialize(v).ok())
    }

    /// 속성을 설정하고 이전 값을 반환합니다.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.attributes.insert(key.into(), value.into())
    }

    pub fn remove_attribute(&mut self, key: &str) -> Option<Value> {
        self.attributes.remove(key)
    }

    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    /// 여러 속성을 한 번에 덮어씁니다.
    pub fn extend_attributes<I>(&mut self, attributes: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        self.attributes.extend(attributes);
    }

    /// 속성 전체의 복사본을 만듭니다. 이후 변경은 서로 영향을 주지 않습니다.
    pub fn snapshot_attributes(&self) -> HashMap<String, Value> {
        self.attributes.clone()
    }

    /// 속성 전체를 꺼내고 컨텍스트의 속성을 비웁니다.
    pub fn take_attributes(&mut self) -> HashMap<String, Value> {
        std::mem::take(&mut self.attributes)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_context_defaults() {
        let context = Context::new();
        assert!(context.is_successful());
        assert!(context.end_time().is_none());
        assert!(context.duration().is_none());
        assert!(context.input().is_none());
        assert!(context.result().is_none());
        assert_eq!(context.attribute_count(), 0);
    }

    #[test]
    fn test_execution_ids_are_unique() {
        let a = Context::new();
        let b = Context::new();
        assert_ne!(a.execution_id(), b.execution_id());
    }

    #[test]
    fn test_end_time_never_precedes_start() {
        let mut context = Context::new();
        let earlier = context.start_time() - Duration::seconds(10);
        context.set_end_time(earlier);
        assert_eq!(context.end_time(), Some(context.start_time()));
        assert_eq!(context.duration(), Some(Duration::ZERO));
    }

    #[test]
    fn test_complete_only_stamps_once() {
        let mut context = Context::new();
        let fixed = context.start_time() + Duration::milliseconds(5);
        context.set_end_time(fixed);
        context.complete();
        assert_eq!(context.end_time(), Some(fixed));
        assert_eq!(context.duration_ms(), Some(5));
    }

    #[test]
    fn test_typed_attribute_mismatch_yields_none() {
        let mut context = Context::new();
        context.set_attribute("security.authenticated", true);
        context.set_attribute("items", json!(["a", "b"]));

        assert_eq!(context.attribute_as::<bool>("security.authenticated"), Some(true));
        assert_eq!(context.attribute_as::<u32>("security.authenticated"), None);
        assert_eq!(
            context.attribute_as::<Vec<String>>("items"),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(context.attribute_as::<String>("missing"), None);
    }

    #[test]
    fn test_set_attribute_returns_previous_value() {
        let mut context = Context::new();
        assert!(context.set_attribute("k", 1).is_none());
        assert_eq!(context.set_attribute("k", 2), Some(json!(1)));
        assert_eq!(context.remove_attribute("k"), Some(json!(2)));
        assert!(!context.has_attribute("k"));
    }

    #[test]
    fn test_result_as() {
        let mut context = Context::with_input("order-1");
        context.set_result(json!({"total": 12}));
        assert_eq!(context.input(), Some(&json!("order-1")));
        assert_eq!(context.result_as::<HashMap<String, i64>>().map(|m| m["total"]), Some(12));
        assert_eq!(context.result_as::<String>(), None);
    }
}
