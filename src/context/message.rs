use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;
use time::OffsetDateTime;

/// 파이프라인을 통과하는 불변 메시지입니다.
///
/// 메시지를 "수정"하려면 `with_*` 메서드로 새 값을 만들어야 합니다.
/// 원본을 보관하고 있는 인터셉터는 변경의 영향을 받지 않습니다.
/// 헤더 이름은 소문자로 정규화됩니다.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    kind: String,
    payload: Value,
    headers: HashMap<String, String>,
    timestamp: OffsetDateTime,
}

impl Message {
    pub fn new(kind: impl Into<String>, payload: impl Into<Value>) -> Self {
        Self {
            kind: kind.into(),
            payload: payload.into(),
            headers: HashMap::new(),
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// 페이로드를 요청한 타입으로 변환합니다. 변환할 수 없으면 `None`입니다.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Option<T> {
        T::deserialize(&self.payload).ok()
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn timestamp(&self) -> OffsetDateTime {
        self.timestamp
    }

    /// 페이로드만 교체한 새 메시지를 반환합니다.
    pub fn with_payload(&self, payload: impl Into<Value>) -> Self {
        Self {
            payload: payload.into(),
            ..self.clone()
        }
    }

    /// 타입만 교체한 새 메시지를 반환합니다.
    pub fn with_kind(&self, kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..self.clone()
        }
    }

    /// 헤더를 하나 추가(또는 교체)한 새 메시지를 반환합니다.
    pub fn with_header(&self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        next
    }

    pub fn with_headers<I, K, V>(&self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut next = self.clone();
        for (name, value) in headers {
            next.headers
                .insert(name.as_ref().to_ascii_lowercase(), value.into());
        }
        next
    }

    pub fn without_header(&self, name: &str) -> Self {
        let mut next = self.clone();
        next.headers.remove(&name.to_ascii_lowercase());
        next
    }
}
