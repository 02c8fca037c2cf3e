/* src/protocol/rust/src/serializer.rs */

// Pluggable value codecs. Serializers run pre-order while a payload is
// encoded; deserializers run post-order while it is decoded, the same order a
// JSON replacer and reviver visit a value tree.

use std::sync::Arc;

use http::HeaderMap;
use serde_json::Value;

type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct Serializer {
  apply: Predicate,
  serialize: Arc<dyn Fn(&Value) -> Value + Send + Sync>,
}

impl Serializer {
  pub fn new(
    apply: impl Fn(&Value) -> bool + Send + Sync + 'static,
    serialize: impl Fn(&Value) -> Value + Send + Sync + 'static,
  ) -> Self {
    Self { apply: Arc::new(apply), serialize: Arc::new(serialize) }
  }
}

/// Request facts a deserializer may consult.
pub struct DeserializeCtx<'a> {
  pub path: &'a str,
  pub headers: &'a HeaderMap,
}

#[derive(Clone)]
pub struct Deserializer {
  apply: Predicate,
  deserialize: Arc<dyn Fn(Value, &DeserializeCtx<'_>) -> Value + Send + Sync>,
}

impl Deserializer {
  pub fn new(
    apply: impl Fn(&Value) -> bool + Send + Sync + 'static,
    deserialize: impl Fn(Value, &DeserializeCtx<'_>) -> Value + Send + Sync + 'static,
  ) -> Self {
    Self { apply: Arc::new(apply), deserialize: Arc::new(deserialize) }
  }
}

/// Ordered serializer chain; the first matching predicate wins.
#[derive(Clone, Default)]
pub struct Serializers(Vec<Serializer>);

impl Serializers {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, serializer: Serializer) {
    self.0.push(serializer);
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn encode(&self, value: &Value) -> Value {
    let replaced = match self.0.iter().find(|s| (s.apply)(value)) {
      Some(s) => (s.serialize)(value),
      None => value.clone(),
    };
    match replaced {
      Value::Array(items) => Value::Array(items.iter().map(|v| self.encode(v)).collect()),
      Value::Object(map) => Value::Object(map.iter().map(|(k, v)| (k.clone(), self.encode(v))).collect()),
      other => other,
    }
  }
}

/// Ordered deserializer chain; the first matching predicate wins.
#[derive(Clone, Default)]
pub struct Deserializers(Vec<Deserializer>);

impl Deserializers {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, deserializer: Deserializer) {
    self.0.push(deserializer);
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn decode(&self, value: Value, ctx: &DeserializeCtx<'_>) -> Value {
    let value = match value {
      Value::Array(items) => Value::Array(items.into_iter().map(|v| self.decode(v, ctx)).collect()),
      Value::Object(map) => {
        Value::Object(map.into_iter().map(|(k, v)| (k, self.decode(v, ctx))).collect())
      }
      other => other,
    };
    if is_falsy(&value) {
      return value;
    }
    match self.0.iter().find(|d| (d.apply)(&value)) {
      Some(d) => (d.deserialize)(value, ctx),
      None => value,
    }
  }
}

/// `null`, `false`, zero and the empty string never reach a deserializer.
pub fn is_falsy(value: &Value) -> bool {
  match value {
    Value::Null => true,
    Value::Bool(b) => !b,
    Value::Number(n) => n.as_f64() == Some(0.0),
    Value::String(s) => s.is_empty(),
    Value::Array(_) | Value::Object(_) => false,
  }
}
