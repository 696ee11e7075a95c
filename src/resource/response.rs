//! Response adapter
//!
//! Pairs a raw service response with the conversion that turns its body into
//! a domain value. The conversion runs on first access and its result is kept.

use crate::arm::error::ArmResult;
use crate::arm::http::RawResponse;
use once_cell::sync::OnceCell;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Wire model (JSON body) to domain value
pub type Converter<T> = Arc<dyn Fn(&Value) -> ArmResult<T> + Send + Sync>;

/// Converter that deserializes the body straight into `T`.
pub fn deserialize_converter<T: DeserializeOwned + 'static>() -> Converter<T> {
    Arc::new(|value: &Value| -> ArmResult<T> { Ok(T::deserialize(value)?) })
}

/// Converter for calls whose body carries nothing of interest.
pub fn unit_converter() -> Converter<()> {
    Arc::new(|_: &Value| -> ArmResult<()> { Ok(()) })
}

pub struct ArmResponse<T> {
    raw: RawResponse,
    convert: Converter<T>,
    value: OnceCell<T>,
}

impl<T> ArmResponse<T> {
    pub fn new(raw: RawResponse, convert: Converter<T>) -> Self {
        Self {
            raw,
            convert,
            value: OnceCell::new(),
        }
    }

    pub fn raw_response(&self) -> &RawResponse {
        &self.raw
    }

    pub fn status(&self) -> u16 {
        self.raw.status
    }

    /// Converted value. A failed conversion is not cached; the next call retries it.
    pub fn value(&self) -> ArmResult<&T> {
        self.value.get_or_try_init(|| (self.convert)(&self.raw.body))
    }

    pub fn into_value(self) -> ArmResult<T> {
        match self.value.into_inner() {
            Some(value) => Ok(value),
            None => (self.convert)(&self.raw.body),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ArmResponse<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArmResponse")
            .field("status", &self.raw.status)
            .field("value", &self.value.get())
            .finish()
    }
}
