use serde::de::DeserializeOwned;

use crate::{error::ErrorKind, ApiError};

/// Decoded body of a successful response.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    /// Body of a response whose `content-type` contains `application/json`.
    Json(serde_json::Value),
    /// Raw body of any other response.
    Text(String),
}

impl Payload {
    /// Converts the payload into a JSON value; text becomes a JSON string.
    pub fn into_value(self) -> serde_json::Value {
        match self {
            Self::Json(value) => value,
            Self::Text(text) => serde_json::Value::String(text),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.as_str()),
            Self::Json(_) => None,
        }
    }

    /// Deserializes the payload into `T`.
    ///
    /// Text payloads are presented as a JSON string, so `String` and
    /// `serde_json::Value` accept both payload shapes.
    pub fn deserialize<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        serde_json::from_value(self.into_value()).map_err(|err| {
            ApiError::new(
                ErrorKind::Decode,
                format!("response does not match the expected type: {err}"),
            )
        })
    }
}
