//! Bot file document model
//!
//! Services are a closed set of typed variants. Entries whose `type` tag is
//! not recognised are carried through as raw JSON so a save never drops them.
//! Unknown keys on known variants land in `extra`. Every object remembers the
//! key order it was read with and is written back in that order; keys that
//! did not exist before are appended.

use indexmap::IndexMap;
use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

use crate::{BotFileError, Result};

/// Service type tags understood by the patch engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceType {
    AppInsights,
    Endpoint,
    Generic,
}

impl ServiceType {
    pub fn tag(self) -> &'static str {
        match self {
            ServiceType::AppInsights => "appInsights",
            ServiceType::Endpoint => "endpoint",
            ServiceType::Generic => "generic",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "appInsights" => Some(ServiceType::AppInsights),
            "endpoint" => Some(ServiceType::Endpoint),
            "generic" => Some(ServiceType::Generic),
            _ => None,
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Azure Application Insights connection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInsightsService {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    /// Sealed at rest
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrumentation_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,
    /// Values are sealed at rest
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_keys: Option<IndexMap<String, String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    /// Keys in the order they were read, `type` included
    #[serde(skip)]
    pub key_order: Vec<String>,
}

/// Bot endpoint (messaging URL plus auth credentials)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointService {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    /// Sealed at rest
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    /// Keys in the order they were read, `type` included
    #[serde(skip)]
    pub key_order: Vec<String>,
}

/// Free-form service identified by a deep link URL
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenericService {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Values are sealed at rest
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<IndexMap<String, String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    /// Keys in the order they were read, `type` included
    #[serde(skip)]
    pub key_order: Vec<String>,
}

/// One entry of the document's `services` array
#[derive(Debug, Clone, PartialEq)]
pub enum Service {
    AppInsights(AppInsightsService),
    Endpoint(EndpointService),
    Generic(GenericService),
    /// Any service type this crate does not patch
    Other(Value),
}

impl Service {
    pub fn service_type(&self) -> Option<ServiceType> {
        match self {
            Service::AppInsights(_) => Some(ServiceType::AppInsights),
            Service::Endpoint(_) => Some(ServiceType::Endpoint),
            Service::Generic(_) => Some(ServiceType::Generic),
            Service::Other(_) => None,
        }
    }

    /// Value of the field a command matches this entry on
    pub fn discriminator(&self) -> Option<&str> {
        match self {
            Service::AppInsights(s) => s.service_name.as_deref(),
            Service::Endpoint(s) => s.endpoint.as_deref(),
            Service::Generic(s) => s.url.as_deref(),
            Service::Other(_) => None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Service::AppInsights(s) => s.name.as_deref(),
            Service::Endpoint(s) => s.name.as_deref(),
            Service::Generic(s) => s.name.as_deref(),
            Service::Other(v) => v.get("name").and_then(Value::as_str),
        }
    }

    /// Mutable handles to every non-empty sensitive value
    pub(crate) fn sensitive_values_mut(&mut self) -> Vec<&mut String> {
        let mut out: Vec<&mut String> = Vec::new();
        match self {
            Service::AppInsights(s) => {
                out.extend(s.instrumentation_key.as_mut());
                if let Some(keys) = s.api_keys.as_mut() {
                    out.extend(keys.values_mut());
                }
            }
            Service::Endpoint(s) => out.extend(s.app_password.as_mut()),
            Service::Generic(s) => {
                if let Some(cfg) = s.configuration.as_mut() {
                    out.extend(cfg.values_mut());
                }
            }
            Service::Other(_) => {}
        }
        out.retain(|v| !v.is_empty());
        out
    }

    /// Pretty JSON with two-space indentation, `type` tag first
    pub fn to_pretty_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| BotFileError::invalid(format!("failed to serialize service: {e}")))
    }
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum TaggedRef<'a> {
    #[serde(rename = "appInsights")]
    AppInsights(&'a AppInsightsService),
    #[serde(rename = "endpoint")]
    Endpoint(&'a EndpointService),
    #[serde(rename = "generic")]
    Generic(&'a GenericService),
}

impl Serialize for Service {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let (tagged, order) = match self {
            Service::AppInsights(s) => (TaggedRef::AppInsights(s), &s.key_order),
            Service::Endpoint(s) => (TaggedRef::Endpoint(s), &s.key_order),
            Service::Generic(s) => (TaggedRef::Generic(s), &s.key_order),
            Service::Other(v) => return v.serialize(serializer),
        };
        let value = serde_json::to_value(&tagged).map_err(S::Error::custom)?;
        restore_order(value, order).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Service {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .and_then(ServiceType::from_tag);

        let Some(kind) = kind else {
            return Ok(Service::Other(value));
        };

        let Value::Object(mut fields) = value else {
            return Err(D::Error::custom("service entry must be an object"));
        };
        let key_order: Vec<String> = fields.keys().cloned().collect();
        fields.remove("type");
        let body = Value::Object(fields);

        let service = match kind {
            ServiceType::AppInsights => {
                let mut s: AppInsightsService =
                    serde_json::from_value(body).map_err(D::Error::custom)?;
                s.key_order = key_order;
                Service::AppInsights(s)
            }
            ServiceType::Endpoint => {
                let mut s: EndpointService =
                    serde_json::from_value(body).map_err(D::Error::custom)?;
                s.key_order = key_order;
                Service::Endpoint(s)
            }
            ServiceType::Generic => {
                let mut s: GenericService =
                    serde_json::from_value(body).map_err(D::Error::custom)?;
                s.key_order = key_order;
                Service::Generic(s)
            }
        };
        Ok(service)
    }
}

/// Root of a bot file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub services: Vec<Service>,
    /// Document name sealed with the secret; non-empty means sealed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padlock: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    /// Root keys in the order they were read
    #[serde(skip)]
    pub key_order: Vec<String>,
}

impl Document {
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| BotFileError::invalid(format!("bot file is not valid JSON: {e}")))?;
        let key_order = value
            .as_object()
            .map(|fields| fields.keys().cloned().collect())
            .unwrap_or_default();

        let mut document: Document = serde_json::from_value(value)
            .map_err(|e| BotFileError::invalid(format!("bot file is malformed: {e}")))?;
        document.key_order = key_order;
        Ok(document)
    }

    pub fn to_pretty_json(&self) -> Result<String> {
        let value = serde_json::to_value(self)
            .map_err(|e| BotFileError::invalid(format!("failed to serialize bot file: {e}")))?;
        serde_json::to_string_pretty(&restore_order(value, &self.key_order))
            .map_err(|e| BotFileError::invalid(format!("failed to serialize bot file: {e}")))
    }

    pub fn is_sealed(&self) -> bool {
        self.padlock.as_deref().is_some_and(|p| !p.is_empty())
    }
}

/// Put keys listed in `order` first, in that order; other keys follow as they are
fn restore_order(value: Value, order: &[String]) -> Value {
    let Value::Object(fields) = value else {
        return value;
    };
    if order.is_empty() {
        return Value::Object(fields);
    }

    let mut ordered = Map::with_capacity(fields.len());
    for key in order {
        if let Some(v) = fields.get(key) {
            ordered.insert(key.clone(), v.clone());
        }
    }
    for (key, v) in fields {
        if !ordered.contains_key(&key) {
            ordered.insert(key, v);
        }
    }
    Value::Object(ordered)
}
