//! Per-variant field policies
//!
//! Each service variant is described by data: its type tag, the argument
//! that identifies an entry, and a table saying which argument updates which
//! field under which rule. The update engine in [`crate::pipeline`] is the
//! same for every variant.

use indexmap::IndexMap;
use tracing::debug;

use crate::args::ArgumentSet;
use crate::model::{Service, ServiceType};
use crate::{BotFileError, Result};

/// Patchable service fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceField {
    Name,
    InstrumentationKey,
    ApiKeys,
    AppId,
    AppPassword,
    Configuration,
}

/// When a supplied argument updates its field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    /// Argument key present, even with an empty value
    Present,
    /// Argument present and non-empty
    NonEmpty,
    /// Argument present, non-empty and not shaped like a UUID
    NonEmptyNotUuid,
    /// Argument present; parsed as a string map that replaces the field wholesale
    Mapping,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldPolicy {
    pub arg: &'static str,
    pub field: ServiceField,
    pub rule: FieldRule,
}

/// Everything the update engine needs to know about one service variant
#[derive(Debug)]
pub struct VariantDescriptor {
    pub kind: ServiceType,
    /// Argument carrying the discriminator
    pub discriminator_arg: &'static str,
    /// Prefix used in "was not found" messages
    pub label: &'static str,
    /// Message when the discriminator is absent or empty
    pub missing_message: &'static str,
    pub check_discriminator: Option<fn(&str) -> Result<()>>,
    pub policies: &'static [FieldPolicy],
    /// Argument that must be present for the patch to be saved
    pub persist_gate: Option<&'static str>,
}

pub static APP_INSIGHTS: VariantDescriptor = VariantDescriptor {
    kind: ServiceType::AppInsights,
    discriminator_arg: "serviceName",
    label: "AppInsights service",
    missing_message: "Bad or missing --serviceName",
    check_discriminator: None,
    policies: &[
        FieldPolicy {
            arg: "instrumentationKey",
            field: ServiceField::InstrumentationKey,
            rule: FieldRule::NonEmpty,
        },
        FieldPolicy {
            arg: "name",
            field: ServiceField::Name,
            rule: FieldRule::Present,
        },
        FieldPolicy {
            arg: "keys",
            field: ServiceField::ApiKeys,
            rule: FieldRule::Mapping,
        },
    ],
    persist_gate: None,
};

pub static ENDPOINT: VariantDescriptor = VariantDescriptor {
    kind: ServiceType::Endpoint,
    discriminator_arg: "endpoint",
    label: "Endpoint Service",
    missing_message: "missing --endpoint",
    check_discriminator: Some(check_http_url),
    policies: &[
        FieldPolicy {
            arg: "name",
            field: ServiceField::Name,
            rule: FieldRule::Present,
        },
        FieldPolicy {
            arg: "appId",
            field: ServiceField::AppId,
            rule: FieldRule::NonEmptyNotUuid,
        },
        FieldPolicy {
            arg: "appPassword",
            field: ServiceField::AppPassword,
            rule: FieldRule::NonEmpty,
        },
    ],
    persist_gate: None,
};

pub static GENERIC: VariantDescriptor = VariantDescriptor {
    kind: ServiceType::Generic,
    discriminator_arg: "url",
    label: "Generic Service",
    missing_message: "missing --url",
    check_discriminator: None,
    policies: &[
        FieldPolicy {
            arg: "name",
            field: ServiceField::Name,
            rule: FieldRule::Present,
        },
        FieldPolicy {
            arg: "keys",
            field: ServiceField::Configuration,
            rule: FieldRule::Mapping,
        },
    ],
    persist_gate: Some("keys"),
};

impl VariantDescriptor {
    pub fn for_type(kind: ServiceType) -> &'static VariantDescriptor {
        match kind {
            ServiceType::AppInsights => &APP_INSIGHTS,
            ServiceType::Endpoint => &ENDPOINT,
            ServiceType::Generic => &GENERIC,
        }
    }

    /// Required discriminator value, checked for shape where the variant demands it
    pub fn discriminator(&self, args: &ArgumentSet) -> Result<String> {
        let value = args
            .text(self.discriminator_arg)?
            .filter(|v| !v.is_empty())
            .ok_or_else(|| BotFileError::missing(self.missing_message))?;
        if let Some(check) = self.check_discriminator {
            check(&value)?;
        }
        Ok(value)
    }

    /// A gated variant saves only when its gate argument has a value
    pub fn should_persist(&self, args: &ArgumentSet) -> bool {
        self.persist_gate.is_none_or(|gate| args.is_supplied(gate))
    }

    /// Apply every policy to `service`, returning the fields that changed
    pub fn apply(&self, service: &mut Service, args: &ArgumentSet) -> Result<Vec<ServiceField>> {
        let mut updated = Vec::new();
        for policy in self.policies {
            let value = match policy.rule {
                FieldRule::Present => args.text(policy.arg)?.map(FieldValue::Text),
                FieldRule::NonEmpty => args
                    .text(policy.arg)?
                    .filter(|v| !v.is_empty())
                    .map(FieldValue::Text),
                FieldRule::NonEmptyNotUuid => args
                    .text(policy.arg)?
                    .filter(|v| !v.is_empty() && !is_uuid(v))
                    .map(FieldValue::Text),
                FieldRule::Mapping => args.mapping(policy.arg)?.map(FieldValue::Mapping),
            };
            if let Some(value) = value {
                set_field(service, policy.field, value)?;
                updated.push(policy.field);
            }
        }
        debug!(kind = %self.kind, ?updated, "applied field policies");
        Ok(updated)
    }
}

enum FieldValue {
    Text(String),
    Mapping(IndexMap<String, String>),
}

fn set_field(service: &mut Service, field: ServiceField, value: FieldValue) -> Result<()> {
    match (service, field, value) {
        (Service::AppInsights(s), ServiceField::Name, FieldValue::Text(v)) => s.name = Some(v),
        (Service::Endpoint(s), ServiceField::Name, FieldValue::Text(v)) => s.name = Some(v),
        (Service::Generic(s), ServiceField::Name, FieldValue::Text(v)) => s.name = Some(v),
        (Service::AppInsights(s), ServiceField::InstrumentationKey, FieldValue::Text(v)) => {
            s.instrumentation_key = Some(v)
        }
        (Service::AppInsights(s), ServiceField::ApiKeys, FieldValue::Mapping(m)) => {
            s.api_keys = Some(m)
        }
        (Service::Endpoint(s), ServiceField::AppId, FieldValue::Text(v)) => s.app_id = Some(v),
        (Service::Endpoint(s), ServiceField::AppPassword, FieldValue::Text(v)) => {
            s.app_password = Some(v)
        }
        (Service::Generic(s), ServiceField::Configuration, FieldValue::Mapping(m)) => {
            s.configuration = Some(m)
        }
        (service, field, _) => {
            return Err(BotFileError::invalid(format!(
                "field {field:?} cannot be set on {} services",
                service
                    .service_type()
                    .map(ServiceType::tag)
                    .unwrap_or("unknown")
            )));
        }
    }
    Ok(())
}

fn check_http_url(value: &str) -> Result<()> {
    let valid = url::Url::parse(value)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
        .unwrap_or(false);
    if valid {
        Ok(())
    } else {
        Err(BotFileError::invalid(format!(
            "--endpoint {value} is not a valid url"
        )))
    }
}

/// Canonical hyphenated UUID text
fn is_uuid(value: &str) -> bool {
    value.len() == 36 && uuid::Uuid::try_parse(value).is_ok()
}
