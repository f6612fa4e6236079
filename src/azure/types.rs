//! Request and response types for Azure Resource Manager

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One row returned by the resource query.
///
/// `service_id` comes from the query's own `ServiceID` column; it is `None`
/// when the column is missing or not a positive integer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRecord {
    #[serde(rename = "id")]
    pub resource_id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub resource_group: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub location: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub subscription_id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_empty")]
    pub resource_type: String,
    #[serde(default)]
    pub properties: Value,
    #[serde(default)]
    pub sku: Value,
    #[serde(default)]
    pub tags: Value,
    #[serde(
        rename = "ServiceID",
        alias = "serviceId",
        alias = "ServiceId",
        default,
        deserialize_with = "lenient_service_id"
    )]
    pub service_id: Option<u32>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_service_id<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(parse_service_id(&value))
}

/// Accepts `7`, `7.0` and `"7"`; anything else, zero or negative ids give `None`.
pub fn parse_service_id(value: &Value) -> Option<u32> {
    let id = match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                .map(|f| f as u64)
        })?,
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    u32::try_from(id).ok().filter(|id| *id > 0)
}

/// Body of a Resource Graph `resources` request
#[derive(Debug, Clone, Serialize)]
pub struct ResourceGraphRequest<'a> {
    pub subscriptions: &'a [String],
    pub query: &'a str,
    pub options: QueryRequestOptions,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequestOptions {
    #[serde(rename = "$top")]
    pub top: u32,
    #[serde(rename = "$skipToken", skip_serializing_if = "Option::is_none")]
    pub skip_token: Option<String>,
    pub result_format: &'static str,
}

/// One page of Resource Graph results
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGraphResponse {
    #[serde(default)]
    pub total_records: u64,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub data: Vec<Value>,
    #[serde(rename = "$skipToken", default)]
    pub skip_token: Option<String>,
}

/// Subscription as returned by `GET /subscriptions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub subscription_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub state: String,
}

impl Subscription {
    pub fn is_enabled(&self) -> bool {
        self.state.eq_ignore_ascii_case("enabled")
    }
}

/// One page of `GET /subscriptions`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionListResponse {
    #[serde(default)]
    pub value: Vec<Subscription>,
    #[serde(default)]
    pub next_link: Option<String>,
}
