use super::error::Result;
use super::types::ResourceRecord;

/// Runs a Resource Graph style query scoped to a set of subscriptions.
pub trait ResourceQuery: Send + Sync {
    fn query(&self, subscriptions: &[String], query: &str) -> Result<Vec<ResourceRecord>>;
}

/// Lists the subscriptions a scan should cover when the caller names none.
pub trait SubscriptionSource: Send + Sync {
    fn subscription_ids(&self) -> Result<Vec<String>>;
}

/// Downloads a text document (dataset JSON, query text).
pub trait TextFetcher: Send + Sync {
    fn fetch_text(&self, url: &str) -> Result<String>;
}
