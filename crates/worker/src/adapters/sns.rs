//! SNS notification events (`{Records: [{Sns: ...}]}`).

use std::collections::HashMap;

use {serde::Deserialize, unfurler_common::UnfurlRequest};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnsEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<SnsRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnsRecord {
    #[serde(rename = "Sns", default)]
    pub sns: SnsNotification,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SnsNotification {
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub message_attributes: HashMap<String, SnsAttribute>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SnsAttribute {
    #[serde(default, rename = "Type")]
    pub data_type: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

impl SnsNotification {
    #[must_use]
    pub fn to_request(&self) -> UnfurlRequest {
        let attribute = |key: &str| {
            self.message_attributes
                .get(key)
                .and_then(|attr| attr.value.clone())
        };
        UnfurlRequest {
            message_id: self.message_id.clone(),
            link: self.message.clone(),
            ts: attribute("ts"),
            channel: attribute("channel"),
        }
    }
}

/// One request per record, in delivery order.
#[must_use]
pub fn to_requests(event: &SnsEvent) -> Vec<UnfurlRequest> {
    event.records.iter().map(|r| r.sns.to_request()).collect()
}
