// Wire types for the cron device's JSON listing.

use serde::{Deserialize, Serialize};

/// One task as reported by `~cron@1.0/list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CronTask {
    pub task_id: String,
    #[serde(default)]
    pub pid: String,
    #[serde(default)]
    pub path: String,
    /// `once` or `every`.
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub created_at: u64,
}

/// `{ status, device, body: [...] }` envelope around the listing.
/// `device` is ignored.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CronListResponse {
    pub status: u16,
    #[serde(default)]
    pub body: Vec<CronTask>,
}
