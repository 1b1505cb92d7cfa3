// Node HTTP client
//
// Wraps `reqwest::Client` with process-path and cron-path URL construction.
// Bodies come back as raw text: the node answers slot reads with a bare
// decimal and task creation with a bare task id, so interpretation is left
// to the caller.

use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{CronListResponse, CronTask};
use crate::transport::TransportConfig;

/// Process device path segment appended to every process id.
const PROCESS_DEVICE: &str = "~process@1.0";

/// Cron device root.
const CRON_DEVICE: &str = "~cron@1.0";

/// Marker the cron device puts in the body when a task id is unknown.
const TASK_NOT_FOUND_MARKER: &str = "Task not found";

/// Raw HTTP client for a single node.
pub struct NodeClient {
    http: reqwest::Client,
    base_url: Url,
}

impl NodeClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the node root (e.g. `http://127.0.0.1:8734`).
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The node base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    fn root(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// `{base}/{process_id}~process@1.0/{path}`
    pub(crate) fn process_url(&self, process_id: &str, path: &str) -> Result<Url, Error> {
        let full = format!("{}/{process_id}{PROCESS_DEVICE}/{path}", self.root());
        Ok(Url::parse(&full)?)
    }

    /// `{base}/~cron@1.0/{action}`
    pub(crate) fn cron_url(&self, action: &str) -> Result<Url, Error> {
        let full = format!("{}/{CRON_DEVICE}/{action}", self.root());
        Ok(Url::parse(&full)?)
    }

    /// `{base}/~cron@1.0/{action}?cron-path=/{process_id}~process@1.0/now`
    fn cron_path_url(&self, action: &str, process_id: &str) -> Result<Url, Error> {
        let full = format!(
            "{}/{CRON_DEVICE}/{action}?cron-path=/{process_id}{PROCESS_DEVICE}/now",
            self.root()
        );
        Ok(Url::parse(&full)?)
    }

    // ── Process reads ────────────────────────────────────────────────

    /// Read a process value, e.g. `slot/current` or `compute/at-slot`.
    ///
    /// Returns the raw body; the node replies with decimal text.
    pub async fn read_process_value(&self, process_id: &str, path: &str) -> Result<String, Error> {
        let url = self.process_url(process_id, path)?;
        self.get_text(url).await
    }

    // ── Cron tasks ───────────────────────────────────────────────────

    /// Schedule a single run of the process. Returns the new task id.
    pub async fn create_once(&self, process_id: &str) -> Result<String, Error> {
        let url = self.cron_path_url("once", process_id)?;
        let body = self.get_text(url).await?;
        Ok(body.trim().to_owned())
    }

    /// Schedule a recurring run of the process. Returns the new task id.
    ///
    /// `interval` uses the node's notation, e.g. `5-minutes`.
    pub async fn create_every(&self, process_id: &str, interval: &str) -> Result<String, Error> {
        let mut url = self.cron_path_url("every", process_id)?;
        url.query_pairs_mut().append_pair("interval", interval);
        let body = self.get_text(url).await?;
        Ok(body.trim().to_owned())
    }

    /// Stop a task.
    ///
    /// A non-success reply carrying the "Task not found" marker maps to
    /// [`Error::TaskNotFound`]; this is the only place the marker is read.
    pub async fn stop_task(&self, task_id: &str) -> Result<(), Error> {
        let mut url = self.cron_url("stop")?;
        url.query_pairs_mut().append_pair("task", task_id);
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        if body.contains(TASK_NOT_FOUND_MARKER) {
            return Err(Error::TaskNotFound {
                task_id: task_id.to_owned(),
            });
        }
        Err(Error::Status {
            status: status.as_u16(),
            body,
        })
    }

    /// List every task the cron device currently knows about.
    pub async fn list_tasks(&self) -> Result<Vec<CronTask>, Error> {
        let url = self.cron_url("list/serialize~json@1.0")?;
        let body = self.get_text(url).await?;

        let envelope: CronListResponse =
            serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: body.clone(),
            })?;

        if envelope.status != 200 {
            return Err(Error::Status {
                status: envelope.status,
                body,
            });
        }
        Ok(envelope.body)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and return the body of a success reply.
    async fn get_text(&self, url: Url) -> Result<String, Error> {
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;
        let status = resp.status();
        let body = resp.text().await.map_err(Error::Transport)?;

        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}
