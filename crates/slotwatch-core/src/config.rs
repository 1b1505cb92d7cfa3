// ── Runtime mirror configuration ──
//
// Describes *where* the node lives and *how often* the mirror works.
// Never touches disk: slotwatch-config or the caller builds a
// `MirrorConfig` and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

/// Node base URL used when nothing else is configured.
pub const DEFAULT_NODE_URL: &str = "http://127.0.0.1:8734";

/// Configuration for one mirror instance.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// Node base URL (e.g. `http://127.0.0.1:8734`).
    pub node_url: Url,
    /// Upper bound for each node request.
    pub timeout: Duration,
    /// How often the poller syncs every entity (seconds). 0 = never.
    pub poll_interval_secs: u64,
    /// State file used by `start`/`shutdown` autosave. `None` = in-memory only.
    pub state_path: Option<PathBuf>,
    /// How often the state file is rewritten while running (seconds). 0 = only on shutdown.
    pub autosave_interval_secs: u64,
    /// Accept self-signed node certificates.
    pub accept_invalid_certs: bool,
}

impl MirrorConfig {
    /// Config for the given node with every other knob at its default.
    pub fn for_node(node_url: Url) -> Self {
        Self {
            node_url,
            timeout: Duration::from_secs(30),
            poll_interval_secs: 60,
            state_path: None,
            autosave_interval_secs: 60,
            accept_invalid_certs: false,
        }
    }
}
