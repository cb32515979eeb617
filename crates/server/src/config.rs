//! Server configuration from the environment.

use std::path::PathBuf;

use anyhow::bail;
use ticket_report_core::{ClientConfig, OperatorIdentity};

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";
pub const DEFAULT_TEMPLATE: &str = "template.docx";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub client: ClientConfig,
    pub identity: OperatorIdentity,
    pub template: PathBuf,
    pub bind_addr: String,
}

impl ServerConfig {
    /// Reads `TFS_ORG_URL`, `TFS_PAT`, `REPORT_DISPLAY_NAME`, `REPORT_UNIQUE_NAME`,
    /// `REPORT_TEMPLATE`, `REPORT_TIMEOUT` and `BIND_ADDR`.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let required = |key: &str| match var(key) {
            Some(value) => Ok(value),
            None => bail!("{} is not set", key),
        };

        let mut client = ClientConfig { org_url: required("TFS_ORG_URL")?, pat: required("TFS_PAT")?, ..Default::default() };
        if let Some(timeout) = var("REPORT_TIMEOUT") {
            client.timeout = match timeout.trim().parse() {
                Ok(secs) => secs,
                Err(_) => bail!("REPORT_TIMEOUT must be a number of seconds, got '{}'", timeout),
            };
        }

        Ok(Self {
            client,
            identity: OperatorIdentity::new(required("REPORT_DISPLAY_NAME")?, var("REPORT_UNIQUE_NAME").unwrap_or_default()),
            template: var("REPORT_TEMPLATE").unwrap_or_else(|| DEFAULT_TEMPLATE.to_string()).into(),
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        })
    }
}
