//! Configuration data structures for the gateway.
//!
//! Every field maps to an environment variable of the same name in upper case
//! (`ERP_URL` -> `erp_url`) and may also be supplied from an optional config
//! file. Defaults keep a bare environment with only the three required values
//! working. The resulting [`GatewayConfig`] is immutable once loaded.
use serde::{Deserialize, Serialize};

fn default_frontend_url() -> String {
    "*".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_site_name() -> String {
    "frontend".to_string()
}

fn default_site_header() -> String {
    "X-Frappe-Site-Name".to_string()
}

fn default_upstream_timeout_secs() -> u64 {
    30
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_static_dir() -> String {
    "dist".to_string()
}

fn default_diagnostics() -> bool {
    true
}

/// What happens when a required value is missing at startup.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConfigMode {
    /// Refuse to start.
    #[default]
    Strict,
    /// Start anyway and report the gap through the health endpoint.
    Permissive,
}

/// Whether the gateway names the target site itself or leaves it to a
/// routing layer in front of the upstream.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SiteIdentityMode {
    /// Send the site header and override `Host` with the site name.
    #[default]
    Inject,
    /// Send neither; the upstream side resolves the site.
    Upstream,
}

/// Treatment of the `Expect` request header.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExpectPolicy {
    /// Drop the header entirely.
    #[default]
    Strip,
    /// Send it with an empty value.
    Empty,
}

/// How inbound request bodies travel to the upstream.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BodyMode {
    /// Read the whole body, decode it, and re-encode JSON before sending.
    #[default]
    Buffered,
    /// Forward the body stream byte-for-byte.
    Streaming,
}

/// How upstream responses on the API prefix are relayed.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResponseRelay {
    /// Parse the body as JSON and re-emit it with the upstream status.
    #[default]
    Json,
    /// Stream status, headers and body through untouched.
    Passthrough,
}

/// Log output format.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Process-wide gateway configuration.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    /// Upstream base URL, e.g. `http://backend:8000`.
    #[serde(default)]
    pub erp_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_secret: Option<String>,
    /// Allowed cross-origin caller; `*` allows any.
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default)]
    pub config_mode: ConfigMode,
    #[serde(default)]
    pub site_identity: SiteIdentityMode,
    #[serde(default = "default_site_name")]
    pub site_name: String,
    #[serde(default = "default_site_header")]
    pub site_header: String,
    #[serde(default)]
    pub expect_header: ExpectPolicy,
    #[serde(default)]
    pub body_mode: BodyMode,
    #[serde(default)]
    pub api_response: ResponseRelay,
    /// Bound on retrieval (GET/HEAD) calls to the upstream.
    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,
    /// Largest inbound body accepted in buffered mode.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Directory holding the frontend bundle.
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
    /// Expose the upstream probe endpoint.
    #[serde(default = "default_diagnostics")]
    pub diagnostics: bool,
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            erp_url: None,
            api_key: None,
            api_secret: None,
            frontend_url: default_frontend_url(),
            port: default_port(),
            bind_addr: default_bind_addr(),
            config_mode: ConfigMode::default(),
            site_identity: SiteIdentityMode::default(),
            site_name: default_site_name(),
            site_header: default_site_header(),
            expect_header: ExpectPolicy::default(),
            body_mode: BodyMode::default(),
            api_response: ResponseRelay::default(),
            upstream_timeout_secs: default_upstream_timeout_secs(),
            max_body_bytes: default_max_body_bytes(),
            static_dir: default_static_dir(),
            diagnostics: default_diagnostics(),
            log_format: LogFormat::default(),
        }
    }
}

impl GatewayConfig {
    /// Treat blank values as unset and drop trailing slashes from the
    /// upstream base so that path concatenation never doubles them.
    pub fn normalized(mut self) -> Self {
        fn blank_to_none(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.trim().is_empty())
        }

        self.erp_url = blank_to_none(self.erp_url).map(|url| url.trim_end_matches('/').to_string());
        self.api_key = blank_to_none(self.api_key);
        self.api_secret = blank_to_none(self.api_secret);
        if self.frontend_url.trim().is_empty() {
            self.frontend_url = default_frontend_url();
        }
        self
    }

    /// The credential pair, if both halves are configured.
    pub fn credentials(&self) -> Option<Credentials<'_>> {
        match (self.api_key.as_deref(), self.api_secret.as_deref()) {
            (Some(key), Some(secret)) => Some(Credentials { key, secret }),
            _ => None,
        }
    }

    pub fn upstream_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.upstream_timeout_secs)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    /// Presence of each required value, safe to expose.
    pub fn presence(&self) -> ConfigPresence {
        ConfigPresence {
            erp_url: Presence::of(&self.erp_url),
            api_key: Presence::of(&self.api_key),
            api_secret: Presence::of(&self.api_secret),
        }
    }
}

/// Borrowed view of the upstream credential pair.
#[derive(Clone, Copy)]
pub struct Credentials<'a> {
    pub key: &'a str,
    pub secret: &'a str,
}

impl Credentials<'_> {
    /// Value of the upstream `Authorization` header.
    pub fn header_value(&self) -> String {
        format!("token {}:{}", self.key, self.secret)
    }
}

impl std::fmt::Debug for Credentials<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    Configured,
    Missing,
}

impl Presence {
    fn of(value: &Option<String>) -> Self {
        if value.is_some() {
            Presence::Configured
        } else {
            Presence::Missing
        }
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPresence {
    pub erp_url: Presence,
    pub api_key: Presence,
    pub api_secret: Presence,
}
