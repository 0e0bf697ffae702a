// Configuration types module
// Defines all configuration-related data structures

use crate::content::PrecompressedFormat;
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    #[serde(default)]
    pub resources: ResourcesConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
    #[serde(default)]
    pub max_connections: Option<u64>,
    /// Chunk size used when streaming file bodies
    #[serde(default = "default_output_buffer_size")]
    pub output_buffer_size: usize,
}

#[allow(clippy::missing_const_for_fn)]
fn default_output_buffer_size() -> usize {
    32 * 1024
}

/// Static resource configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ResourcesConfig {
    /// Base directory resources are served from
    #[serde(default = "default_root")]
    pub root: String,
    #[serde(default = "default_true")]
    pub etags: bool,
    /// Render a listing for directories without a welcome file
    #[serde(default = "default_true")]
    pub dir_allowed: bool,
    #[serde(default = "default_true")]
    pub accept_ranges: bool,
    /// `Cache-Control` value added to resource responses
    #[serde(default)]
    pub cache_control: Option<String>,
    /// Path suffixes that are already gzip data (e.g. `.svgz`)
    #[serde(default = "default_gzip_equivalent_extensions")]
    pub gzip_equivalent_extensions: Vec<String>,
    #[serde(default = "default_welcome_files")]
    pub welcome_files: Vec<String>,
    /// Redirect to the welcome file instead of serving it in place
    #[serde(default)]
    pub redirect_welcome: bool,
    /// Precompressed sibling formats, in preference order
    #[serde(default = "PrecompressedFormat::defaults")]
    pub precompressed: Vec<PrecompressedFormat>,
    /// Bound of the `Accept-Encoding` negotiation cache (0 disables it)
    #[serde(default = "default_encoding_cache_size")]
    pub encoding_cache_size: usize,
    /// Server-side encoding preference; empty means the order of `precompressed`
    #[serde(default)]
    pub preferred_encoding_order: Vec<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_root() -> String {
    "./static".to_string()
}

#[allow(clippy::missing_const_for_fn)]
fn default_true() -> bool {
    true
}

#[allow(clippy::missing_const_for_fn)]
fn default_gzip_equivalent_extensions() -> Vec<String> {
    vec![".svgz".to_string()]
}

#[allow(clippy::missing_const_for_fn)]
fn default_welcome_files() -> Vec<String> {
    vec!["index.html".to_string()]
}

#[allow(clippy::missing_const_for_fn)]
fn default_encoding_cache_size() -> usize {
    crate::content::negotiator::DEFAULT_CACHE_SIZE
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            etags: true,
            dir_allowed: true,
            accept_ranges: true,
            cache_control: None,
            gzip_equivalent_extensions: default_gzip_equivalent_extensions(),
            welcome_files: default_welcome_files(),
            redirect_welcome: false,
            precompressed: PrecompressedFormat::defaults(),
            encoding_cache_size: default_encoding_cache_size(),
            preferred_encoding_order: Vec::new(),
        }
    }
}
