use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::catalog::FilterRules;
use crate::retry::{Backoff, RetryPolicy};
use crate::session::TransferSettings;

const MIB: u64 = 1024 * 1024;
/// Upper bound for `retry.base_delay_secs` (one hour).
const MAX_RETRY_DELAY_SECS: f64 = 3600.0;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per file (including the first).
    pub max_attempts: u32,
    /// Delay in seconds before the first retry (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
    /// "fixed" waits `base_delay_secs` every time; "exponential" doubles it per attempt.
    #[serde(default)]
    pub backoff: Backoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 1.0,
            max_delay_secs: 30,
            backoff: Backoff::Fixed,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            // Out-of-range values are rejected by `validate`; never panic here.
            base_delay: Duration::try_from_secs_f64(self.base_delay_secs.max(0.0))
                .unwrap_or(Duration::from_secs(self.max_delay_secs)),
            max_delay: Duration::from_secs(self.max_delay_secs),
            backoff: self.backoff,
        }
    }
}

/// Global configuration loaded from `~/.config/upl/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UplConfig {
    /// Upload endpoint (multipart POST target).
    pub url: String,
    /// Shared secret sent as the `key` form field.
    pub key: String,
    /// Files larger than this are rejected by the validator.
    pub max_file_size: u64,
    /// Worker pool size: maximum sessions with a request in flight.
    pub max_concurrent: usize,
    /// Bytes per request on the chunked path.
    pub chunk_size: u64,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub retry: RetryConfig,
    /// Gzip whole-file uploads when it shrinks the payload.
    pub compress: bool,
    /// Files at or below this size are never compressed.
    pub compress_threshold: u64,
    /// Gzip level, 1..=9.
    pub compression_level: u32,
    /// XOR whole-file payloads with `obfuscation_key`. Not encryption.
    pub obfuscate: bool,
    pub obfuscation_key: String,
    pub verify_tls: bool,
    pub follow_redirects: bool,
    pub user_agent: String,
    /// Server-side subdirectory used when none is given on the command line.
    pub default_subdir: String,
    /// If non-empty, only these extensions (without dot, case-insensitive) are uploaded.
    pub allowed_extensions: Vec<String>,
    pub blocked_extensions: Vec<String>,
    /// Glob patterns matched against the path relative to the scanned root.
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    /// Directories deeper than this below the scan root are skipped.
    pub max_depth: usize,
    /// Append each file's relative parent directory to the target subdirectory.
    pub preserve_structure: bool,
    pub resume_enabled: bool,
    /// Files strictly larger than this use the chunked, resumable path.
    pub resume_threshold: u64,
    /// Resume records untouched for longer than this are purged at startup.
    pub resume_max_age_hours: u64,
}

impl Default for UplConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost/upload.php".to_string(),
            key: String::new(),
            max_file_size: 100 * MIB,
            max_concurrent: 4,
            chunk_size: MIB,
            timeout_secs: 30,
            connect_timeout_secs: 15,
            retry: RetryConfig::default(),
            compress: false,
            compress_threshold: 1024,
            compression_level: 6,
            obfuscate: false,
            obfuscation_key: String::new(),
            verify_tls: true,
            follow_redirects: true,
            user_agent: default_user_agent(),
            default_subdir: String::new(),
            allowed_extensions: Vec::new(),
            blocked_extensions: Vec::new(),
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            max_depth: 10,
            preserve_structure: false,
            resume_enabled: true,
            resume_threshold: 10 * MIB,
            resume_max_age_hours: 24,
        }
    }
}

pub fn default_user_agent() -> String {
    format!("upl/{}", env!("CARGO_PKG_VERSION"))
}

impl UplConfig {
    /// Check field ranges and patterns. Run once after CLI overrides are applied.
    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.url).with_context(|| format!("invalid url {:?}", self.url))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            bail!("url must be http or https, got {}", parsed.scheme());
        }
        if self.chunk_size == 0 {
            bail!("chunk_size must be greater than 0");
        }
        if self.max_concurrent == 0 {
            bail!("max_concurrent must be at least 1");
        }
        if !(1..=9).contains(&self.compression_level) {
            bail!("compression_level must be 1..=9, got {}", self.compression_level);
        }
        if self.obfuscate && self.obfuscation_key.is_empty() {
            bail!("obfuscation enabled but obfuscation_key is empty");
        }
        let delay = self.retry.base_delay_secs;
        if !delay.is_finite() || !(0.0..=MAX_RETRY_DELAY_SECS).contains(&delay) {
            bail!(
                "retry.base_delay_secs must be between 0 and {}, got {}",
                MAX_RETRY_DELAY_SECS,
                delay
            );
        }
        if self.timeout_secs == 0 {
            bail!("timeout_secs must be greater than 0");
        }
        self.filter_rules()?;
        Ok(())
    }

    /// Additional requirement for runs that actually talk to the server.
    pub fn require_key(&self) -> Result<()> {
        if self.key.is_empty() {
            bail!("security key not configured (set `key` in config.toml or pass --key)");
        }
        Ok(())
    }

    pub fn filter_rules(&self) -> Result<FilterRules> {
        FilterRules::new(
            self.max_file_size,
            &self.allowed_extensions,
            &self.blocked_extensions,
            &self.include_patterns,
            &self.exclude_patterns,
        )
    }

    pub fn transfer_settings(&self) -> TransferSettings {
        TransferSettings {
            key: self.key.clone(),
            chunk_size: self.chunk_size,
            resume_enabled: self.resume_enabled,
            resume_threshold: self.resume_threshold,
            compress: self.compress,
            compress_threshold: self.compress_threshold,
            compression_level: self.compression_level,
            obfuscation_key: if self.obfuscate {
                Some(self.obfuscation_key.clone())
            } else {
                None
            },
        }
    }

    pub fn resume_max_age(&self) -> Duration {
        Duration::from_secs(self.resume_max_age_hours.saturating_mul(3600))
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("upl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<UplConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = UplConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from(&path)
}

/// Load configuration from an explicit file. Missing keys take their defaults.
pub fn load_from(path: &Path) -> Result<UplConfig> {
    let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: UplConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}

/// Split a comma-separated CLI list ("*.txt, *.pdf") into trimmed, non-empty items.
pub fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = UplConfig::default();
        assert_eq!(cfg.max_concurrent, 4);
        assert_eq!(cfg.max_file_size, 100 * MIB);
        assert_eq!(cfg.resume_threshold, 10 * MIB);
        assert_eq!(cfg.retry.max_attempts, 3);
        assert!(cfg.resume_enabled);
        assert!(!cfg.compress);
        assert!(cfg.user_agent.starts_with("upl/"));
        cfg.validate().unwrap();
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = UplConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: UplConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.url, cfg.url);
        assert_eq!(parsed.chunk_size, cfg.chunk_size);
        assert_eq!(parsed.retry.backoff, cfg.retry.backoff);
    }

    #[test]
    fn config_toml_partial_uses_defaults() {
        let toml = r#"
            url = "https://files.example.com/upload"
            key = "s3cret"
            max_concurrent = 8
            blocked_extensions = ["exe", "bat"]

            [retry]
            max_attempts = 5
            base_delay_secs = 0.5
            max_delay_secs = 10
            backoff = "exponential"
        "#;
        let cfg: UplConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.max_concurrent, 8);
        assert_eq!(cfg.key, "s3cret");
        assert_eq!(cfg.blocked_extensions, vec!["exe", "bat"]);
        assert_eq!(cfg.chunk_size, MIB);
        assert_eq!(cfg.retry.backoff, Backoff::Exponential);
        let policy = cfg.retry.policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_delay, Duration::from_millis(500));
        cfg.validate().unwrap();
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = UplConfig::default();
        cfg.url = "ftp://example.com/".to_string();
        assert!(cfg.validate().is_err());

        let mut cfg = UplConfig::default();
        cfg.chunk_size = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = UplConfig::default();
        cfg.compression_level = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = UplConfig::default();
        cfg.obfuscate = true;
        assert!(cfg.validate().is_err());
        cfg.obfuscation_key = "k".to_string();
        cfg.validate().unwrap();

        let mut cfg = UplConfig::default();
        cfg.include_patterns = vec!["[".to_string()];
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_unusable_retry_delay() {
        for bad in [f64::INFINITY, f64::NAN, -1.0, 1e30] {
            let mut cfg = UplConfig::default();
            cfg.retry.base_delay_secs = bad;
            assert!(cfg.validate().is_err(), "accepted {}", bad);
            // Building the policy must not panic even when unvalidated.
            let _ = cfg.retry.policy();
        }
    }

    #[test]
    fn infinite_delay_from_toml_is_rejected() {
        let toml = r#"
            [retry]
            max_attempts = 3
            base_delay_secs = inf
            max_delay_secs = 10
        "#;
        let cfg: UplConfig = toml::from_str(toml).unwrap();
        assert!(cfg.validate().is_err());
        assert_eq!(cfg.retry.policy().base_delay, Duration::from_secs(10));
    }

    #[test]
    fn require_key_only_when_empty() {
        let mut cfg = UplConfig::default();
        assert!(cfg.require_key().is_err());
        cfg.key = "abc".to_string();
        cfg.require_key().unwrap();
    }

    #[test]
    fn transfer_settings_carry_obfuscation_only_when_enabled() {
        let mut cfg = UplConfig::default();
        cfg.obfuscation_key = "k".to_string();
        assert!(cfg.transfer_settings().obfuscation_key.is_none());
        cfg.obfuscate = true;
        assert_eq!(cfg.transfer_settings().obfuscation_key.as_deref(), Some("k"));
    }

    #[test]
    fn split_list_trims_and_drops_empty() {
        assert_eq!(split_list("*.txt, *.pdf,,"), vec!["*.txt", "*.pdf"]);
        assert!(split_list("").is_empty());
    }
}
