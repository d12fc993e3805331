//! Daemon configuration from environment variables
//!
//! Every variable is read as `DDNS_<NAME>`, falling back to the bare
//! `<NAME>` (e.g. `HETZNER_TOKEN`, `ZONE_1_NAME`) when the prefixed one is
//! unset. Loading goes through
//! [`DaemonConfig::from_vars`], which takes the variables as plain pairs so
//! tests never touch the process environment.

use anyhow::{Context, Result, anyhow, bail};
use ddns_core::config::{DdnsConfig, RecordConfig, RecordType, RetryConfig, ZoneConfig};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::Duration;
use tracing::Level;

/// Default IP provider
pub const DEFAULT_IP_PROVIDER: &str = "https://api.ipify.org";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Everything the daemon needs to start
pub struct DaemonConfig {
    /// Hetzner Cloud API token
    pub token: String,
    /// Engine configuration
    pub ddns: DdnsConfig,
    /// Maximum log level
    pub log_level: Level,
    /// Log output format
    pub log_format: LogFormat,
}

impl std::fmt::Debug for DaemonConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DaemonConfig")
            .field("token", &"<REDACTED>")
            .field("ddns", &self.ddns)
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .finish()
    }
}

/// Snapshot of the environment with `DDNS_`-relative lookups, bare names as
/// fallback
struct Vars {
    vars: HashMap<String, String>,
}

impl Vars {
    fn key(name: &str) -> String {
        format!("DDNS_{name}")
    }

    /// Raw value, if set (even when blank)
    fn raw(&self, name: &str) -> Option<&str> {
        self.vars
            .get(&Self::key(name))
            .or_else(|| self.vars.get(name))
            .map(String::as_str)
    }

    /// Trimmed value, `None` when unset or blank
    fn get(&self, name: &str) -> Option<&str> {
        self.raw(name).map(str::trim).filter(|v| !v.is_empty())
    }

    /// Trimmed value, falling back only when unset
    fn get_or<'a>(&'a self, name: &str, fallback: &'a str) -> &'a str {
        self.raw(name).unwrap_or(fallback).trim()
    }

    /// Indexes N of every `DDNS_ZONE_<N>_NAME` or `ZONE_<N>_NAME`, ascending
    fn zone_indexes(&self) -> Vec<u32> {
        let indexes: BTreeSet<u32> = self
            .vars
            .keys()
            .filter_map(|key| {
                key.strip_prefix("DDNS_")
                    .unwrap_or(key)
                    .strip_prefix("ZONE_")?
                    .strip_suffix("_NAME")?
                    .parse::<u32>()
                    .ok()
            })
            .filter(|index| *index > 0)
            .collect();
        indexes.into_iter().collect()
    }
}

impl DaemonConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        // Non-UTF-8 variables cannot hold any of our settings.
        Self::from_vars(
            std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?))),
        )
    }

    /// Load configuration from explicit variable pairs
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars = Vars {
            vars: vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        };

        let token = vars
            .get("HETZNER_TOKEN")
            .ok_or_else(|| anyhow!("DDNS_HETZNER_TOKEN is required"))?
            .to_string();

        let interval = parse_interval(&vars)?;
        let http_timeout = duration_var(&vars, "HTTP_TIMEOUT", "10s")?;
        let request_timeout = duration_var(&vars, "REQUEST_TIMEOUT", "20s")?;

        let default_provider = vars.get_or("IP_PROVIDER", DEFAULT_IP_PROVIDER).to_string();
        let default_type = parse_record_type(vars.get_or("RECORD_TYPE", "A"))
            .context("DDNS_RECORD_TYPE invalid")?;
        let default_ttl = ttl_var(&vars, "TTL")?;

        let attempts = int_var(&vars, "RETRY_ATTEMPTS", 3, 1, 10)?;
        let base_delay = duration_var(&vars, "RETRY_BASE_DELAY", "500ms")?;
        let max_delay = duration_var(&vars, "RETRY_MAX_DELAY", "5s")?;
        if max_delay < base_delay {
            bail!("DDNS_RETRY_MAX_DELAY must be >= DDNS_RETRY_BASE_DELAY");
        }

        let preserve_records = parse_bool(vars.get_or("PRESERVE_EXISTING_RECORDS", "true"))
            .context("DDNS_PRESERVE_EXISTING_RECORDS must be a boolean")?;

        let default_user_agent = format!("hetzner-ddns/{}", env!("CARGO_PKG_VERSION"));
        let user_agent = vars.get_or("USER_AGENT", &default_user_agent).to_string();

        let log_level = parse_log_level(vars.get_or("LOG_LEVEL", "info"))?;
        let log_format = match vars.get_or("LOG_FORMAT", "text").to_lowercase().as_str() {
            "text" => LogFormat::Text,
            "json" => LogFormat::Json,
            _ => bail!("DDNS_LOG_FORMAT must be text or json"),
        };

        let zones = parse_zones(&vars, default_type, &default_provider, default_ttl)?;
        if zones.is_empty() {
            bail!("no zones configured; use DDNS_ZONE_NAME or DDNS_ZONE_<N>_NAME");
        }

        let ddns = DdnsConfig {
            zones,
            interval,
            http_timeout,
            request_timeout,
            retry: RetryConfig {
                attempts,
                base_delay,
                max_delay,
            },
            preserve_records,
            user_agent,
        };
        ddns.validate()?;

        Ok(Self {
            token,
            ddns,
            log_level,
            log_format,
        })
    }
}

fn parse_interval(vars: &Vars) -> Result<Duration> {
    if let Some(raw) = vars.get("INTERVAL") {
        let interval = parse_duration(raw).context("DDNS_INTERVAL must be a valid duration")?;
        if interval.is_zero() {
            bail!("DDNS_INTERVAL must be greater than zero");
        }
        return Ok(interval);
    }

    match vars.get("INTERVAL_SECONDS") {
        Some(raw) => match raw.parse::<u64>() {
            Ok(seconds) if seconds > 0 => Ok(Duration::from_secs(seconds)),
            _ => bail!("DDNS_INTERVAL_SECONDS must be a positive integer"),
        },
        None => Ok(Duration::from_secs(300)),
    }
}

fn duration_var(vars: &Vars, name: &str, fallback: &str) -> Result<Duration> {
    let value = parse_duration(vars.get_or(name, fallback))
        .with_context(|| format!("DDNS_{name} must be a valid duration"))?;
    if value.is_zero() {
        bail!("DDNS_{name} must be greater than zero");
    }
    Ok(value)
}

fn int_var(vars: &Vars, name: &str, fallback: u32, min: u32, max: u32) -> Result<u32> {
    let value = match vars.raw(name) {
        Some(raw) => raw
            .trim()
            .parse::<u32>()
            .map_err(|_| anyhow!("DDNS_{name} must be an integer"))?,
        None => fallback,
    };
    if !(min..=max).contains(&value) {
        bail!("DDNS_{name} must be between {min} and {max}");
    }
    Ok(value)
}

fn ttl_var(vars: &Vars, name: &str) -> Result<Option<u32>> {
    let Some(raw) = vars.get(name) else {
        return Ok(None);
    };
    let value: i64 = raw
        .parse()
        .map_err(|_| anyhow!("DDNS_{name} must be an integer (seconds)"))?;
    if value <= 0 {
        bail!("DDNS_{name} must be greater than zero");
    }
    let ttl = u32::try_from(value).map_err(|_| anyhow!("DDNS_{name} is too large"))?;
    Ok(Some(ttl))
}

fn parse_record_type(value: &str) -> Result<RecordType> {
    value
        .parse::<RecordType>()
        .map_err(|_| anyhow!("record type must be A or AAAA, got {value:?}"))
}

fn parse_log_level(value: &str) -> Result<Level> {
    match value.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => bail!("DDNS_LOG_LEVEL must be trace, debug, info, warn, or error"),
    }
}

/// Parse a boolean in any of the accepted spellings
pub fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "on" => Ok(true),
        "false" | "0" | "no" | "n" | "off" => Ok(false),
        other => bail!("not a boolean: {other:?}"),
    }
}

/// Parse a duration such as `500ms`, `5s`, `1m30s` or `2h`
///
/// A sequence of decimal numbers, each with an optional fraction and a
/// unit: `ns`, `us` (or `µs`), `ms`, `s`, `m`, `h`. A bare `0` is accepted.
pub fn parse_duration(value: &str) -> Result<Duration> {
    let s = value.trim();
    if s.is_empty() {
        bail!("empty duration");
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total = Duration::ZERO;
    let mut rest = s;

    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            bail!("invalid duration {s:?}: expected number");
        }
        let number: f64 = rest[..number_len]
            .parse()
            .map_err(|_| anyhow!("invalid duration {s:?}: bad number"))?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let nanos_per_unit: f64 = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            "" => bail!("invalid duration {s:?}: missing unit"),
            unit => bail!("invalid duration {s:?}: unknown unit {unit:?}"),
        };
        rest = &rest[unit_len..];

        total += Duration::from_nanos((number * nanos_per_unit).round() as u64);
    }

    Ok(total)
}

/// Parse a record list: `name` or `name:ttl`, comma separated
///
/// Blank entries are skipped and a repeated name keeps its first occurrence.
/// An empty input falls back to `fallback`.
pub fn parse_records(value: &str, fallback: &str) -> Result<Vec<RecordConfig>> {
    let raw = match value.trim() {
        "" => fallback,
        trimmed => trimmed,
    };

    let mut seen = HashSet::new();
    let mut records = Vec::new();

    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (name, ttl) = match part.split_once(':') {
            Some((name, ttl)) => {
                let ttl = ttl.trim();
                if ttl.is_empty() {
                    bail!("record {part:?} has empty ttl");
                }
                let ttl = match ttl.parse::<u32>() {
                    Ok(ttl) if ttl > 0 => ttl,
                    _ => bail!("record {part:?} has invalid ttl"),
                };
                (name.trim(), Some(ttl))
            }
            None => (part, None),
        };

        if name.is_empty() || !seen.insert(name.to_string()) {
            continue;
        }

        let record = RecordConfig::new(name);
        records.push(match ttl {
            Some(ttl) => record.with_ttl(ttl),
            None => record,
        });
    }

    Ok(records)
}

fn parse_zones(
    vars: &Vars,
    default_type: RecordType,
    default_provider: &str,
    default_ttl: Option<u32>,
) -> Result<Vec<ZoneConfig>> {
    let indexes = vars.zone_indexes();

    if indexes.is_empty() {
        let Some(name) = vars.get("ZONE_NAME") else {
            return Ok(Vec::new());
        };
        let records = parse_records(vars.raw("RECORDS").unwrap_or(""), "@")
            .context("DDNS_RECORDS invalid")?;
        if records.is_empty() {
            bail!("DDNS_RECORDS resolved to empty list");
        }
        return Ok(vec![build_zone(name, default_type, default_provider, default_ttl, records)]);
    }

    if vars.get("ZONE_NAME").is_some() {
        bail!("cannot mix DDNS_ZONE_NAME with DDNS_ZONE_<N>_NAME");
    }

    let mut zones = Vec::with_capacity(indexes.len());
    for index in indexes {
        let prefix = format!("ZONE_{index}_");
        let name = vars
            .get(&format!("{prefix}NAME"))
            .ok_or_else(|| anyhow!("DDNS_{prefix}NAME is required"))?;

        let records = parse_records(vars.raw(&format!("{prefix}RECORDS")).unwrap_or(""), "@")
            .with_context(|| format!("DDNS_{prefix}RECORDS invalid"))?;
        if records.is_empty() {
            bail!("DDNS_{prefix}RECORDS resolved to empty list");
        }

        let record_type = match vars.get(&format!("{prefix}RECORD_TYPE")) {
            Some(raw) => parse_record_type(raw)
                .with_context(|| format!("DDNS_{prefix}RECORD_TYPE invalid"))?,
            None => default_type,
        };
        let ttl = ttl_var(vars, &format!("{prefix}TTL"))?.or(default_ttl);
        let provider = vars
            .get(&format!("{prefix}IP_PROVIDER"))
            .unwrap_or(default_provider);

        zones.push(build_zone(name, record_type, provider, ttl, records));
    }

    Ok(zones)
}

fn build_zone(
    name: &str,
    record_type: RecordType,
    provider: &str,
    ttl: Option<u32>,
    records: Vec<RecordConfig>,
) -> ZoneConfig {
    let zone = records.into_iter().fold(
        ZoneConfig::new(name, record_type, provider),
        ZoneConfig::with_record,
    );
    match ttl {
        Some(ttl) => zone.with_ttl(ttl),
        None => zone,
    }
}
