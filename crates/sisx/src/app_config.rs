//! 🔧 App Configuration: the sacred dotenv-to-struct pipeline.
//!
//! 📡 "Config not found: We looked everywhere. Under the couch. Behind the fridge.
//! In `.env.secret`. Nothing." (every on-call engineer, 3am) 🦆
//!
//! 🏗️ Powered by Figment, because hand-merging three layers of key/value soup is a
//! form of self-harm that even the borrow checker wouldn't approve of.
//!
//! 🧠 Knowledge graph:
//! - Layers, lowest to highest: serde defaults < dotenv files (in the order given,
//!   usually `.env.shared` then `.env.secret`) < the process environment. Env wins.
//! - Keys are case-insensitive: everything is lowercased before Figment sees it, so
//!   `SISEDO_HOST`, `sisedo_host` and `Sisedo_Host` all land in [`AppConfig::sisedo_host`].
//! - Dotenv files are *parsed*, never loaded into the process environment. No
//!   `set_var`, no spooky action at a distance, tests stay hermetic.
//! - Every layer is strings, so numeric knobs go through [`lenient::parsed`].
//! - The result is immutable and handed to every component explicitly. No globals.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono_tz::Tz;
use figment::{Figment, providers::Serialized};
use serde::Deserialize;
use tracing::{debug, info};

use crate::serializer::OutputFormat;

/// 📂 The dotenv files we look for when nobody tells us otherwise. Later wins.
pub const DEFAULT_DOTENV_FILES: [&str; 2] = [".env.shared", ".env.secret"];

/// 📦 The AppConfig: one flat struct to rule them all.
///
/// Mirrors the flat key/value mapping the job has always been configured with,
/// plus a handful of extraction knobs that used to be hardcoded constants.
#[derive(Deserialize, Clone)]
pub struct AppConfig {
    /// 🏛️ Source database host.
    #[serde(default)]
    pub sisedo_host: String,
    #[serde(default = "default_sisedo_port", deserialize_with = "lenient::parsed")]
    pub sisedo_port: u16,
    #[serde(default)]
    pub sisedo_un: String,
    /// 🔒 "password123" is not a password. It is a confession.
    #[serde(default)]
    pub sisedo_pw: String,
    #[serde(default)]
    pub sisedo_sid: String,

    /// 🌎 Region for both S3 and STS.
    #[serde(default = "default_aws_region")]
    pub aws_region: String,
    /// 🎭 When present and non-empty, we trade it for temporary credentials.
    #[serde(default)]
    pub aws_role_arn: Option<String>,
    #[serde(default)]
    pub aws_access_key_id: Option<String>,
    #[serde(default)]
    pub aws_secret_access_key: Option<String>,
    /// 🧪 S3-compatible endpoint override (path-style). Handy for local stacks and tests.
    #[serde(default)]
    pub aws_endpoint_url: Option<String>,

    /// 🪣 Comma-separated destination buckets. Absent = fatal, see [`AppConfig::target_buckets`].
    #[serde(default)]
    pub targets: Option<String>,

    /// 📦 Rows per batch for paginated queries.
    #[serde(default = "default_batch_size", deserialize_with = "lenient::parsed")]
    pub batch_size: u64,
    /// ⏪ How far back the recent refresh looks, in days.
    #[serde(
        default = "default_recent_refresh_cutoff_days",
        deserialize_with = "lenient::parsed"
    )]
    pub recent_refresh_cutoff_days: i64,
    /// 🗓️ How many terms the active-term lookup may return.
    #[serde(default = "default_current_term_limit", deserialize_with = "lenient::parsed")]
    pub current_term_limit: u32,
    #[serde(default, deserialize_with = "lenient::parsed")]
    pub output_format: OutputFormat,
    /// 🕰️ Comma-separated column names whose timestamps are really local wall-clock time.
    #[serde(default = "default_local_time_columns")]
    pub local_time_columns: String,
    #[serde(default = "default_local_timezone")]
    pub local_timezone: String,
}

// 🏛️ The Oracle listener's favorite number since forever.
fn default_sisedo_port() -> u16 {
    1521
}

fn default_aws_region() -> String {
    "us-west-2".to_string()
}

// 📦 120k rows per batch: big enough to be fast, small enough that the source DBA
// doesn't learn our names.
fn default_batch_size() -> u64 {
    120_000
}

fn default_recent_refresh_cutoff_days() -> i64 {
    1
}

fn default_current_term_limit() -> u32 {
    3
}

fn default_local_time_columns() -> String {
    "last_updated".to_string()
}

fn default_local_timezone() -> String {
    "America/Los_Angeles".to_string()
}

/// 🔑 Long-lived access keys, when that's what we were given.
#[derive(Clone, PartialEq)]
pub struct StaticKeys {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl fmt::Debug for StaticKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticKeys")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

// 🐛 Hand-rolled Debug so `{:?}` on the config never leaks a password into the logs.
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("sisedo_host", &self.sisedo_host)
            .field("sisedo_port", &self.sisedo_port)
            .field("sisedo_un", &self.sisedo_un)
            .field("sisedo_pw", &"<redacted>")
            .field("sisedo_sid", &self.sisedo_sid)
            .field("aws_region", &self.aws_region)
            .field("aws_role_arn", &self.aws_role_arn)
            .field("aws_access_key_id", &self.aws_access_key_id)
            .field("aws_secret_access_key", &"<redacted>")
            .field("aws_endpoint_url", &self.aws_endpoint_url)
            .field("targets", &self.targets)
            .field("batch_size", &self.batch_size)
            .field("recent_refresh_cutoff_days", &self.recent_refresh_cutoff_days)
            .field("current_term_limit", &self.current_term_limit)
            .field("output_format", &self.output_format)
            .field("local_time_columns", &self.local_time_columns)
            .field("local_timezone", &self.local_timezone)
            .finish()
    }
}

impl AppConfig {
    /// 🪣 Parse the destination bucket list.
    ///
    /// 💀 No list, or a list of nothing but commas and whitespace, is a fatal
    /// configuration error. We refuse to extract data we have nowhere to put.
    pub fn target_buckets(&self) -> Result<Vec<String>> {
        let buckets: Vec<String> = self
            .targets
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|bucket| !bucket.is_empty())
            .map(str::to_string)
            .collect();
        if buckets.is_empty() {
            return Err(anyhow!(
                "💀 No S3 targets specified, aborting. Set TARGETS to a comma-separated list of buckets."
            ));
        }
        Ok(buckets)
    }

    /// 🎭 The role to assume, if any. Empty strings count as "no role".
    pub fn role_arn(&self) -> Option<&str> {
        non_empty(self.aws_role_arn.as_deref())
    }

    /// 🔑 Static access keys, only when both halves are present.
    pub fn static_keys(&self) -> Option<StaticKeys> {
        let access_key_id = non_empty(self.aws_access_key_id.as_deref())?;
        let secret_access_key = non_empty(self.aws_secret_access_key.as_deref())?;
        Some(StaticKeys {
            access_key_id: access_key_id.to_string(),
            secret_access_key: secret_access_key.to_string(),
        })
    }

    pub fn endpoint_url(&self) -> Option<&str> {
        non_empty(self.aws_endpoint_url.as_deref())
    }

    /// 🕰️ The "really local time" column names, trimmed, empties dropped.
    pub fn local_time_column_list(&self) -> Vec<String> {
        self.local_time_columns
            .split(',')
            .map(str::trim)
            .filter(|column| !column.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// 🌎 Resolve the configured IANA zone name.
    pub fn local_tz(&self) -> Result<Tz> {
        self.local_timezone
            .trim()
            .parse::<Tz>()
            .map_err(|err| anyhow!("{err}"))
            .context(format!(
                "💀 LOCAL_TIMEZONE '{}' is not a time zone we recognize. Try something like 'America/Los_Angeles'.",
                self.local_timezone
            ))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// 🚀 Load the config from the given dotenv files and the real process environment.
pub fn load_config(dotenv_files: &[PathBuf]) -> Result<AppConfig> {
    load_config_from(dotenv_files, std::env::vars())
}

/// 🔧 Load the config from dotenv files plus an explicit environment snapshot.
///
/// Missing dotenv files are skipped with a debug log; unreadable or malformed ones
/// are an error. The environment snapshot always wins.
pub fn load_config_from(
    dotenv_files: &[PathBuf],
    env: impl IntoIterator<Item = (String, String)>,
) -> Result<AppConfig> {
    info!("🔧 Loading configuration from {} dotenv layer(s) + environment", dotenv_files.len());

    let mut config = Figment::new();
    for path in dotenv_files {
        if !path.exists() {
            debug!("🌱 dotenv layer '{}' not found, skipping", path.display());
            continue;
        }
        config = config.merge(Serialized::defaults(read_dotenv_layer(path)?));
    }

    let env_layer: BTreeMap<String, String> = env
        .into_iter()
        .map(|(key, value)| (key.to_lowercase(), value))
        .collect();
    config = config.merge(Serialized::defaults(env_layer));

    config.extract().context(
        "💀 Failed to assemble configuration from dotenv files and environment variables. \
         One of the values has the wrong shape; the cause below names the key.",
    )
}

fn read_dotenv_layer(path: &Path) -> Result<BTreeMap<String, String>> {
    let mut layer = BTreeMap::new();
    let entries = dotenvy::from_path_iter(path)
        .with_context(|| format!("💀 Couldn't open dotenv file '{}'", path.display()))?;
    for entry in entries {
        let (key, value) = entry
            .with_context(|| format!("💀 Malformed line in dotenv file '{}'", path.display()))?;
        layer.insert(key.to_lowercase(), value);
    }
    Ok(layer)
}

/// 🧶 Deserializers that don't care whether a value showed up as a string or a number.
mod lenient {
    use std::fmt::Display;
    use std::str::FromStr;

    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Unsigned(u64),
        Signed(i64),
    }

    pub(super) fn parsed<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: FromStr,
        T::Err: Display,
    {
        let raw = match StringOrNumber::deserialize(deserializer)? {
            StringOrNumber::String(s) => s,
            StringOrNumber::Unsigned(u) => u.to_string(),
            StringOrNumber::Signed(i) => i.to_string(),
        };
        raw.trim().parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::fs;

    /// 🧪 Build a config from literal key/value pairs, no files, no real env.
    pub(crate) fn config_from_pairs(pairs: &[(&str, &str)]) -> AppConfig {
        load_config_from(
            &[],
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())),
        )
        .expect("💀 Test config should parse. The fixture betrayed us.")
    }

    #[test]
    fn the_one_where_defaults_show_up_uninvited_but_helpful() {
        let config = config_from_pairs(&[]);
        assert_eq!(config.sisedo_port, 1521);
        assert_eq!(config.batch_size, 120_000);
        assert_eq!(config.recent_refresh_cutoff_days, 1);
        assert_eq!(config.current_term_limit, 3);
        assert_eq!(config.output_format, OutputFormat::Tsv);
        assert_eq!(config.local_time_column_list(), vec!["last_updated"]);
        assert_eq!(config.local_tz().unwrap(), chrono_tz::America::Los_Angeles);
        assert!(config.role_arn().is_none());
        assert!(config.static_keys().is_none());
    }

    #[test]
    fn the_one_where_the_environment_outranks_both_dotenv_files() {
        let dir = tempfile::tempdir().unwrap();
        let shared = dir.path().join(".env.shared");
        let secret = dir.path().join(".env.secret");
        fs::write(&shared, "SISEDO_HOST=shared-host\nSISEDO_SID=SHARED\nBATCH_SIZE=10\nTARGETS=from-shared\n").unwrap();
        fs::write(&secret, "SISEDO_SID=SECRET\nSISEDO_PW=hunter2\nTARGETS=from-secret\n").unwrap();

        let config = load_config_from(
            &[shared, secret],
            vec![("TARGETS".to_string(), "bucket-a, bucket-b".to_string())],
        )
        .unwrap();

        assert_eq!(config.sisedo_host, "shared-host");
        assert_eq!(config.sisedo_sid, "SECRET");
        assert_eq!(config.sisedo_pw, "hunter2");
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.target_buckets().unwrap(), vec!["bucket-a", "bucket-b"]);
    }

    #[test]
    fn the_one_where_a_missing_dotenv_file_is_just_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let ghost = dir.path().join(".env.ghost");
        let config = load_config_from(&[ghost], vec![("SISEDO_PORT".into(), "1600".into())]).unwrap();
        assert_eq!(config.sisedo_port, 1600);
    }

    #[test]
    fn the_one_where_nonsense_numbers_are_rejected() {
        let result = load_config_from(&[], vec![("BATCH_SIZE".into(), "lots".into())]);
        assert!(result.is_err(), "'lots' is not a batch size, no matter how confident it sounds");
    }

    #[test]
    fn the_one_where_targets_are_required_and_trimmed() {
        let missing = config_from_pairs(&[]);
        assert!(missing.target_buckets().is_err());

        let only_commas = config_from_pairs(&[("TARGETS", " , ,")]);
        assert!(only_commas.target_buckets().is_err());

        let fine = config_from_pairs(&[("TARGETS", "a,,b ,c")]);
        assert_eq!(fine.target_buckets().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn the_one_where_empty_role_means_no_role() {
        let config = config_from_pairs(&[
            ("AWS_ROLE_ARN", "  "),
            ("AWS_ACCESS_KEY_ID", "AKIA123"),
            ("AWS_SECRET_ACCESS_KEY", "shh"),
        ]);
        assert!(config.role_arn().is_none());
        let keys = config.static_keys().unwrap();
        assert_eq!(keys.access_key_id, "AKIA123");
        assert!(!format!("{keys:?}").contains("shh"));
    }

    #[test]
    fn the_one_where_debug_output_keeps_secrets_secret() {
        let config = config_from_pairs(&[("SISEDO_PW", "hunter2"), ("OUTPUT_FORMAT", "CSV")]);
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert_eq!(config.output_format, OutputFormat::Csv);
    }

    #[test]
    fn the_one_where_an_imaginary_timezone_is_caught() {
        let config = config_from_pairs(&[("LOCAL_TIMEZONE", "Mars/Olympus_Mons")]);
        assert!(config.local_tz().is_err());
    }
}
