use anyhow::{anyhow, Context, Result};
use chrono_tz::Tz;
use std::collections::HashSet;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use tippzone_rust_core::clients::sportmonks::DEFAULT_BASE_URL;
use tippzone_rust_core::clients::telegram::DEFAULT_API_BASE_URL;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;
pub const DEFAULT_DISPATCH_SPACING_MS: u64 = 500;
pub const DEFAULT_ERROR_RECOVERY_DELAY_SECS: u64 = 5;
pub const DEFAULT_STALE_MATCH_TTL_SECS: u64 = 3 * 60 * 60;
pub const DEFAULT_DISPLAY_TIMEZONE: &str = "Europe/Budapest";

/// Leagues monitored when `LEAGUE_ALLOWLIST` is not set
pub const DEFAULT_LEAGUE_ALLOWLIST: &[i64] = &[
    2, 5, 2286, 8, 9, 12, 14, 82, 85, 88, 564, 567, 384, 387, 301, 304, 72, 74, 181, 184, 208,
    211, 244, 262, 265, 271, 274, 292, 295, 313, 325, 360, 363, 372, 375, 444, 447, 453, 456, 462,
    465, 474, 573, 579, 591, 594, 600, 603, 636, 645, 648, 651, 663, 720, 959, 968, 983, 989, 992,
    1022, 1025, 1034, 1037, 1203, 1204, 1205,
];

#[derive(Clone)]
pub struct Config {
    pub sportmonks_api_token: String,
    pub sportmonks_base_url: String,

    pub telegram_bot_token: String,
    pub telegram_api_base_url: String,
    pub telegram_channel_id: String,

    pub poll_interval: Duration,
    pub league_allowlist: HashSet<i64>,
    pub dispatch_spacing: Duration,
    pub error_recovery_delay: Duration,

    pub fetch_max_attempts: u32,
    pub http_timeout: Duration,

    pub display_timezone: Tz,
    pub stale_match_ttl: Duration,
    pub startup_message_enabled: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("sportmonks_base_url", &self.sportmonks_base_url)
            .field("telegram_api_base_url", &self.telegram_api_base_url)
            .field("telegram_channel_id", &self.telegram_channel_id)
            .field("poll_interval", &self.poll_interval)
            .field("leagues", &self.league_allowlist.len())
            .field("dispatch_spacing", &self.dispatch_spacing)
            .field("error_recovery_delay", &self.error_recovery_delay)
            .field("fetch_max_attempts", &self.fetch_max_attempts)
            .field("display_timezone", &self.display_timezone)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let sportmonks_api_token =
            require_env("SPORTMONKS_API_TOKEN").context("SportMonks API token is required")?;
        let sportmonks_base_url =
            env::var("SPORTMONKS_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let telegram_bot_token =
            require_env("TELEGRAM_BOT_TOKEN").context("Telegram bot token is required")?;
        let telegram_api_base_url =
            env::var("TELEGRAM_API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());
        let telegram_channel_id = require_env("TELEGRAM_CHANNEL_ID")
            .context("TELEGRAM_CHANNEL_ID must be set (e.g. @tippzone or -100123456789)")?;

        let poll_interval = Duration::from_secs(
            parse_u64_env("POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS).context("POLL_INTERVAL_SECS")?,
        );

        let league_allowlist = match env::var("LEAGUE_ALLOWLIST") {
            Ok(raw) => parse_league_list(&raw).context("LEAGUE_ALLOWLIST")?,
            Err(_) => DEFAULT_LEAGUE_ALLOWLIST.iter().copied().collect(),
        };

        let dispatch_spacing = Duration::from_millis(
            parse_u64_env("DISPATCH_SPACING_MS", DEFAULT_DISPATCH_SPACING_MS).context("DISPATCH_SPACING_MS")?,
        );
        let error_recovery_delay = Duration::from_secs(
            parse_u64_env("ERROR_RECOVERY_DELAY_SECS", DEFAULT_ERROR_RECOVERY_DELAY_SECS)
                .context("ERROR_RECOVERY_DELAY_SECS")?,
        );

        let fetch_max_attempts = parse_u32_env("FETCH_MAX_ATTEMPTS", 3)?;
        let http_timeout = Duration::from_secs(
            parse_u64_env("HTTP_TIMEOUT_SECS", 10).context("HTTP_TIMEOUT_SECS")?,
        );

        let display_timezone_str =
            env::var("DISPLAY_TIMEZONE").unwrap_or_else(|_| DEFAULT_DISPLAY_TIMEZONE.to_string());
        let display_timezone = parse_timezone(&display_timezone_str)?;

        let stale_match_ttl = Duration::from_secs(
            parse_u64_env("STALE_MATCH_TTL_SECS", DEFAULT_STALE_MATCH_TTL_SECS)
                .context("STALE_MATCH_TTL_SECS")?,
        );
        let startup_message_enabled = parse_bool_env("STARTUP_MESSAGE_ENABLED", true);

        Ok(Self {
            sportmonks_api_token,
            sportmonks_base_url,
            telegram_bot_token,
            telegram_api_base_url,
            telegram_channel_id,
            poll_interval,
            league_allowlist,
            dispatch_spacing,
            error_recovery_delay,
            fetch_max_attempts,
            http_timeout,
            display_timezone,
            stale_match_ttl,
            startup_message_enabled,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    let raw = env::var(key).with_context(|| format!("{key} must be set"))?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("{key} must not be empty"));
    }
    Ok(trimmed.to_string())
}

/// Comma-separated league ids. Blank entries are skipped; an empty list is rejected
/// since it would silence every match.
pub fn parse_league_list(raw: &str) -> Result<HashSet<i64>> {
    let mut leagues = HashSet::new();
    for part in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let id = part
            .parse::<i64>()
            .with_context(|| format!("Invalid league id: {part}"))?;
        leagues.insert(id);
    }
    if leagues.is_empty() {
        return Err(anyhow!("league allow-list must contain at least one id"));
    }
    Ok(leagues)
}

pub fn parse_timezone(raw: &str) -> Result<Tz> {
    Tz::from_str(raw.trim()).map_err(|_| {
        anyhow!(
            "Invalid DISPLAY_TIMEZONE: {} (expected IANA tz like Europe/Budapest)",
            raw
        )
    })
}

fn parse_bool_env(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| parse_bool(&v))
        .unwrap_or(default)
}

fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

fn parse_u64_env(key: &str, default: u64) -> Result<u64> {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<u64>()
        .with_context(|| format!("Invalid {key}: {raw} (expected integer)"))
}

fn parse_u32_env(key: &str, default: u32) -> Result<u32> {
    let value = parse_u64_env(key, u64::from(default))?;
    u32::try_from(value).with_context(|| format!("{key} out of range: {value}"))
}
