use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: String,
    pub notification_webhook_url: Option<String>,
    pub scheduling: SchedulingConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, using empty value");
                    String::new()
                }),
            notification_webhook_url: env::var("NOTIFICATION_WEBHOOK_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            scheduling: SchedulingConfig::from_env(),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_service_role_key.is_empty()
    }
}

/// How a free provider is chosen when several could take a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStrategy {
    FirstAvailable,
    LeastLoaded,
}

impl FromStr for AssignmentStrategy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "first_available" | "first-available" => Ok(Self::FirstAvailable),
            "least_loaded" | "least-loaded" => Ok(Self::LeastLoaded),
            other => Err(format!("unknown assignment strategy: {}", other)),
        }
    }
}

/// Tunables of the availability engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulingConfig {
    pub slot_granularity_minutes: u32,
    /// Upper bound for durations derived from an `END_TIME:` annotation.
    pub max_derived_duration_minutes: u32,
    pub search_horizon_days: u32,
    pub default_service_minutes: u32,
    pub legacy_block_minutes: u32,
    pub min_layout_height_percent: f64,
    pub assignment_strategy: AssignmentStrategy,
    /// Offset of the practice's wall clock from UTC, used to derive `now`.
    pub utc_offset_minutes: i32,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            slot_granularity_minutes: 10,
            max_derived_duration_minutes: 480,
            search_horizon_days: 14,
            default_service_minutes: 60,
            legacy_block_minutes: 30,
            min_layout_height_percent: 2.0,
            assignment_strategy: AssignmentStrategy::FirstAvailable,
            utc_offset_minutes: 0,
        }
    }
}

impl SchedulingConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            slot_granularity_minutes: env_or("SCHEDULING_SLOT_MINUTES", defaults.slot_granularity_minutes),
            max_derived_duration_minutes: env_or(
                "SCHEDULING_MAX_DERIVED_DURATION_MINUTES",
                defaults.max_derived_duration_minutes,
            ),
            search_horizon_days: env_or("SCHEDULING_SEARCH_HORIZON_DAYS", defaults.search_horizon_days),
            default_service_minutes: env_or(
                "SCHEDULING_DEFAULT_SERVICE_MINUTES",
                defaults.default_service_minutes,
            ),
            legacy_block_minutes: env_or("SCHEDULING_LEGACY_BLOCK_MINUTES", defaults.legacy_block_minutes),
            min_layout_height_percent: env_or(
                "SCHEDULING_MIN_LAYOUT_HEIGHT_PERCENT",
                defaults.min_layout_height_percent,
            ),
            assignment_strategy: env_or("SCHEDULING_ASSIGNMENT_STRATEGY", defaults.assignment_strategy),
            utc_offset_minutes: env_or("SCHEDULING_UTC_OFFSET_MINUTES", defaults.utc_offset_minutes),
        };

        if config.slot_granularity_minutes == 0 {
            warn!("SCHEDULING_SLOT_MINUTES must be positive, using default");
            return Self {
                slot_granularity_minutes: defaults.slot_granularity_minutes,
                ..config
            };
        }

        config
    }
}

fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value '{}', using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}
