use std::env;
use std::str::FromStr;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Where appointments and schedule templates are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Memory,
    Supabase,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" | "in_memory" => Ok(StorageBackend::Memory),
            "supabase" | "postgrest" => Ok(StorageBackend::Supabase),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub storage_backend: StorageBackend,
    pub server_port: u16,
    /// Role name that bypasses the appointment mutation legality rules.
    pub privileged_role: String,
    pub default_slot_window_start: NaiveTime,
    pub default_slot_window_end: NaiveTime,
    pub default_slot_minutes: i32,
    pub reject_overlapping_blocks: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_jwt_secret: String::new(),
            storage_backend: StorageBackend::Memory,
            server_port: 3000,
            privileged_role: "super_admin".to_string(),
            default_slot_window_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            default_slot_window_end: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
            default_slot_minutes: 30,
            reject_overlapping_blocks: true,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let supabase_url = env::var("SUPABASE_URL").unwrap_or_else(|_| {
            warn!("SUPABASE_URL not set, using empty value");
            String::new()
        });
        let supabase_anon_key = env::var("SUPABASE_ANON_PUBLIC_KEY").unwrap_or_else(|_| {
            warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
            String::new()
        });
        let supabase_jwt_secret = env::var("SUPABASE_JWT_SECRET").unwrap_or_else(|_| {
            warn!("SUPABASE_JWT_SECRET not set, using empty value");
            String::new()
        });

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(value) => value.parse().unwrap_or_else(|e: String| {
                warn!("{}, falling back to in-memory storage", e);
                StorageBackend::Memory
            }),
            Err(_) if !supabase_url.is_empty() && !supabase_anon_key.is_empty() => {
                StorageBackend::Supabase
            }
            Err(_) => {
                warn!("STORAGE_BACKEND not set and Supabase unconfigured, using in-memory storage");
                StorageBackend::Memory
            }
        };

        let config = Self {
            supabase_url,
            supabase_anon_key,
            supabase_jwt_secret,
            storage_backend,
            server_port: parse_var("SERVER_PORT", defaults.server_port),
            privileged_role: env::var("PRIVILEGED_ROLE").unwrap_or(defaults.privileged_role),
            default_slot_window_start: parse_time_var(
                "DEFAULT_SLOT_WINDOW_START",
                defaults.default_slot_window_start,
            ),
            default_slot_window_end: parse_time_var(
                "DEFAULT_SLOT_WINDOW_END",
                defaults.default_slot_window_end,
            ),
            default_slot_minutes: parse_var("DEFAULT_SLOT_MINUTES", defaults.default_slot_minutes),
            reject_overlapping_blocks: parse_var(
                "SCHEDULE_REJECT_OVERLAPS",
                defaults.reject_overlapping_blocks,
            ),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_jwt_secret.is_empty()
            && (self.storage_backend == StorageBackend::Memory || self.is_supabase_configured())
    }

    pub fn is_supabase_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }
}

fn parse_var<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value '{}', using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

fn parse_time_var(key: &str, default: NaiveTime) -> NaiveTime {
    match env::var(key) {
        Ok(raw) => NaiveTime::parse_from_str(raw.trim(), "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw.trim(), "%H:%M:%S"))
            .unwrap_or_else(|_| {
                warn!("{} has an invalid time '{}', using default", key, raw);
                default
            }),
        Err(_) => default,
    }
}
