use anyhow::anyhow;
use chrono::{NaiveTime, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_hours: u64,
    pub time_zone: Tz,
    pub workday: WorkdayRules,
}

/// Business-hour knobs shared by AttendanceTracker and RequestWorkflow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WorkdayRules {
    /// Day of week on which no check-ins are accepted and which leave-hour
    /// derivation skips.
    pub non_working_weekday: Weekday,
    /// Start of the on-time window.
    pub on_time_cutoff: NaiveTime,
    /// Minutes past the cutoff still counted as on time.
    pub grace_minutes: u32,
    /// Wall-clock time the auto-checkout batch closes open sessions at.
    pub standard_checkout: NaiveTime,
    /// Hours in one standard workday; leave above this forces admin approval.
    pub workday_hours: f64,
}

impl Default for WorkdayRules {
    fn default() -> Self {
        Self {
            non_working_weekday: Weekday::Sun,
            on_time_cutoff: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            grace_minutes: 30,
            standard_checkout: NaiveTime::from_hms_opt(17, 30, 0).unwrap(),
            workday_hours: 8.0,
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/workforce".to_string());

        let jwt_secret = env::var("JWT_SECRET")
            .unwrap_or_else(|_| "your-secret-key-change-this-in-production".to_string());

        let jwt_expiration_hours = env::var("JWT_EXPIRATION_HOURS")
            .unwrap_or_else(|_| "1".to_string())
            .parse()
            .unwrap_or(1);

        let time_zone_name = env::var("APP_TIMEZONE").unwrap_or_else(|_| "UTC".to_string());
        let time_zone: Tz = time_zone_name
            .parse()
            .map_err(|_| anyhow!("Invalid APP_TIMEZONE value: {}", time_zone_name))?;

        let defaults = WorkdayRules::default();
        let non_working_weekday = match env::var("NON_WORKING_WEEKDAY") {
            Ok(value) => value
                .parse()
                .map_err(|_| anyhow!("Invalid NON_WORKING_WEEKDAY value: {}", value))?,
            Err(_) => defaults.non_working_weekday,
        };
        let on_time_cutoff = parse_time_env("ON_TIME_CUTOFF", defaults.on_time_cutoff)?;
        let standard_checkout = parse_time_env("STANDARD_CHECKOUT", defaults.standard_checkout)?;
        let grace_minutes = env::var("GRACE_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.grace_minutes);
        let workday_hours = env::var("WORKDAY_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.workday_hours);

        Ok(Config {
            database_url,
            jwt_secret,
            jwt_expiration_hours,
            time_zone,
            workday: WorkdayRules {
                non_working_weekday,
                on_time_cutoff,
                grace_minutes,
                standard_checkout,
                workday_hours,
            },
        })
    }
}

fn parse_time_env(key: &str, default: NaiveTime) -> anyhow::Result<NaiveTime> {
    match env::var(key) {
        Ok(value) => NaiveTime::parse_from_str(&value, "%H:%M")
            .map_err(|_| anyhow!("Invalid {} value: {}", key, value)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workday_defaults_match_business_rules() {
        let rules = WorkdayRules::default();
        assert_eq!(rules.non_working_weekday, Weekday::Sun);
        assert_eq!(rules.on_time_cutoff, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(rules.grace_minutes, 30);
        assert_eq!(rules.standard_checkout, NaiveTime::from_hms_opt(17, 30, 0).unwrap());
        assert_eq!(rules.workday_hours, 8.0);
    }
}
