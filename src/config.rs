use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// How course collisions are ruled out at a given day and slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExclusivityMode {
    /// No two distinct courses may run at the same day and slot anywhere in
    /// the institution.
    #[default]
    Global,
    /// Only a room is exclusive; distinct courses may run in parallel in
    /// different rooms.
    RoomOnly,
}

/// Knobs for building and solving a timetable model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SolverConfig {
    pub exclusivity: ExclusivityMode,
    /// Maximum slots a course may take on a single day.
    pub daily_cap: u32,
    /// Penalty per unmet teacher preference. Values that do not dominate the
    /// base objective are raised to the smallest value that does.
    pub penalty_weight: Option<f64>,
    /// Distance from 1.0 within which a variable counts as assigned.
    pub rounding_epsilon: f64,
    pub time_limit_secs: Option<f64>,
    /// Accept the best incumbent when the time limit is reached.
    pub best_effort: bool,
    pub threads: i32,
    pub random_seed: i32,
    pub mip_rel_gap: f64,
    pub mip_abs_gap: f64,
    pub verbose: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            exclusivity: ExclusivityMode::Global,
            daily_cap: 4,
            penalty_weight: None,
            rounding_epsilon: 1e-6,
            time_limit_secs: None,
            best_effort: false,
            threads: 1,
            random_seed: 1234,
            mip_rel_gap: 0.0,
            mip_abs_gap: 0.0,
            verbose: false,
        }
    }
}

impl SolverConfig {
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_secs
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(Duration::from_secs_f64)
    }

    pub fn with_exclusivity(mut self, exclusivity: ExclusivityMode) -> Self {
        self.exclusivity = exclusivity;
        self
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit_secs = Some(limit.as_secs_f64());
        self
    }
}

/// Settings for the HTTP front end, read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub default_time_limit_secs: Option<f64>,
}

const DEFAULT_ADDR: &str = "127.0.0.1:8080";

impl ServerConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let addr = lookup("TIMETABLE_ADDR")
            .unwrap_or_else(|| DEFAULT_ADDR.to_string())
            .parse()
            .map_err(|e| format!("TIMETABLE_ADDR: {e}"))?;
        let default_time_limit_secs = lookup("TIMETABLE_TIME_LIMIT_SECS")
            .map(|v| {
                v.parse::<f64>()
                    .map_err(|e| format!("TIMETABLE_TIME_LIMIT_SECS: {e}"))
            })
            .transpose()?;
        Ok(Self {
            addr,
            default_time_limit_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let config: SolverConfig =
            serde_json::from_str(r#"{"exclusivity":"roomOnly","timeLimitSecs":2.5}"#).unwrap();
        assert_eq!(config.exclusivity, ExclusivityMode::RoomOnly);
        assert_eq!(config.daily_cap, 4);
        assert_eq!(config.time_limit(), Some(Duration::from_millis(2500)));
    }

    #[test]
    fn non_positive_time_limit_means_none() {
        let config = SolverConfig {
            time_limit_secs: Some(0.0),
            ..SolverConfig::default()
        };
        assert_eq!(config.time_limit(), None);
    }

    #[test]
    fn server_config_defaults() {
        let config = ServerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.addr.to_string(), DEFAULT_ADDR);
        assert_eq!(config.default_time_limit_secs, None);
    }

    #[test]
    fn server_config_reads_overrides() {
        let config = ServerConfig::from_lookup(|key| match key {
            "TIMETABLE_ADDR" => Some("0.0.0.0:9000".to_string()),
            "TIMETABLE_TIME_LIMIT_SECS" => Some("30".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.addr.port(), 9000);
        assert_eq!(config.default_time_limit_secs, Some(30.0));
    }

    #[test]
    fn server_config_rejects_bad_addr() {
        assert!(ServerConfig::from_lookup(|_| Some("nonsense".to_string())).is_err());
    }
}
