//! Minimal runtime configuration helpers.
//! Defaults expect the store at `Resources/hawaii.sqlite` relative to the working directory.

use chrono::NaiveDate;
use std::net::SocketAddr;

pub const DEFAULT_DATABASE_URL: &str = "Resources/hawaii.sqlite";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";
/// One year before the last recorded date in the dataset.
pub const DEFAULT_ANCHOR_DATE: &str = "2016-08-23";
/// Station with the most observations in the shipped dataset.
pub const DEFAULT_TOBS_STATION: &str = "USC00519281";

/// First and last observation dates of the fixed historical dataset.
pub const EARLIEST_DATE: &str = "2010-01-01";
pub const LATEST_DATE: &str = "2017-08-23";

/// Which station the `/tobs` route reports on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TobsStation {
    Fixed(String),
    /// Pick the station with the most measurements on every request.
    MostActive,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// Lower bound (inclusive) for the "last 12 months" routes, `YYYY-MM-DD`.
    pub anchor_date: String,
    pub tobs_station: TobsStation,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = match non_empty("DATABASE_URL") {
            Some(v) => normalize_database_url(&v)?,
            None => DEFAULT_DATABASE_URL.to_string(),
        };

        let bind_addr = non_empty("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| format!("BIND_ADDR must be a socket address like 127.0.0.1:5000: {}", e))?;

        let anchor_date = match non_empty("ANCHOR_DATE") {
            Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .map_err(|_| "ANCHOR_DATE must be in YYYY-MM-DD format".to_string())?
                .format("%Y-%m-%d")
                .to_string(),
            None => DEFAULT_ANCHOR_DATE.to_string(),
        };

        let tobs_station = match lookup("TOBS_STATION") {
            None => TobsStation::Fixed(DEFAULT_TOBS_STATION.to_string()),
            Some(v) if v.trim().is_empty() => {
                return Err("TOBS_STATION must be a station code or `auto`".to_string());
            }
            Some(v) if v.trim().eq_ignore_ascii_case("auto") => TobsStation::MostActive,
            Some(v) => TobsStation::Fixed(v.trim().to_string()),
        };

        Ok(Config {
            database_url,
            bind_addr,
            anchor_date,
            tobs_station,
        })
    }
}

/// Accepts a filesystem path, a `file:` URI, or a SQLAlchemy-style
/// `sqlite:///relative` / `sqlite:////absolute` URL (reduced to its path).
fn normalize_database_url(value: &str) -> Result<String, String> {
    if let Some(path) = value.strip_prefix("sqlite:///") {
        if path.is_empty() {
            return Err("DATABASE_URL has no database path after `sqlite:///`".to_string());
        }
        return Ok(path.to_string());
    }
    if !value.starts_with("file:")
        && let Some((scheme, _)) = value.split_once("://")
    {
        return Err(format!(
            "DATABASE_URL scheme `{}` is not supported; use a path, a `file:` URI or `sqlite:///path`",
            scheme
        ));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Config, String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = from_pairs(&[]).expect("defaults");
        assert_eq!(cfg.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(cfg.bind_addr, "127.0.0.1:5000".parse::<SocketAddr>().unwrap());
        assert_eq!(cfg.anchor_date, "2016-08-23");
        assert_eq!(cfg.tobs_station, TobsStation::Fixed("USC00519281".to_string()));
    }

    #[test]
    fn reads_overrides() {
        let cfg = from_pairs(&[
            ("DATABASE_URL", "/srv/hawaii.sqlite"),
            ("BIND_ADDR", "0.0.0.0:8080"),
            ("ANCHOR_DATE", "2017-01-01"),
            ("TOBS_STATION", " USC00513117 "),
        ])
        .expect("overrides");
        assert_eq!(cfg.database_url, "/srv/hawaii.sqlite");
        assert_eq!(cfg.bind_addr.port(), 8080);
        assert_eq!(cfg.anchor_date, "2017-01-01");
        assert_eq!(cfg.tobs_station, TobsStation::Fixed("USC00513117".to_string()));
    }

    #[test]
    fn auto_selects_most_active_station() {
        let cfg = from_pairs(&[("TOBS_STATION", "AUTO")]).expect("auto");
        assert_eq!(cfg.tobs_station, TobsStation::MostActive);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(from_pairs(&[("ANCHOR_DATE", "23/08/2016")]).unwrap_err().contains("ANCHOR_DATE"));
        assert!(from_pairs(&[("BIND_ADDR", "localhost")]).unwrap_err().contains("BIND_ADDR"));
        assert!(from_pairs(&[("TOBS_STATION", "  ")]).unwrap_err().contains("TOBS_STATION"));
    }

    #[test]
    fn database_url_forms() {
        let url = |v: &str| from_pairs(&[("DATABASE_URL", v)]).map(|c| c.database_url);
        assert_eq!(url("sqlite:///Resources/hawaii.sqlite").unwrap(), "Resources/hawaii.sqlite");
        assert_eq!(url("sqlite:////srv/hawaii.sqlite").unwrap(), "/srv/hawaii.sqlite");
        assert_eq!(url("file:/srv/hawaii.sqlite?mode=ro").unwrap(), "file:/srv/hawaii.sqlite?mode=ro");
        assert!(url("postgres://localhost/hawaii").unwrap_err().contains("postgres"));
        assert!(url("sqlite:///").unwrap_err().contains("DATABASE_URL"));
    }
}
