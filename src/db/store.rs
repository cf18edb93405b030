//! Read-only access to the climate store.
//!
//! - Synchronous diesel queries against SQLite.
//! - No pooling: every operation opens its own read-only connection and drops it
//!   before returning, so a `Store` can be shared freely between request tasks.

use diesel::dsl::{avg, count_star, exists, max, min};
use diesel::prelude::*;
use diesel::result::{ConnectionError, Error as DieselError};
use diesel::sqlite::SqliteConnection;
use log::debug;
use serde::Serialize;

use crate::db::models::Station;
use crate::schema;
use crate::utils::{looks_like_iso_date, round_to_tenth};

#[derive(Debug)]
pub enum StoreError {
    Connect(ConnectionError),
    Query(DieselError),
}

impl core::fmt::Display for StoreError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            StoreError::Connect(e) => write!(f, "store connection failed: {}", e),
            StoreError::Query(e) => write!(f, "store query failed: {}", e),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Connect(e) => Some(e),
            StoreError::Query(e) => Some(e),
        }
    }
}

impl From<ConnectionError> for StoreError {
    fn from(value: ConnectionError) -> Self {
        StoreError::Connect(value)
    }
}

impl From<DieselError> for StoreError {
    fn from(value: DieselError) -> Self {
        StoreError::Query(value)
    }
}

/// Min/max/mean temperature over a date-filtered set of measurements.
///
/// All three are `None` when no row matched (e.g. an end date before the start date).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TemperatureSummary {
    #[serde(rename = "Min Temperature")]
    pub min: Option<f64>,
    #[serde(rename = "Max Temperature")]
    pub max: Option<f64>,
    #[serde(rename = "Mean Temperature")]
    pub mean: Option<f64>,
}

/// Row counts reported by [`Store::verify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub stations: i64,
    pub measurements: i64,
}

/// Result of checking a date range against the store before aggregating.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangeCheck {
    StartMissing,
    EndMissing,
    Summary(TemperatureSummary),
}

#[derive(Debug, Clone)]
pub struct Store {
    url: String,
    #[cfg(test)]
    opened: std::sync::Arc<std::sync::atomic::AtomicUsize>,
}

impl Store {
    /// `database` is either a filesystem path or a ready-made `file:` URI.
    /// Plain paths are opened with `mode=ro` so a missing file is an error
    /// instead of a freshly created empty database.
    pub fn new(database: &str) -> Self {
        let url = if database.starts_with("file:") {
            database.to_string()
        } else {
            format!("file:{}?mode=ro", escape_uri_path(database))
        };
        Store {
            url,
            #[cfg(test)]
            opened: Default::default(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn connect(&self) -> Result<SqliteConnection, StoreError> {
        #[cfg(test)]
        self.opened.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(SqliteConnection::establish(&self.url)?)
    }

    #[cfg(test)]
    pub(crate) fn connections_opened(&self) -> usize {
        self.opened.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Open a connection and count both tables; used as a startup probe.
    pub fn verify(&self) -> Result<StoreStats, StoreError> {
        let mut conn = self.connect()?;
        let stations = schema::station::table.select(count_star()).first(&mut conn)?;
        let measurements = schema::measurement::table.select(count_star()).first(&mut conn)?;
        Ok(StoreStats { stations, measurements })
    }

    /// `(date, prcp)` for every measurement on or after `anchor`, oldest first.
    pub fn list_precipitation_since(&self, anchor: &str) -> Result<Vec<(String, Option<f64>)>, StoreError> {
        use schema::measurement::dsl as M;

        let mut conn = self.connect()?;
        let rows = M::measurement
            .filter(M::date.ge(anchor))
            .order(M::date.asc())
            .select((M::date, M::prcp))
            .load(&mut conn)?;
        Ok(rows)
    }

    pub fn list_stations(&self) -> Result<Vec<Station>, StoreError> {
        let mut conn = self.connect()?;
        let rows = schema::station::table.select(Station::as_select()).load(&mut conn)?;
        Ok(rows)
    }

    /// `(date, tobs)` for one station on or after `anchor`, oldest first.
    pub fn list_temperature_observations(
        &self,
        station_code: &str,
        anchor: &str,
    ) -> Result<Vec<(String, f64)>, StoreError> {
        use schema::measurement::dsl as M;

        let mut conn = self.connect()?;
        let rows = M::measurement
            .filter(M::station.eq(station_code))
            .filter(M::date.ge(anchor))
            .order(M::date.asc())
            .select((M::date, M::tobs))
            .load(&mut conn)?;
        Ok(rows)
    }

    /// Station code with the most measurement rows. Ties go to the smallest code.
    pub fn most_active_station(&self) -> Result<Option<String>, StoreError> {
        use schema::measurement::dsl as M;

        let mut conn = self.connect()?;
        let counts: Vec<(String, i64)> = M::measurement
            .group_by(M::station)
            .select((M::station, count_star()))
            .load(&mut conn)?;
        debug!("Observation counts per station: {:?}", counts);

        let busiest = counts
            .into_iter()
            .max_by(|(a_code, a_count), (b_code, b_count)| a_count.cmp(b_count).then_with(|| b_code.cmp(a_code)))
            .map(|(code, _)| code);
        Ok(busiest)
    }

    /// Whether any measurement carries exactly this date string. No calendar
    /// parsing happens, so malformed input simply yields `false`.
    pub fn date_exists(&self, date: &str) -> Result<bool, StoreError> {
        let mut conn = self.connect()?;
        date_present(&mut conn, date)
    }

    /// Temperature summary over `start <= date` and, when given, `date <= end`.
    pub fn aggregate_temperature(&self, start: &str, end: Option<&str>) -> Result<TemperatureSummary, StoreError> {
        let mut conn = self.connect()?;
        summarize(&mut conn, start, end)
    }

    /// Existence checks for `start` (then `end`) followed by the summary, all on
    /// one connection. The first missing date wins.
    pub fn check_and_aggregate(&self, start: &str, end: Option<&str>) -> Result<RangeCheck, StoreError> {
        let mut conn = self.connect()?;
        if !date_present(&mut conn, start)? {
            return Ok(RangeCheck::StartMissing);
        }
        if let Some(end) = end
            && !date_present(&mut conn, end)?
        {
            return Ok(RangeCheck::EndMissing);
        }
        Ok(RangeCheck::Summary(summarize(&mut conn, start, end)?))
    }
}

// Strings that can't be a stored date skip the query.
fn date_present(conn: &mut SqliteConnection, date: &str) -> Result<bool, StoreError> {
    use schema::measurement::dsl as M;

    if !looks_like_iso_date(date) {
        return Ok(false);
    }
    let found = diesel::select(exists(M::measurement.filter(M::date.eq(date)))).get_result(conn)?;
    Ok(found)
}

fn summarize(conn: &mut SqliteConnection, start: &str, end: Option<&str>) -> Result<TemperatureSummary, StoreError> {
    use schema::measurement::dsl as M;

    let mut query = M::measurement
        .select((min(M::tobs), max(M::tobs), avg(M::tobs)))
        .filter(M::date.ge(start))
        .into_boxed();
    if let Some(end) = end {
        query = query.filter(M::date.le(end));
    }

    let (lowest, highest, mean): (Option<f64>, Option<f64>, Option<f64>) = query.first(conn)?;
    Ok(TemperatureSummary {
        min: lowest,
        max: highest,
        mean: mean.map(round_to_tenth),
    })
}

// SQLite URI filenames treat `?` and `#` as delimiters and decode `%XX`.
fn escape_uri_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        match c {
            '%' => out.push_str("%25"),
            '?' => out.push_str("%3F"),
            '#' => out.push_str("%23"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Store;
    use crate::db::models::{NewMeasurement, NewStation};
    use crate::schema;
    use diesel::prelude::*;
    use diesel::sqlite::SqliteConnection;
    use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
    use tempfile::TempDir;

    pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

    /// A seeded store living in a temp directory; dropped with the fixture.
    pub struct Fixture {
        _dir: TempDir,
        pub store: Store,
    }

    pub fn seeded_store(stations: &[NewStation<'_>], measurements: &[NewMeasurement<'_>]) -> Fixture {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("hawaii.sqlite");
        let path_str = path.to_str().expect("utf-8 temp path");

        let mut conn = SqliteConnection::establish(path_str).expect("create sqlite file");
        conn.run_pending_migrations(MIGRATIONS).expect("apply schema");
        diesel::insert_into(schema::station::table)
            .values(stations)
            .execute(&mut conn)
            .expect("insert stations");
        if !measurements.is_empty() {
            diesel::insert_into(schema::measurement::table)
                .values(measurements)
                .execute(&mut conn)
                .expect("insert measurements");
        }
        drop(conn);

        Fixture {
            _dir: dir,
            store: Store::new(path_str),
        }
    }

    pub fn station(code: &str) -> NewStation<'_> {
        NewStation {
            station: code,
            name: "WAIKIKI 717.2, HI US",
            latitude: 21.2716,
            longitude: -157.8168,
            elevation: 3.0,
        }
    }

    pub fn obs<'a>(station: &'a str, date: &'a str, prcp: Option<f64>, tobs: f64) -> NewMeasurement<'a> {
        NewMeasurement {
            station,
            date,
            prcp,
            tobs,
        }
    }

    /// Two stations, five measurements spanning 2016-08-20..2016-08-25.
    pub fn small_store() -> Fixture {
        seeded_store(
            &[station("USC00519397"), station("USC00519281")],
            &[
                obs("USC00519397", "2016-08-20", Some(0.0), 80.0),
                obs("USC00519281", "2016-08-21", None, 76.0),
                obs("USC00519281", "2016-08-22", Some(0.5), 74.0),
                obs("USC00519397", "2016-08-23", Some(0.08), 81.0),
                obs("USC00519281", "2016-08-25", Some(0.02), 77.0),
            ],
        )
    }
}
