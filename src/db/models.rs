//! Diesel model structs for the two climate relations.
//!
//! Both tables are populated by an offline import; this service only reads them.

use diesel::prelude::*;
use serde::Serialize;

use crate::schema;

#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Selectable, Serialize)]
#[diesel(table_name = schema::station)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Station {
    pub id: i32,
    /// Business key referenced by `measurement.station`, e.g. "USC00519281".
    #[diesel(column_name = station_code)]
    pub station: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
}

#[cfg(test)]
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::station)]
pub struct NewStation<'a> {
    #[diesel(column_name = station_code)]
    pub station: &'a str,
    pub name: &'a str,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
}

// Daily observation row. `date` is an ISO `yyyy-mm-dd` string so text
// comparison orders chronologically.
#[cfg(test)]
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::measurement)]
pub struct NewMeasurement<'a> {
    pub station: &'a str,
    pub date: &'a str,
    pub prcp: Option<f64>,
    pub tobs: f64,
}
