use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use oracle::Connection;
use oracle::sql_type::{OracleType, Timestamp};
use tracing::{debug, trace};

use crate::app_config::AppConfig;
use crate::backends::{RowCursor, Source};
use crate::common::{CellValue, Row};

/// 🔧 Everything needed to dial the source database. No connection held.
#[derive(Clone)]
pub(crate) struct OracleConnectOptions {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) user: String,
    pub(crate) password: String,
    pub(crate) sid: String,
}

impl std::fmt::Debug for OracleConnectOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleConnectOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("sid", &self.sid)
            .finish()
    }
}

impl OracleConnectOptions {
    pub(crate) fn from_config(config: &AppConfig) -> Self {
        Self {
            host: config.sisedo_host.clone(),
            port: config.sisedo_port,
            user: config.sisedo_un.clone(),
            password: config.sisedo_pw.clone(),
            sid: config.sisedo_sid.clone(),
        }
    }

    /// 📡 Full connect descriptor. SID-addressed, because that's what the listener wants.
    pub(crate) fn connect_descriptor(&self) -> String {
        format!(
            "(DESCRIPTION=(ADDRESS=(PROTOCOL=TCP)(HOST={})(PORT={}))(CONNECT_DATA=(SID={})))",
            self.host, self.port, self.sid
        )
    }
}

/// 🏛️ One live connection to the source database. Closed on drop.
pub(crate) struct OracleSource {
    connection: Connection,
    target: String,
}

impl std::fmt::Debug for OracleSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleSource")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl OracleSource {
    pub(crate) fn connect(options: &OracleConnectOptions) -> Result<Self> {
        let target = format!("{}:{}/{}", options.host, options.port, options.sid);
        debug!("🔌 Connecting to source database {} as {}", target, options.user);
        let connection = Connection::connect(&options.user, &options.password, options.connect_descriptor())
            .with_context(|| {
                format!(
                    "💀 Couldn't connect to the source database at {target} as '{}'. \
                     Check SISEDO_HOST, SISEDO_PORT, SISEDO_SID and the credentials.",
                    options.user
                )
            })?;
        Ok(Self { connection, target })
    }
}

impl Source for OracleSource {
    fn query(&mut self, sql: &str) -> Result<RowCursor<'_>> {
        trace!("📜 Executing on {}: {}", self.target, sql);
        let result_set = self
            .connection
            .query(sql, &[])
            .with_context(|| format!("💀 Query failed on {}", self.target))?;

        let column_info = result_set.column_info();
        let columns: Vec<String> = column_info.iter().map(|c| c.name().to_string()).collect();
        let column_types: Vec<OracleType> = column_info.iter().map(|c| c.oracle_type().clone()).collect();

        let rows = result_set.map(move |fetched| {
            let fetched = fetched.context("💀 Fetching the next row from the source database failed")?;
            convert_row(&fetched, &column_types)
        });

        Ok(RowCursor {
            columns,
            rows: Box::new(rows),
        })
    }
}

fn convert_row(fetched: &oracle::Row, column_types: &[OracleType]) -> Result<Row> {
    let cells = column_types
        .iter()
        .enumerate()
        .map(|(i, oracle_type)| convert_cell(fetched, i, oracle_type))
        .collect::<Result<Vec<_>>>()?;
    Ok(Row::new(cells))
}

// 🔢 Numbers come back as the driver's own text so no precision is invented or lost.
fn convert_cell(fetched: &oracle::Row, i: usize, oracle_type: &OracleType) -> Result<CellValue> {
    match oracle_type {
        OracleType::Number(_, _)
        | OracleType::Int64
        | OracleType::Float(_)
        | OracleType::BinaryFloat
        | OracleType::BinaryDouble => {
            let value: Option<String> = fetched.get(i).context("💀 Couldn't read a numeric column")?;
            Ok(value.map(CellValue::Number).unwrap_or(CellValue::Null))
        }
        OracleType::Date | OracleType::Timestamp(_) => {
            let value: Option<Timestamp> = fetched.get(i).context("💀 Couldn't read a temporal column")?;
            match value {
                Some(ts) => Ok(CellValue::Timestamp(naive_wall_clock(&ts)?)),
                None => Ok(CellValue::Null),
            }
        }
        // 🌍 zoned values carry their own offset; shift them onto the UTC wall clock
        OracleType::TimestampTZ(_) | OracleType::TimestampLTZ(_) => {
            let value: Option<Timestamp> = fetched.get(i).context("💀 Couldn't read a zoned temporal column")?;
            match value {
                Some(ts) => Ok(CellValue::Timestamp(utc_wall_clock(naive_wall_clock(&ts)?, ts.tz_offset())?)),
                None => Ok(CellValue::Null),
            }
        }
        _ => {
            let value: Option<String> = fetched.get(i).context("💀 Couldn't read a text column")?;
            Ok(CellValue::from(value))
        }
    }
}

/// 🕰️ Keep the wall-clock digits exactly as stored. Zone interpretation happens at render time.
fn naive_wall_clock(ts: &Timestamp) -> Result<NaiveDateTime> {
    NaiveDate::from_ymd_opt(ts.year(), ts.month(), ts.day())
        .and_then(|date| date.and_hms_nano_opt(ts.hour(), ts.minute(), ts.second(), ts.nanosecond()))
        .ok_or_else(|| anyhow!("💀 The database returned a timestamp chrono can't represent: {ts}"))
}

/// 🌍 `local - offset`: the same instant on the UTC wall clock.
fn utc_wall_clock(local: NaiveDateTime, offset_seconds: i32) -> Result<NaiveDateTime> {
    local
        .checked_sub_signed(TimeDelta::seconds(i64::from(offset_seconds)))
        .ok_or_else(|| anyhow!("💀 Shifting {local} by {offset_seconds}s to UTC overflowed"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> OracleConnectOptions {
        OracleConnectOptions {
            host: "sisedo.example.edu".into(),
            port: 1521,
            user: "etl".into(),
            password: "hunter2".into(),
            sid: "SISPRD".into(),
        }
    }

    #[test]
    fn the_one_where_the_descriptor_asks_for_a_sid() {
        assert_eq!(
            options().connect_descriptor(),
            "(DESCRIPTION=(ADDRESS=(PROTOCOL=TCP)(HOST=sisedo.example.edu)(PORT=1521))(CONNECT_DATA=(SID=SISPRD)))"
        );
    }

    #[test]
    fn the_one_where_the_password_stays_out_of_debug() {
        let rendered = format!("{:?}", options());
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("SISPRD"));
    }

    #[test]
    fn the_one_where_oracle_timestamps_keep_their_digits() {
        let ts = Timestamp::new(2023, 10, 27, 14, 30, 45, 123_456_000).unwrap();
        let naive = naive_wall_clock(&ts).unwrap();
        assert_eq!(naive.format("%Y-%m-%d %H:%M:%S%.6f").to_string(), "2023-10-27 14:30:45.123456");
    }

    #[test]
    fn the_one_where_zoned_timestamps_land_on_the_utc_clock() {
        let local = NaiveDate::from_ymd_opt(2023, 10, 27)
            .unwrap()
            .and_hms_opt(14, 30, 45)
            .unwrap();
        let pacific = utc_wall_clock(local, -7 * 3600).unwrap();
        assert_eq!(pacific.to_string(), "2023-10-27 21:30:45");
        let kolkata = utc_wall_clock(local, 5 * 3600 + 30 * 60).unwrap();
        assert_eq!(kolkata.to_string(), "2023-10-27 09:00:45");
        assert_eq!(utc_wall_clock(local, 0).unwrap(), local);
    }
}
