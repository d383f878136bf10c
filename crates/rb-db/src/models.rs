//! Rust structs mapping to database tables.
//!
//! Each model implements `from_row` for constructing itself from a
//! `rusqlite::Row`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An account: an opaque id plus the shared secret used for basic auth.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub secret: String,
}

impl User {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            secret: row.get(1)?,
        })
    }
}

/// What kind of program a station plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StationKind {
    /// A fixed, pre-rendered program backed by a cached media folder.
    Static,
    /// A live, queue-driven program produced by a station engine.
    Stream,
}

impl fmt::Display for StationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StationKind::Static => write!(f, "static"),
            StationKind::Stream => write!(f, "stream"),
        }
    }
}

impl FromStr for StationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "static" => Ok(StationKind::Static),
            "stream" => Ok(StationKind::Stream),
            other => Err(format!("unknown station kind: {other}")),
        }
    }
}

/// A station row. `source` is a media folder name for static stations and
/// NULL for stream stations.
#[derive(Debug, Clone, Serialize)]
pub struct Station {
    #[serde(skip_serializing)]
    pub user_id: String,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: StationKind,
    #[serde(skip_serializing)]
    pub source: Option<String>,
}

impl Station {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        let kind: String = row.get(2)?;
        let kind = kind.parse().map_err(|_| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                format!("invalid station kind: {kind}").into(),
            )
        })?;
        Ok(Self {
            user_id: row.get(0)?,
            id: row.get(1)?,
            kind,
            source: row.get(3)?,
        })
    }
}

/// The (owner, station) pair that identifies a station.
///
/// Engine and registry code only ever needs the key, not the full row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StationKey {
    pub user_id: String,
    pub station_id: String,
}

impl StationKey {
    pub fn new(user_id: impl Into<String>, station_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            station_id: station_id.into(),
        }
    }
}

impl From<&Station> for StationKey {
    fn from(station: &Station) -> Self {
        Self::new(station.user_id.clone(), station.id.clone())
    }
}

/// A follower-side pointer at another user's station.
#[derive(Debug, Clone, Serialize)]
pub struct Binding {
    #[serde(skip_serializing)]
    pub user_id: String,
    pub id: String,
    pub station_user: String,
    pub station_id: String,
}

impl Binding {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            user_id: row.get(0)?,
            id: row.get(1)?,
            station_user: row.get(2)?,
            station_id: row.get(3)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn station_kind_round_trip() {
        assert_eq!("static".parse::<StationKind>().unwrap(), StationKind::Static);
        assert_eq!("STREAM".parse::<StationKind>().unwrap(), StationKind::Stream);
        assert!("live-ish".parse::<StationKind>().is_err());
        assert_eq!(StationKind::Stream.to_string(), "stream");
    }

    #[test]
    fn station_key_from_station() {
        let station = Station {
            user_id: "u1".into(),
            id: "s1".into(),
            kind: StationKind::Stream,
            source: None,
        };
        let key = StationKey::from(&station);
        assert_eq!(key, StationKey::new("u1", "s1"));
    }
}
