//! Data models for the statistics service.
//!
//! This module contains the raw record shapes read from the store,
//! the derived summaries returned by the API, and the report types
//! produced in one-shot report mode.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::marker::PhantomData;

/// A snapshot of one store collection: record id to record, in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection<T> {
    records: Vec<(String, T)>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

impl<T> Collection<T> {
    /// Number of top-level keys.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over `(id, record)` pairs in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.records.iter().map(|(id, record)| (id.as_str(), record))
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.records.iter().map(|(_, record)| record)
    }
}

impl<T> FromIterator<(String, T)> for Collection<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl<'de, T> Deserialize<'de> for Collection<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(CollectionVisitor(PhantomData))
    }
}

struct CollectionVisitor<T>(PhantomData<T>);

impl<'de, T> Visitor<'de> for CollectionVisitor<T>
where
    T: Deserialize<'de>,
{
    type Value = Collection<T>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a collection object, an array or null")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(Collection::default())
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(Collection::default())
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut records = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((id, record)) = map.next_entry::<String, Option<T>>()? {
            if let Some(record) = record {
                records.push((id, record));
            }
        }
        Ok(Collection { records })
    }

    // Firebase returns an array when every key is a small integer.
    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut records = Vec::new();
        let mut index = 0usize;
        while let Some(record) = seq.next_element::<Option<T>>()? {
            if let Some(record) = record {
                records.push((index.to_string(), record));
            }
            index += 1;
        }
        Ok(Collection { records })
    }
}

/// A user record as stored under `users/<uid>`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(default, deserialize_with = "deserialize_text")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub email: Option<String>,
    /// Stored as-is; see [`parse_timestamp`].
    pub created_at: Option<Value>,
    pub last_login_at: Option<Value>,
    /// Free-form; only `playtime.total` is read.
    pub playtime: Option<Value>,
}

impl UserRecord {
    /// Parsed account creation time, if present and readable.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_ref().and_then(parse_timestamp)
    }
}

/// A custom entry record as stored under `customEntries/{games,websites}/<id>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryRecord {
    #[serde(
        default,
        deserialize_with = "deserialize_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub title: Option<String>,
    /// Creator name. Not resolved against the users collection.
    #[serde(
        default,
        deserialize_with = "deserialize_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub username: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "deserialize_rating")]
    pub rating: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Value>,
    /// Any other stored fields, passed through to API output.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EntryRecord {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_ref().and_then(parse_timestamp)
    }
}

/// Which collection an entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Game,
    Website,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Game => write!(f, "game"),
            EntryKind::Website => write!(f, "website"),
        }
    }
}

/// An entry annotated with its id and source collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(flatten)]
    pub record: EntryRecord,
}

impl Entry {
    /// Tag a record with its key and kind. Stored `id`/`type` fields are dropped
    /// so the derived values are the only ones emitted.
    pub fn annotate(id: &str, kind: EntryKind, record: &EntryRecord) -> Self {
        let mut record = record.clone();
        record.extra.remove("id");
        record.extra.remove("type");
        Self {
            id: id.to_string(),
            kind,
            record,
        }
    }
}

/// Entry counts per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EntryBreakdown {
    pub games: usize,
    pub websites: usize,
}

/// Result of merging both entry collections.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedEntries {
    /// Newest first.
    pub entries: Vec<Entry>,
    pub breakdown: EntryBreakdown,
}

/// Number of entries created under one username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributorSummary {
    pub username: String,
    pub entry_count: usize,
}

/// Global statistics returned by `/api/stats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub total_users: usize,
    /// Users created within the trailing seven days.
    pub recent_signups: usize,
    pub total_games: usize,
    pub total_websites: usize,
    pub total_entries: usize,
    /// Seconds.
    #[serde(serialize_with = "serialize_seconds")]
    pub total_playtime: f64,
    pub total_playtime_formatted: String,
}

/// One row of `/api/users`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub uid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<Value>,
}

/// One row of `/api/playtime`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPlaytime {
    pub uid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Value>,
    #[serde(serialize_with = "serialize_seconds")]
    pub total_playtime: f64,
    pub total_playtime_formatted: String,
}

/// Metadata about a generated report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    /// Human-readable description of the data source.
    pub source: String,
    pub generated_at: DateTime<Utc>,
    pub duration_seconds: f64,
}

/// A one-shot statistics report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub metadata: ReportMetadata,
    pub stats: StatsSummary,
    pub top_contributors: Vec<ContributorSummary>,
    pub recent_entries: Vec<Entry>,
    pub top_players: Vec<UserPlaytime>,
}

/// Parse a stored timestamp.
///
/// Numbers are milliseconds since the Unix epoch. Strings may be RFC 3339,
/// an ISO-8601 date-time without offset (read as UTC), or a bare date.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let millis = match n.as_i64() {
                Some(millis) => millis,
                None => {
                    let f = n.as_f64().filter(|f| f.is_finite())?;
                    f.trunc() as i64
                }
            };
            DateTime::from_timestamp_millis(millis)
        }
        Value::String(s) => parse_timestamp_str(s.trim()),
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Text fields accept numbers and booleans in their string form; other shapes read as absent.
fn deserialize_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Ratings are clamped to 0..=5; anything unreadable displays as 0.
fn deserialize_rating<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let rating = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(rating
        .filter(|r| r.is_finite())
        .map(|r| r.trunc().clamp(0.0, 5.0) as u8)
        .unwrap_or(0))
}

/// Whole seconds are emitted as JSON integers.
fn serialize_seconds<S>(seconds: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if seconds.fract() == 0.0 && seconds.abs() < 9_007_199_254_740_992.0 {
        serializer.serialize_i64(*seconds as i64)
    } else {
        serializer.serialize_f64(*seconds)
    }
}
