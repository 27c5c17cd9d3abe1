use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// ItemId
// ---------------------------------------------------------------------------

/// Opaque, totally ordered result identifier.
///
/// Search ids are decimal strings of varying length, so plain string comparison
/// would put "99" after "100". Two all-digit ids compare numerically; anything
/// else falls back to lexicographic order.
#[derive(Debug, Clone)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Digits with leading zeros stripped, if the id is purely numeric.
    fn numeric_digits(&self) -> Option<&str> {
        if self.0.is_empty() || !self.0.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(self.0.trim_start_matches('0'))
    }
}

impl Ord for ItemId {
    fn cmp(&self, other: &Self) -> Ordering {
        // Numeric ids sort before every non-numeric id.
        match (self.numeric_digits(), other.numeric_digits()) {
            (Some(a), Some(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for ItemId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ItemId {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ItemId {}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Serialize for ItemId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Older cursor documents stored ids as JSON numbers.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => Self(s),
            RawId::Number(n) => Self(n.to_string()),
        })
    }
}

// ---------------------------------------------------------------------------
// TermRecord
// ---------------------------------------------------------------------------

/// One tracked search term and its durable cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermRecord {
    pub term: String,
    /// Fetch only results newer than this id. `None` until the first successful search.
    #[serde(default)]
    pub since_id: Option<ItemId>,
    /// `RunStamp` of the last successful search.
    #[serde(default)]
    pub timestamp_last_search: Option<String>,
    /// Fields owned by the term-list editor. Carried through saves untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TermRecord {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            since_id: None,
            timestamp_last_search: None,
            extra: Map::new(),
        }
    }

    pub fn with_since_id(mut self, since_id: impl Into<ItemId>) -> Self {
        self.since_id = Some(since_id.into());
        self
    }

    pub fn with_last_search(mut self, stamp: impl Into<String>) -> Self {
        self.timestamp_last_search = Some(stamp.into());
        self
    }

    /// Record a successful search at `stamp` that left the cursor at `since_id`.
    pub fn record_search(&mut self, stamp: &RunStamp, since_id: Option<ItemId>) {
        self.since_id = since_id;
        self.timestamp_last_search = Some(stamp.as_str().to_string());
    }
}

/// Sort terms into processing order: ascending by `(timestamp_last_search, since_id)`,
/// missing values first. The sort is stable, so ties keep their stored order.
pub fn prioritize(records: &mut [TermRecord]) {
    records.sort_by(|a, b| {
        a.timestamp_last_search
            .as_deref()
            .cmp(&b.timestamp_last_search.as_deref())
            .then_with(|| a.since_id.as_ref().cmp(&b.since_id.as_ref()))
    });
}

// ---------------------------------------------------------------------------
// ResultRecord
// ---------------------------------------------------------------------------

/// One opaque search result. Serialized flat: `{"id": ..., <fields>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub id: ItemId,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ResultRecord {
    pub fn new(id: impl Into<ItemId>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Build from a JSON object carrying an `id`. Returns `None` for anything else.
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Object(mut fields) = value else {
            return None;
        };
        let id = match fields.remove("id")? {
            Value::String(s) => ItemId::new(s),
            Value::Number(n) => ItemId::new(n.to_string()),
            _ => return None,
        };
        Some(Self { id, fields })
    }
}

// ---------------------------------------------------------------------------
// RunStamp
// ---------------------------------------------------------------------------

/// Layout of run timestamps. Lexicographic order matches chronological order.
pub const RUN_STAMP_FORMAT: &str = "%Y-%m-%d %H-%M-%S";

/// Timestamp of one collection cycle, captured once when the cycle starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStamp {
    at: DateTime<Utc>,
    label: String,
}

impl RunStamp {
    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    pub fn at(at: DateTime<Utc>) -> Self {
        Self {
            at,
            label: at.format(RUN_STAMP_FORMAT).to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.label
    }

    pub fn datetime(&self) -> DateTime<Utc> {
        self.at
    }
}

impl fmt::Display for RunStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn terms(records: &[TermRecord]) -> Vec<&str> {
        records.iter().map(|r| r.term.as_str()).collect()
    }

    #[test]
    fn item_id_orders_numerically() {
        assert!(ItemId::from("99") < ItemId::from("100"));
        assert!(ItemId::from("1700000000000000001") > ItemId::from("999999999999999999"));
        assert_eq!(ItemId::from("007"), ItemId::from("7"));
    }

    #[test]
    fn item_id_falls_back_to_lexicographic() {
        assert!(ItemId::from("abc") < ItemId::from("abd"));
        assert!(ItemId::from("100") < ItemId::from("a"));
    }

    #[test]
    fn item_id_order_is_total_across_mixed_ids() {
        let ids: Vec<ItemId> = ["9", "10", "1a", "007", "7", "a", "", "0", "10b", "99"]
            .into_iter()
            .map(ItemId::from)
            .collect();

        for a in &ids {
            assert_eq!(a.cmp(a), Ordering::Equal);
            for b in &ids {
                assert_eq!(a.cmp(b), b.cmp(a).reverse(), "{a} vs {b}");
                for c in &ids {
                    if a < b && b < c {
                        assert!(a < c, "{a} < {b} < {c} but not {a} < {c}");
                    }
                }
            }
        }

        assert!(ItemId::from("10") < ItemId::from("1a"));
        assert!(ItemId::from("9") < ItemId::from("1a"));
    }

    #[test]
    fn item_id_accepts_numbers() {
        let id: ItemId = serde_json::from_str("1234").unwrap();
        assert_eq!(id.as_str(), "1234");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"1234\"");
    }

    #[test]
    fn prioritize_orders_by_last_search_then_cursor() {
        let mut records = vec![
            TermRecord::new("b").with_since_id("200").with_last_search("2024-01-02 00-00-00"),
            TermRecord::new("a").with_since_id("100").with_last_search("2024-01-01 00-00-00"),
            TermRecord::new("c").with_since_id("50").with_last_search("2024-01-02 00-00-00"),
        ];
        prioritize(&mut records);
        assert_eq!(terms(&records), vec!["a", "c", "b"]);
    }

    #[test]
    fn prioritize_puts_never_searched_first_and_is_stable() {
        let mut records = vec![
            TermRecord::new("searched").with_since_id("5").with_last_search("2024-01-01 00-00-00"),
            TermRecord::new("new-1"),
            TermRecord::new("new-2"),
            TermRecord::new("tie-1").with_since_id("9").with_last_search("2024-01-01 00-00-00"),
            TermRecord::new("tie-2").with_since_id("9").with_last_search("2024-01-01 00-00-00"),
        ];
        prioritize(&mut records);
        assert_eq!(
            terms(&records),
            vec!["new-1", "new-2", "searched", "tie-1", "tie-2"]
        );
    }

    #[test]
    fn term_record_reads_stored_schema() {
        let body = r#"[
            {"term": "a", "since_id": "100", "timestamp_last_search": "T0", "owner": "ops"},
            {"term": "b", "since_id": null},
            {"term": "c"}
        ]"#;
        let records: Vec<TermRecord> = serde_json::from_str(body).unwrap();
        assert_eq!(records[0].since_id, Some(ItemId::from("100")));
        assert_eq!(records[0].extra.get("owner"), Some(&Value::from("ops")));
        assert_eq!(records[1].since_id, None);
        assert_eq!(records[2].timestamp_last_search, None);

        let written = serde_json::to_value(&records[0]).unwrap();
        assert_eq!(written["owner"], "ops");
        assert_eq!(written["since_id"], "100");
    }

    #[test]
    fn record_search_sets_cursor_and_stamp() {
        let stamp = RunStamp::at(Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap());
        let mut record = TermRecord::new("a").with_since_id("100");
        record.record_search(&stamp, Some(ItemId::from("130")));
        assert_eq!(record.since_id, Some(ItemId::from("130")));
        assert_eq!(
            record.timestamp_last_search.as_deref(),
            Some("2024-03-05 14-07-09")
        );
    }

    #[test]
    fn run_stamps_sort_chronologically() {
        let earlier = RunStamp::at(Utc.with_ymd_and_hms(2024, 9, 30, 23, 59, 59).unwrap());
        let later = RunStamp::at(Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap());
        assert!(earlier.as_str() < later.as_str());
    }

    #[test]
    fn result_record_is_flat() {
        let record = ResultRecord::new("150").with_field("text", "hello");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value, serde_json::json!({"id": "150", "text": "hello"}));

        let back = ResultRecord::from_value(value).unwrap();
        assert_eq!(back, record);
        assert!(ResultRecord::from_value(serde_json::json!({"text": "no id"})).is_none());
    }
}
