//! Selection of the latest source dataset for a name prefix

use crate::catalog::CandidateDataset;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Strategy that extracts a timestamp embedded in a dataset name
pub type NameTimestampParser = fn(name: &str, prefix: &str) -> Option<NaiveDateTime>;

/// Ranking evidence for one candidate. `None` sorts below every instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SelectionKey {
    pub name_timestamp: Option<NaiveDateTime>,
    pub modified_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Which piece of evidence the chosen dataset was picked on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionReason {
    NameTimestamp(NaiveDateTime),
    ModifiedTime(DateTime<Utc>),
    CreatedTime(DateTime<Utc>),
    NoTimestamp,
}

impl SelectionReason {
    fn from_key(key: &SelectionKey) -> Self {
        if let Some(ts) = key.name_timestamp {
            Self::NameTimestamp(ts)
        } else if let Some(ts) = key.modified_at {
            Self::ModifiedTime(ts)
        } else if let Some(ts) = key.created_at {
            Self::CreatedTime(ts)
        } else {
            Self::NoTimestamp
        }
    }
}

impl fmt::Display for SelectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NameTimestamp(ts) => write!(f, "name_timestamp={}", ts.format("%Y-%m-%d %H:%M:%S")),
            Self::ModifiedTime(ts) => write!(f, "modifiedTime={}", ts.to_rfc3339()),
            Self::CreatedTime(ts) => write!(f, "createdTime={}", ts.to_rfc3339()),
            Self::NoTimestamp => f.write_str("no_timestamp"),
        }
    }
}

/// The winning candidate together with the evidence it won on
#[derive(Debug, Clone)]
pub struct Selection<'a> {
    pub dataset: &'a CandidateDataset,
    pub key: SelectionKey,
    pub reason: SelectionReason,
}

/// Picks the latest dataset for a prefix
#[derive(Debug, Clone, Copy)]
pub struct SourceSelector {
    parse_name: NameTimestampParser,
}

impl Default for SourceSelector {
    fn default() -> Self {
        Self::new(parse_yymmdd_timestamp)
    }
}

impl SourceSelector {
    pub fn new(parse_name: NameTimestampParser) -> Self {
        Self { parse_name }
    }

    /// Derive the ranking key for a candidate under `prefix`
    pub fn key_for(&self, dataset: &CandidateDataset, prefix: &str) -> SelectionKey {
        SelectionKey {
            name_timestamp: (self.parse_name)(&dataset.name, prefix),
            modified_at: dataset.modified_at,
            created_at: dataset.created_at,
        }
    }

    /// Select the top-ranked candidate whose name starts with `prefix` and
    /// with none of `exclude_prefixes`.
    ///
    /// Candidates with identical keys resolve to the one enumerated first.
    pub fn select<'a>(
        &self,
        candidates: &'a [CandidateDataset],
        prefix: &str,
        exclude_prefixes: &[String],
    ) -> Option<Selection<'a>> {
        let mut best: Option<(&'a CandidateDataset, SelectionKey)> = None;

        for dataset in candidates {
            if !dataset.name.starts_with(prefix) {
                continue;
            }
            if exclude_prefixes
                .iter()
                .any(|excluded| dataset.name.starts_with(excluded.as_str()))
            {
                continue;
            }

            let key = self.key_for(dataset, prefix);
            match &best {
                Some((_, best_key)) if key <= *best_key => {}
                _ => best = Some((dataset, key)),
            }
        }

        best.map(|(dataset, key)| Selection {
            dataset,
            key,
            reason: SelectionReason::from_key(&key),
        })
    }
}

fn name_stamp_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"([0-9]{6})(?:_([0-9]{6}))?").expect("valid name stamp pattern"))
}

/// Parse `YYMMDD` or `YYMMDD_HHMMSS` from the part of `name` after `prefix`.
///
/// Two-digit years map into the 2000s. Impossible dates yield `None`.
pub fn parse_yymmdd_timestamp(name: &str, prefix: &str) -> Option<NaiveDateTime> {
    let suffix = name.strip_prefix(prefix)?;
    let captures = name_stamp_pattern().captures(suffix)?;

    let date = captures.get(1)?.as_str();
    let time = captures.get(2).map(|m| m.as_str()).unwrap_or("000000");

    let field = |s: &str, at: usize| s[at..at + 2].parse::<u32>().ok();
    let year = 2000 + field(date, 0)? as i32;

    NaiveDate::from_ymd_opt(year, field(date, 2)?, field(date, 4)?)?
        .and_hms_opt(field(time, 0)?, field(time, 2)?, field(time, 4)?)
}
