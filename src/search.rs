/// Search results.
///
/// Searches return reduced records ([`PartialWorkgroup`]) that are never
/// cached. Each can be turned into a full, cached [`Workgroup`] through the
/// client.
use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};

use crate::client::WorkgroupClient;
use crate::error::Result;
use crate::membership::MemberId;
use crate::record::{format_api_date, SearchRecord, TargetSearchRecord};
use crate::workgroup::Workgroup;

/// A workgroup as returned by a search: name, description and last change.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartialWorkgroup {
    pub name: String,
    /// Empty when the workgroup has no description.
    pub description: String,
    pub last_update: NaiveDate,
    /// When the search ran.
    pub as_of: DateTime<Utc>,
}

impl PartialWorkgroup {
    pub(crate) fn from_record(record: &SearchRecord, as_of: DateTime<Utc>) -> Self {
        Self {
            name: record.name.to_lowercase(),
            description: record.description.clone(),
            last_update: record.last_update,
            as_of,
        }
    }

    /// The full workgroup. Returns the cached entity (without refreshing it)
    /// if the client already has one, otherwise fetches it.
    pub fn workgroup(&self, client: &WorkgroupClient) -> Result<Workgroup> {
        client.get(&self.name)
    }
}

impl MemberId for PartialWorkgroup {
    fn member_id(&self) -> String {
        self.name.clone()
    }
}

impl fmt::Display for PartialWorkgroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (last updated {}): {}",
            self.name,
            format_api_date(&self.last_update),
            self.description
        )
    }
}

/// Results of a name search, in server order.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchResults {
    pattern: String,
    results: Vec<PartialWorkgroup>,
}

impl SearchResults {
    pub(crate) fn new(pattern: &str, records: &[SearchRecord]) -> Self {
        let as_of = Utc::now();
        Self {
            pattern: pattern.to_string(),
            results: records
                .iter()
                .map(|r| PartialWorkgroup::from_record(r, as_of))
                .collect(),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PartialWorkgroup> {
        self.results.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.name.as_str()).collect()
    }
}

impl IntoIterator for SearchResults {
    type Item = PartialWorkgroup;
    type IntoIter = std::vec::IntoIter<PartialWorkgroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

impl<'a> IntoIterator for &'a SearchResults {
    type Item = &'a PartialWorkgroup;
    type IntoIter = std::slice::Iter<'a, PartialWorkgroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

/// Workgroups in which a person, workgroup or certificate appears, directly
/// or through nesting.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchByResults {
    pub is_member: BTreeSet<PartialWorkgroup>,
    pub is_administrator: BTreeSet<PartialWorkgroup>,
}

impl SearchByResults {
    pub(crate) fn from_record(record: &TargetSearchRecord) -> Self {
        let as_of = Utc::now();
        let collect = |records: &[SearchRecord]| {
            records
                .iter()
                .map(|r| PartialWorkgroup::from_record(r, as_of))
                .collect()
        };
        Self {
            is_member: collect(&record.members),
            is_administrator: collect(&record.administrators),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.is_member.is_empty() && self.is_administrator.is_empty()
    }

    pub fn member_of(&self, name: &str) -> bool {
        self.is_member.iter().any(|p| p.name == name)
    }

    pub fn administrator_of(&self, name: &str) -> bool {
        self.is_administrator.iter().any(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, description: &str) -> SearchRecord {
        SearchRecord {
            name: name.to_string(),
            description: description.to_string(),
            last_update: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        }
    }

    #[test]
    fn test_partial_display() {
        let partial = PartialWorkgroup::from_record(&record("test:1", "Test 1"), Utc::now());
        assert_eq!(partial.to_string(), "test:1 (last updated 1-Jan-2025): Test 1");
    }

    #[test]
    fn test_results_iterate_repeatedly() {
        let results = SearchResults::new("test*", &[record("test:1", ""), record("test:2", "")]);
        assert_eq!(results.len(), 2);
        assert_eq!(results.iter().count(), 2);
        assert_eq!((&results).into_iter().count(), 2);
        assert_eq!(results.names(), vec!["test:1", "test:2"]);
        assert_eq!(results.pattern(), "test*");
    }

    #[test]
    fn test_search_by_partition() {
        let by = SearchByResults::from_record(&TargetSearchRecord {
            members: vec![record("test:1", "")],
            administrators: vec![record("test:2", ""), record("test:3", "")],
        });
        assert!(by.member_of("test:1"));
        assert!(!by.member_of("test:2"));
        assert!(by.administrator_of("test:3"));
        assert!(!by.is_empty());
        assert!(SearchByResults::default().is_empty());
    }
}
