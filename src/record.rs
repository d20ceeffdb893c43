/// Wire records exchanged with the Workgroup API (JSON, API 2.0 shape).
///
/// - `WorkgroupRecord`: full workgroup, returned by fetch/create/update
/// - `MemberRecord`: one roster entry (person, nested workgroup or certificate)
/// - `SearchRecord`: reduced record returned by searches
///
/// Booleans arrive either as JSON booleans or as "TRUE"/"FALSE" strings, and
/// dates as `D-Mon-YYYY` (e.g. `1-Jan-2025`).
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{Result, WorkgroupError};
use crate::membership::MemberKind;
use crate::properties::{Affiliation, WorkgroupFilter, WorkgroupVisibility};

pub const DATE_FORMAT: &str = "%d-%b-%Y";

/// Parse an API date such as `1-Jan-2025` or `01-JAN-2025`.
pub fn parse_api_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|e| {
        WorkgroupError::UnexpectedResponse {
            status: 200,
            message: format!("bad date '{}': {}", raw, e),
        }
    })
}

pub fn format_api_date(date: &NaiveDate) -> String {
    date.format("%-d-%b-%Y").to_string()
}

mod api_date {
    use super::*;

    pub fn serialize<S: Serializer>(date: &NaiveDate, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(&format_api_date(date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<NaiveDate, D::Error> {
        let raw = String::deserialize(d)?;
        parse_api_date(&raw).map_err(serde::de::Error::custom)
    }
}

mod api_date_opt {
    use super::*;

    pub fn serialize<S: Serializer>(
        date: &Option<NaiveDate>,
        s: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        match date {
            Some(date) => s.serialize_str(&format_api_date(date)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> std::result::Result<Option<NaiveDate>, D::Error> {
        match Option::<String>::deserialize(d)? {
            Some(raw) => parse_api_date(&raw).map(Some).map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

fn api_flag<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    match Flag::deserialize(d)? {
        Flag::Bool(value) => Ok(value),
        Flag::Text(text) if text.eq_ignore_ascii_case("true") => Ok(true),
        Flag::Text(text) if text.eq_ignore_ascii_case("false") => Ok(false),
        Flag::Text(text) => Err(serde::de::Error::custom(format!("bad flag '{}'", text))),
    }
}

/// Wire form of a boolean property in update/create bodies.
pub fn flag_str(value: bool) -> &'static str {
    if value {
        "TRUE"
    } else {
        "FALSE"
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Members
// ---------------------------------------------------------------------------

/// One entry of a members/administrators roster.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MemberRecord {
    #[serde(rename = "type")]
    pub kind: MemberKind,
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, with = "api_date_opt", skip_serializing_if = "Option::is_none")]
    pub last_update: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub affiliations: Vec<Affiliation>,
}

impl MemberRecord {
    pub fn new(kind: MemberKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            name: String::new(),
            last_update: None,
            affiliations: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Workgroup
// ---------------------------------------------------------------------------

/// Full workgroup record.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkgroupRecord {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(deserialize_with = "api_flag")]
    pub privgroup: bool,
    #[serde(deserialize_with = "api_flag")]
    pub reusable: bool,
    pub visibility: WorkgroupVisibility,
    pub filter: WorkgroupFilter,
    #[serde(with = "api_date")]
    pub last_update: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_see_membership: Option<bool>,
    #[serde(default)]
    pub members: Vec<MemberRecord>,
    #[serde(default)]
    pub administrators: Vec<MemberRecord>,
}

impl WorkgroupRecord {
    /// Decode a response body; any shape mismatch is an unexpected response.
    pub fn from_response(status: u16, body: &Value) -> Result<Self> {
        decode(status, body)
    }

    /// The caller may see rosters when the API says so, or, for servers
    /// that do not report it, when the administrator roster is visible.
    pub fn can_see_membership(&self) -> bool {
        self.can_see_membership
            .unwrap_or(!self.administrators.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Search results
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SearchRecord {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(with = "api_date")]
    pub last_update: NaiveDate,
}

/// Body of `GET search/{pattern}`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct NameSearchRecord {
    #[serde(default)]
    pub results: Vec<SearchRecord>,
}

/// Body of a search by user, workgroup or certificate.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TargetSearchRecord {
    #[serde(default)]
    pub members: Vec<SearchRecord>,
    #[serde(default)]
    pub administrators: Vec<SearchRecord>,
}

pub(crate) fn decode<T: serde::de::DeserializeOwned>(status: u16, body: &Value) -> Result<T> {
    T::deserialize(body).map_err(|e| WorkgroupError::UnexpectedResponse {
        status,
        message: format!("malformed response body: {}", e),
    })
}
