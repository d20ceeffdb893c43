/// Workgroup scalar property types.
///
/// - `WorkgroupVisibility`: who may see the membership lists
/// - `WorkgroupFilter`: affiliation predicate applied when deriving a privgroup
/// - `Affiliation`: a person's affiliation, as reported by the API
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::WorkgroupError;

// ---------------------------------------------------------------------------
// Visibility
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkgroupVisibility {
    /// Anyone at the institution can see membership.
    #[default]
    Stanford,
    /// Only administrators can see membership.
    Private,
}

impl WorkgroupVisibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkgroupVisibility::Stanford => "STANFORD",
            WorkgroupVisibility::Private => "PRIVATE",
        }
    }
}

impl fmt::Display for WorkgroupVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkgroupVisibility {
    type Err = WorkgroupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "STANFORD" => Ok(WorkgroupVisibility::Stanford),
            "PRIVATE" => Ok(WorkgroupVisibility::Private),
            _ => Err(WorkgroupError::InvalidProperty {
                property: "visibility",
                value: s.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Affiliation
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Affiliation {
    Faculty,
    Staff,
    Student,
    /// Sponsored SUNetID.
    Sponsored,
    #[serde(other)]
    Other,
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkgroupFilter {
    #[default]
    None,
    /// Faculty, staff, students and sponsored people.
    AcademicAdministrative,
    Student,
    Faculty,
    Staff,
    FacultyStaff,
    FacultyStudent,
    StaffStudent,
    FacultyStaffStudent,
}

impl WorkgroupFilter {
    pub const ALL: [WorkgroupFilter; 9] = [
        WorkgroupFilter::None,
        WorkgroupFilter::AcademicAdministrative,
        WorkgroupFilter::Student,
        WorkgroupFilter::Faculty,
        WorkgroupFilter::Staff,
        WorkgroupFilter::FacultyStaff,
        WorkgroupFilter::FacultyStudent,
        WorkgroupFilter::StaffStudent,
        WorkgroupFilter::FacultyStaffStudent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkgroupFilter::None => "NONE",
            WorkgroupFilter::AcademicAdministrative => "ACADEMIC_ADMINISTRATIVE",
            WorkgroupFilter::Student => "STUDENT",
            WorkgroupFilter::Faculty => "FACULTY",
            WorkgroupFilter::Staff => "STAFF",
            WorkgroupFilter::FacultyStaff => "FACULTY_STAFF",
            WorkgroupFilter::FacultyStudent => "FACULTY_STUDENT",
            WorkgroupFilter::StaffStudent => "STAFF_STUDENT",
            WorkgroupFilter::FacultyStaffStudent => "FACULTY_STAFF_STUDENT",
        }
    }

    /// Affiliations that pass this filter. `None` for the unfiltered case.
    fn accepted(&self) -> Option<&'static [Affiliation]> {
        use Affiliation::*;
        match self {
            WorkgroupFilter::None => None,
            WorkgroupFilter::AcademicAdministrative => Some(&[Faculty, Staff, Student, Sponsored]),
            WorkgroupFilter::Student => Some(&[Student]),
            WorkgroupFilter::Faculty => Some(&[Faculty]),
            WorkgroupFilter::Staff => Some(&[Staff]),
            WorkgroupFilter::FacultyStaff => Some(&[Faculty, Staff]),
            WorkgroupFilter::FacultyStudent => Some(&[Faculty, Student]),
            WorkgroupFilter::StaffStudent => Some(&[Staff, Student]),
            WorkgroupFilter::FacultyStaffStudent => Some(&[Faculty, Staff, Student]),
        }
    }

    /// Whether a person with `affiliations` passes the filter. People with no
    /// known affiliation only pass `NONE`.
    pub fn admits(&self, affiliations: &[Affiliation]) -> bool {
        match self.accepted() {
            None => true,
            Some(accepted) => affiliations.iter().any(|a| accepted.contains(a)),
        }
    }
}

impl fmt::Display for WorkgroupFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkgroupFilter {
    type Err = WorkgroupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        WorkgroupFilter::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == upper)
            .ok_or_else(|| WorkgroupError::InvalidProperty {
                property: "filter",
                value: s.to_string(),
            })
    }
}
