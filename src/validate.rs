/// Local validation for names, descriptions, roster identifiers and search
/// patterns. Everything here runs before a request is sent, so invalid input
/// never costs a round-trip.
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, WorkgroupError};
use crate::membership::MemberKind;

/// Longest workgroup name the API accepts.
pub const MAX_NAME_LEN: usize = 81;

/// Longest description the API accepts.
pub const MAX_DESCRIPTION_LEN: usize = 255;

/// Literal characters required before the first wildcard of a name search.
pub const MIN_SEARCH_PREFIX: usize = 4;

pub const SEARCH_WILDCARD: char = '*';

static WORKGROUP_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9_-]*:[a-z0-9][a-z0-9_-]*$").expect("static regex"));

static PERSON_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9]{2,7}$").expect("static regex"));

static CERTIFICATE_CN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{0,63}$").expect("static regex"));

static STEM_OWNERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^workgroup:[a-z0-9][a-z0-9_-]*-owners$").expect("static regex"));

/// Workgroup names are case-insensitive; the lowercase form is canonical.
pub fn canonical_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Check a (canonical) workgroup name for creation.
pub fn workgroup_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| WorkgroupError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };
    if name.chars().count() > MAX_NAME_LEN {
        return Err(invalid("longer than 81 characters"));
    }
    if !WORKGROUP_NAME.is_match(name) {
        return Err(invalid("expected stem:name using a-z, 0-9, '-' and '_'"));
    }
    Ok(())
}

/// Descriptions must fit in ISO 8859-1 and contain no control characters.
pub fn description(value: &str) -> Result<()> {
    if value.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(WorkgroupError::InvalidDescription(
            "longer than 255 characters".to_string(),
        ));
    }
    if value.chars().any(|c| (c as u32) > 0xFF) {
        return Err(WorkgroupError::InvalidDescription(
            "not encodable in ISO 8859-1".to_string(),
        ));
    }
    if value.chars().any(char::is_control) {
        return Err(WorkgroupError::InvalidDescription(
            "contains non-printable characters".to_string(),
        ));
    }
    Ok(())
}

/// True for the reserved per-stem owner workgroups (`workgroup:<stem>-owners`).
pub fn is_stem_owner(name: &str) -> bool {
    STEM_OWNERS.is_match(name)
}

/// Check that `identifier` has the shape of a `kind` roster entry.
pub fn identifier(kind: MemberKind, identifier: &str) -> Result<()> {
    let valid = match kind {
        MemberKind::Person => PERSON_ID.is_match(identifier),
        MemberKind::Workgroup => {
            identifier.chars().count() <= MAX_NAME_LEN && WORKGROUP_NAME.is_match(identifier)
        }
        MemberKind::Certificate => CERTIFICATE_CN.is_match(identifier),
    };
    if valid {
        Ok(())
    } else {
        Err(WorkgroupError::InvalidIdentifier {
            kind,
            identifier: identifier.to_string(),
            reason: format!("not a valid {} identifier", kind),
        })
    }
}

/// Check a name-search pattern: non-empty, no leading wildcard, and at least
/// four literal characters before the first wildcard.
pub fn search_pattern(pattern: &str) -> Result<()> {
    let invalid = |reason: &str| WorkgroupError::InvalidSearch {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    };
    if pattern.is_empty() {
        return Err(invalid("empty search"));
    }
    if !pattern.is_ascii() {
        return Err(invalid("search must be ASCII"));
    }
    if pattern.starts_with(SEARCH_WILDCARD) {
        return Err(invalid("search cannot begin with a wildcard"));
    }
    let prefix = pattern
        .split(SEARCH_WILDCARD)
        .next()
        .unwrap_or_default();
    if prefix.chars().count() < MIN_SEARCH_PREFIX {
        return Err(invalid("at least 4 characters are needed before the first wildcard"));
    }
    Ok(())
}

/// Targets of a search by user, workgroup or certificate.
pub fn search_target(target: &str) -> Result<()> {
    if target.trim().is_empty() {
        return Err(WorkgroupError::InvalidSearch {
            pattern: target.to_string(),
            reason: "empty search target".to_string(),
        });
    }
    if target.contains(SEARCH_WILDCARD) {
        return Err(WorkgroupError::InvalidSearch {
            pattern: target.to_string(),
            reason: "wildcards are not allowed here".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workgroup_names() {
        assert!(workgroup_name("create:1").is_ok());
        assert!(workgroup_name("research-computing:sysadmins").is_ok());
        for bad in ["", "create:", ":1", "créate:1", "create:üno", "a:b:c", "Create:1"] {
            assert!(
                matches!(workgroup_name(bad), Err(WorkgroupError::InvalidName { .. })),
                "{} should be rejected",
                bad
            );
        }
        let long = format!("create:{}", "1".repeat(75));
        assert!(workgroup_name(&long).is_err());
        let longest = format!("create:{}", "1".repeat(74));
        assert!(workgroup_name(&longest).is_ok());
    }

    #[test]
    fn test_canonical_name() {
        assert_eq!(canonical_name("  Test:ONE "), "test:one");
    }

    #[test]
    fn test_descriptions() {
        assert!(description("Create Test 1").is_ok());
        assert!(description("Café").is_ok());
        assert!(description("").is_ok());
        assert!(description(&"x".repeat(256)).is_err());
        assert!(description("snow ☃").is_err());
        assert!(description("line\nbreak").is_err());
    }

    #[test]
    fn test_stem_owner_pattern() {
        assert!(is_stem_owner("workgroup:test-owners"));
        assert!(is_stem_owner("workgroup:research-computing-owners"));
        assert!(!is_stem_owner("workgroup:owners"));
        assert!(!is_stem_owner("test:test-owners"));
        assert!(!is_stem_owner("workgroup:test-owners-2"));
    }

    #[test]
    fn test_identifiers() {
        assert!(identifier(MemberKind::Person, "akkornel").is_ok());
        assert!(identifier(MemberKind::Person, "ab").is_err());
        assert!(identifier(MemberKind::Person, "test:1").is_err());
        assert!(identifier(MemberKind::Workgroup, "workgroup:test-owners").is_ok());
        assert!(identifier(MemberKind::Workgroup, "akkornel").is_err());
        assert!(identifier(MemberKind::Certificate, "host.example.com").is_ok());
        assert!(identifier(MemberKind::Certificate, "has space").is_err());
    }

    #[test]
    fn test_search_patterns() {
        assert!(search_pattern("abc:*").is_ok());
        assert!(search_pattern("mais*").is_ok());
        assert!(search_pattern("research-computing:sysadmins*").is_ok());
        assert!(search_pattern("abcd").is_ok());
        for bad in ["", "*", "*abc", "ab:*", "mai*", "abc", "résumé:*"] {
            assert!(
                matches!(search_pattern(bad), Err(WorkgroupError::InvalidSearch { .. })),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_search_targets() {
        assert!(search_target("akkornel").is_ok());
        assert!(search_target("").is_err());
        assert!(search_target("akk*").is_err());
    }
}
