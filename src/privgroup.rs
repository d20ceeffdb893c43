/// Privgroup resolution.
///
/// A privgroup is the flattened list of people behind one roster of a
/// workgroup:
///
/// 1. take the people listed directly on the roster
/// 2. for every nested workgroup that publishes a privgroup, add that
///    workgroup's own flattened *members* (with its own filter applied)
/// 3. drop duplicates, and drop certificates entirely
/// 4. apply the root workgroup's filter
///
/// Records are always read fresh through a [`MembershipSource`]; nothing is
/// cached between calls.
use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;

use crate::api::WorkgroupApi;
use crate::error::{Result, WorkgroupError};
use crate::membership::MemberKind;
use crate::properties::{Affiliation, WorkgroupFilter};
use crate::record::{MemberRecord, WorkgroupRecord};
use crate::validate;

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// One resolved person.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PrivgroupEntry {
    pub sunetid: String,
    /// Display name, `Last, First`.
    pub name: String,
    /// When the person joined the roster they were found on.
    pub last_update: Option<NaiveDate>,
    pub affiliations: Vec<Affiliation>,
}

impl PrivgroupEntry {
    pub fn from_member(member: &MemberRecord) -> Self {
        Self {
            sunetid: MemberKind::Person.normalize(&member.id),
            name: member.name.trim_end().to_string(),
            last_update: member.last_update,
            affiliations: member.affiliations.clone(),
        }
    }
}

/// Members and administrators privgroups of one workgroup, as resolved at
/// one point in time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PrivgroupContents {
    pub members: BTreeSet<PrivgroupEntry>,
    pub administrators: BTreeSet<PrivgroupEntry>,
}

impl PrivgroupContents {
    pub fn has_member(&self, sunetid: &str) -> bool {
        self.members.iter().any(|e| e.sunetid == sunetid)
    }

    pub fn has_administrator(&self, sunetid: &str) -> bool {
        self.administrators.iter().any(|e| e.sunetid == sunetid)
    }
}

// ---------------------------------------------------------------------------
// Source of workgroup records
// ---------------------------------------------------------------------------

/// Where the resolver reads workgroup records from.
pub trait MembershipSource {
    /// Full record of `name`, or `None` when it does not exist.
    fn workgroup_record(&self, name: &str) -> Result<Option<WorkgroupRecord>>;
}

impl MembershipSource for WorkgroupApi {
    fn workgroup_record(&self, name: &str) -> Result<Option<WorkgroupRecord>> {
        self.fetch(name)
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

type People = BTreeMap<String, PrivgroupEntry>;

pub struct PrivgroupResolver<'a> {
    source: &'a dyn MembershipSource,
}

impl<'a> PrivgroupResolver<'a> {
    pub fn new(source: &'a dyn MembershipSource) -> Self {
        Self { source }
    }

    /// Resolve both privgroups of `name`.
    ///
    /// Fails with `NotFound` if `name` is gone and `PrivgroupUnavailable` if it
    /// does not publish a privgroup. Nested workgroups that are gone, or that
    /// do not publish a privgroup, contribute nobody.
    pub fn resolve(&self, name: &str) -> Result<PrivgroupContents> {
        let name = validate::canonical_name(name);
        let record = self
            .source
            .workgroup_record(&name)?
            .ok_or_else(|| WorkgroupError::NotFound(name.clone()))?;
        if !record.privgroup {
            return Err(WorkgroupError::PrivgroupUnavailable(name));
        }

        let mut graph = NestingGraph {
            source: self.source,
            records: HashMap::new(),
            path: vec![name.clone()],
        };
        graph.records.insert(name.clone(), Some(record.clone()));
        for entry in record.members.iter().chain(&record.administrators) {
            if entry.kind == MemberKind::Workgroup {
                graph.collect(&MemberKind::Workgroup.normalize(&entry.id))?;
            }
        }
        let flat = graph.flatten();

        let contents = PrivgroupContents {
            members: admitted(record.filter, gather(&record.members, &flat))
                .into_values()
                .collect(),
            administrators: admitted(record.filter, gather(&record.administrators, &flat))
                .into_values()
                .collect(),
        };
        log::debug!(
            "Privgroup of {}: {} members, {} administrators",
            name,
            contents.members.len(),
            contents.administrators.len()
        );
        Ok(contents)
    }
}

/// Every workgroup reachable from the root through nested entries, each
/// fetched once. `None` marks a workgroup that is gone or that does not
/// publish a privgroup.
struct NestingGraph<'a> {
    source: &'a dyn MembershipSource,
    records: HashMap<String, Option<WorkgroupRecord>>,
    path: Vec<String>,
}

impl NestingGraph<'_> {
    fn collect(&mut self, name: &str) -> Result<()> {
        if self.path.iter().any(|n| n == name) {
            log::warn!(
                "Workgroup nesting cycle: {} -> {}",
                self.path.join(" -> "),
                name
            );
            return Ok(());
        }
        if self.records.contains_key(name) {
            return Ok(());
        }

        let record = match self.source.workgroup_record(name)? {
            None => {
                log::debug!("Nested workgroup {} no longer exists", name);
                None
            }
            Some(record) if !record.privgroup => {
                log::debug!("Nested workgroup {} does not publish a privgroup", name);
                None
            }
            Some(record) => Some(record),
        };
        self.records.insert(name.to_string(), record.clone());

        if let Some(record) = record {
            self.path.push(name.to_string());
            let result = record
                .members
                .iter()
                .filter(|entry| entry.kind == MemberKind::Workgroup)
                .try_for_each(|entry| self.collect(&MemberKind::Workgroup.normalize(&entry.id)));
            self.path.pop();
            result?;
        }
        Ok(())
    }

    /// Flattened, filtered members of every collected workgroup.
    ///
    /// Each workgroup's set is its filter applied to its direct people plus
    /// the sets of its nested workgroups. Sets only grow, so repeating the
    /// pass until nothing changes settles cycles without losing anyone on
    /// them.
    fn flatten(&self) -> HashMap<String, People> {
        let mut flat: HashMap<String, People> = HashMap::new();
        let mut passes = 0;
        loop {
            passes += 1;
            let mut changed = false;
            for (name, record) in &self.records {
                let Some(record) = record else { continue };
                let next = admitted(record.filter, gather(&record.members, &flat));
                if flat.get(name) != Some(&next) {
                    flat.insert(name.clone(), next);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        log::trace!("Nesting graph of {} workgroups settled in {} passes", self.records.len(), passes);
        flat
    }
}

/// People on a roster: direct entries plus the flattened sets of its nested
/// workgroups. Certificates never contribute.
fn gather(entries: &[MemberRecord], flat: &HashMap<String, People>) -> People {
    let mut people = People::new();
    for entry in entries {
        match entry.kind {
            MemberKind::Person => {
                let person = PrivgroupEntry::from_member(entry);
                people.entry(person.sunetid.clone()).or_insert(person);
            }
            MemberKind::Workgroup => {
                let name = MemberKind::Workgroup.normalize(&entry.id);
                if let Some(nested) = flat.get(&name) {
                    for (sunetid, person) in nested {
                        people.entry(sunetid.clone()).or_insert_with(|| person.clone());
                    }
                }
            }
            MemberKind::Certificate => {}
        }
    }
    people
}

fn admitted(filter: WorkgroupFilter, people: People) -> People {
    people
        .into_iter()
        .filter(|(_, person)| filter.admits(&person.affiliations))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::Side;
    use crate::test_utils::FakeWorkgroupServer;
    use crate::workgroup::Workgroup;
    use crate::WorkgroupClient;

    fn server() -> FakeWorkgroupServer {
        let server = FakeWorkgroupServer::new();
        server.add_person("user", "User, Some  ", &[Affiliation::Staff]);
        server.add_person("prof", "Prof, A", &[Affiliation::Faculty]);
        server.add_person("kid", "Student, A", &[Affiliation::Student]);
        server.insert_workgroup("test:a", "A");
        server.insert_workgroup("test:b", "B");
        server.add_entry("test:a", Side::Members, MemberKind::Person, "user");
        server.add_entry("test:b", Side::Administrators, MemberKind::Workgroup, "test:a");
        server
    }

    fn resolve(server: &FakeWorkgroupServer, name: &str) -> Result<PrivgroupContents> {
        let client = WorkgroupClient::with_transport(server.clone());
        let wg: Workgroup = client.get(name)?;
        wg.get_privgroup()
    }

    #[test]
    fn test_nested_admin_members_are_administrators() {
        let server = server();
        let client = WorkgroupClient::with_transport(server.clone());
        let b = client.get("test:b").unwrap();
        let contents = b.get_privgroup().unwrap();
        assert!(contents.has_administrator("user"));
        assert!(!contents.has_member("user"));
        assert!(!b.administrators().unwrap().people().contains("user").unwrap());

        let entry = contents.administrators.iter().next().unwrap();
        assert_eq!(entry.name, "User, Some");
        assert_eq!(entry.affiliations, vec![Affiliation::Staff]);
    }

    #[test]
    fn test_certificates_excluded() {
        let server = server();
        server.add_entry("test:a", Side::Administrators, MemberKind::Certificate, "host.example.com");
        let contents = resolve(&server, "test:a").unwrap();
        assert!(contents.administrators.is_empty());
        assert_eq!(contents.members.len(), 1);
    }

    #[test]
    fn test_duplicates_collapse() {
        let server = server();
        server.add_entry("test:b", Side::Administrators, MemberKind::Person, "user");
        let contents = resolve(&server, "test:b").unwrap();
        assert_eq!(contents.administrators.len(), 1);
    }

    #[test]
    fn test_root_filter_applied_last() {
        let server = server();
        server.add_entry("test:a", Side::Members, MemberKind::Person, "prof");
        server.add_entry("test:a", Side::Members, MemberKind::Person, "kid");
        server.set_filter("test:b", WorkgroupFilter::FacultyStudent);
        let contents = resolve(&server, "test:b").unwrap();
        assert!(contents.has_administrator("prof"));
        assert!(contents.has_administrator("kid"));
        assert!(!contents.has_administrator("user"));
    }

    #[test]
    fn test_nested_filter_applied() {
        let server = server();
        server.add_entry("test:a", Side::Members, MemberKind::Person, "prof");
        server.set_filter("test:a", WorkgroupFilter::Staff);
        let contents = resolve(&server, "test:b").unwrap();
        assert!(contents.has_administrator("user"));
        assert!(!contents.has_administrator("prof"));
    }

    #[test]
    fn test_academic_administrative_keeps_students() {
        let server = server();
        server.add_person("guest", "Guest, A", &[Affiliation::Sponsored]);
        server.add_entry("test:a", Side::Members, MemberKind::Person, "kid");
        server.add_entry("test:a", Side::Members, MemberKind::Person, "guest");
        server.set_filter("test:a", WorkgroupFilter::AcademicAdministrative);
        let contents = resolve(&server, "test:a").unwrap();
        assert!(contents.has_member("user"));
        assert!(contents.has_member("kid"));
        assert!(contents.has_member("guest"));
    }

    #[test]
    fn test_nested_without_privgroup_contributes_nothing() {
        let server = server();
        server.set_privgroup("test:a", false);
        let contents = resolve(&server, "test:b").unwrap();
        assert!(contents.administrators.is_empty());
    }

    #[test]
    fn test_cycle_is_cut() {
        let server = server();
        server.add_entry("test:a", Side::Members, MemberKind::Workgroup, "test:b");
        server.add_entry("test:b", Side::Members, MemberKind::Workgroup, "test:a");
        server.add_entry("test:b", Side::Members, MemberKind::Person, "kid");
        let contents = resolve(&server, "test:b").unwrap();
        assert!(contents.has_member("user"));
        assert!(contents.has_member("kid"));
        assert!(contents.has_administrator("user"));
        assert!(contents.has_administrator("kid"));
    }

    #[test]
    fn test_cycle_through_other_workgroups() {
        let server = server();
        server.insert_workgroup("test:c", "C");
        server.add_entry("test:a", Side::Members, MemberKind::Workgroup, "test:c");
        server.add_entry("test:c", Side::Members, MemberKind::Workgroup, "test:a");
        server.add_entry("test:c", Side::Members, MemberKind::Person, "prof");
        server.add_entry("test:b", Side::Members, MemberKind::Workgroup, "test:c");

        let contents = resolve(&server, "test:b").unwrap();
        for sunetid in ["user", "prof"] {
            assert!(contents.has_member(sunetid));
            assert!(contents.has_administrator(sunetid));
        }
        assert_eq!(contents.members, contents.administrators);
    }

    #[test]
    fn test_missing_nested_workgroup() {
        let server = server();
        server.add_entry("test:b", Side::Members, MemberKind::Workgroup, "test:gone");
        let contents = resolve(&server, "test:b").unwrap();
        assert!(contents.members.is_empty());
    }

    #[test]
    fn test_reads_remote_state_each_time() {
        let server = server();
        let client = WorkgroupClient::with_transport(server.clone());
        let b = client.get("test:b").unwrap();
        assert_eq!(b.get_privgroup().unwrap().administrators.len(), 1);
        server.add_entry("test:a", Side::Members, MemberKind::Person, "prof");
        assert_eq!(b.get_privgroup().unwrap().administrators.len(), 2);
    }

    #[test]
    fn test_root_gone_marks_deleted() {
        let server = server();
        let client = WorkgroupClient::with_transport(server.clone());
        let b = client.get("test:b").unwrap();
        server.remove_workgroup("test:b");
        assert!(b.get_privgroup().unwrap_err().is_deleted());
        assert!(b.is_deleted());
    }
}
