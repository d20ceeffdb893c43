/// The workgroup entity.
///
/// A `Workgroup` is a cheap handle onto shared state: every clone, and every
/// lookup of the same name through the client cache, sees the same live
/// record. State machine is Active -> Deleted, entered by `delete()` or by
/// any call that finds the workgroup gone; a later successful `refresh()`
/// brings it back (the workgroup was restored upstream).
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde_json::{Map, Value};

use crate::api::{UpdateOutcome, WorkgroupApi};
use crate::client::{ClientShared, WorkgroupClient};
use crate::error::{Result, WorkgroupError};
use crate::membership::{MemberId, MemberKind, Membership, MembershipSets, Side};
use crate::privgroup::{PrivgroupContents, PrivgroupResolver};
use crate::properties::{WorkgroupFilter, WorkgroupVisibility};
use crate::record::{flag_str, WorkgroupRecord};
use crate::validate;

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

/// Scalar properties of a workgroup, as last seen.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkgroupProperties {
    pub description: String,
    pub privgroup: bool,
    pub reusable: bool,
    pub visibility: WorkgroupVisibility,
    pub filter: WorkgroupFilter,
    /// Remote-side date of the last change.
    pub last_update: NaiveDate,
    /// Whether the caller may read the rosters.
    pub can_see_membership: bool,
}

impl WorkgroupProperties {
    pub fn from_record(record: &WorkgroupRecord) -> Self {
        Self {
            description: record.description.clone(),
            privgroup: record.privgroup,
            reusable: record.reusable,
            visibility: record.visibility,
            filter: record.filter,
            last_update: record.last_update,
            can_see_membership: record.can_see_membership(),
        }
    }
}

// ---------------------------------------------------------------------------
// Creation request
// ---------------------------------------------------------------------------

/// Parameters for creating a workgroup.
#[derive(Clone, Debug, PartialEq)]
pub struct NewWorkgroup {
    pub name: String,
    pub description: String,
    pub filter: WorkgroupFilter,
    pub privgroup: bool,
    pub reusable: bool,
    pub visibility: WorkgroupVisibility,
}

impl NewWorkgroup {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: validate::canonical_name(name),
            description: description.to_string(),
            filter: WorkgroupFilter::None,
            privgroup: true,
            reusable: true,
            visibility: WorkgroupVisibility::Stanford,
        }
    }

    pub fn with_filter(mut self, filter: WorkgroupFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_privgroup(mut self, privgroup: bool) -> Self {
        self.privgroup = privgroup;
        self
    }

    pub fn with_reusable(mut self, reusable: bool) -> Self {
        self.reusable = reusable;
        self
    }

    pub fn with_visibility(mut self, visibility: WorkgroupVisibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate::workgroup_name(&self.name)?;
        validate::description(&self.description)
    }

    pub(crate) fn body(&self) -> Value {
        serde_json::json!({
            "description": self.description,
            "filter": self.filter.as_str(),
            "visibility": self.visibility.as_str(),
            "privgroup": flag_str(self.privgroup),
            "reusable": flag_str(self.reusable),
        })
    }
}

// ---------------------------------------------------------------------------
// Workgroup
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub(crate) struct WorkgroupState {
    deleted: bool,
    last_refresh: DateTime<Utc>,
    properties: WorkgroupProperties,
    members: MembershipSets,
    administrators: MembershipSets,
}

impl WorkgroupState {
    fn roster(&self, side: Side) -> &MembershipSets {
        match side {
            Side::Members => &self.members,
            Side::Administrators => &self.administrators,
        }
    }

    fn roster_mut(&mut self, side: Side) -> &mut MembershipSets {
        match side {
            Side::Members => &mut self.members,
            Side::Administrators => &mut self.administrators,
        }
    }
}

struct WorkgroupInner {
    name: String,
    api: Rc<WorkgroupApi>,
    client: Weak<ClientShared>,
    state: RefCell<WorkgroupState>,
}

/// Shared handle to one workgroup.
#[derive(Clone)]
pub struct Workgroup {
    inner: Rc<WorkgroupInner>,
}

impl Workgroup {
    pub(crate) fn from_record(
        record: &WorkgroupRecord,
        api: Rc<WorkgroupApi>,
        client: Weak<ClientShared>,
    ) -> Self {
        let name = validate::canonical_name(&record.name);
        let mut members = MembershipSets::new(Side::Members, &name);
        let mut administrators = MembershipSets::new(Side::Administrators, &name);
        members.load(&record.members);
        administrators.load(&record.administrators);

        let state = WorkgroupState {
            deleted: false,
            last_refresh: Utc::now(),
            properties: WorkgroupProperties::from_record(record),
            members,
            administrators,
        };
        Self {
            inner: Rc::new(WorkgroupInner {
                name,
                api,
                client,
                state: RefCell::new(state),
            }),
        }
    }

    /// Look up `name` through `client`'s cache.
    pub fn get(client: &WorkgroupClient, name: &str) -> Result<Workgroup> {
        client.get(name)
    }

    pub fn create(client: &WorkgroupClient, new: NewWorkgroup) -> Result<Workgroup> {
        client.create(new)
    }

    /// True when both handles refer to the same entity.
    pub fn ptr_eq(a: &Workgroup, b: &Workgroup) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }

    // -----------------------------------------------------------------------
    // Always readable
    // -----------------------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn is_deleted(&self) -> bool {
        self.inner.state.borrow().deleted
    }

    /// The client this workgroup was loaded through, if it is still alive.
    pub fn client(&self) -> Option<WorkgroupClient> {
        self.inner.client.upgrade().map(WorkgroupClient::from_shared)
    }

    /// When the local record was last brought up to date.
    pub fn last_refresh(&self) -> DateTime<Utc> {
        self.inner.state.borrow().last_refresh
    }

    // -----------------------------------------------------------------------
    // Readable while active
    // -----------------------------------------------------------------------

    fn ensure_active(&self) -> Result<()> {
        if self.is_deleted() {
            return Err(WorkgroupError::WorkgroupDeleted(self.name().to_string()));
        }
        Ok(())
    }

    fn read<R>(&self, f: impl FnOnce(&WorkgroupProperties) -> R) -> Result<R> {
        self.ensure_active()?;
        Ok(f(&self.inner.state.borrow().properties))
    }

    pub fn properties(&self) -> Result<WorkgroupProperties> {
        self.read(|p| p.clone())
    }

    pub fn description(&self) -> Result<String> {
        self.read(|p| p.description.clone())
    }

    pub fn privgroup(&self) -> Result<bool> {
        self.read(|p| p.privgroup)
    }

    pub fn reusable(&self) -> Result<bool> {
        self.read(|p| p.reusable)
    }

    pub fn visibility(&self) -> Result<WorkgroupVisibility> {
        self.read(|p| p.visibility)
    }

    pub fn filter(&self) -> Result<WorkgroupFilter> {
        self.read(|p| p.filter)
    }

    pub fn last_update(&self) -> Result<NaiveDate> {
        self.read(|p| p.last_update)
    }

    pub fn can_see_membership(&self) -> Result<bool> {
        self.read(|p| p.can_see_membership)
    }

    pub fn members(&self) -> Result<Membership> {
        self.ensure_active()?;
        Ok(Membership::new(self.clone(), Side::Members))
    }

    pub fn administrators(&self) -> Result<Membership> {
        self.ensure_active()?;
        Ok(Membership::new(self.clone(), Side::Administrators))
    }

    // -----------------------------------------------------------------------
    // Setters
    // -----------------------------------------------------------------------

    pub fn set_description(&self, description: &str) -> Result<()> {
        self.ensure_active()?;
        validate::description(description)?;
        let value = description.to_string();
        self.update("description", Value::String(value.clone()), move |p| {
            p.description = value
        })
    }

    pub fn set_privgroup(&self, privgroup: bool) -> Result<()> {
        self.update("privgroup", flag_str(privgroup).into(), move |p| {
            p.privgroup = privgroup
        })
    }

    pub fn set_reusable(&self, reusable: bool) -> Result<()> {
        self.update("reusable", flag_str(reusable).into(), move |p| {
            p.reusable = reusable
        })
    }

    pub fn set_visibility(&self, visibility: WorkgroupVisibility) -> Result<()> {
        self.update("visibility", visibility.as_str().into(), move |p| {
            p.visibility = visibility
        })
    }

    pub fn set_filter(&self, filter: WorkgroupFilter) -> Result<()> {
        self.update("filter", filter.as_str().into(), move |p| p.filter = filter)
    }

    /// Send one property change. If the server echoes the record, its
    /// scalars are merged; otherwise the requested value is applied.
    /// Rosters are left alone either way.
    fn update(
        &self,
        field: &str,
        value: Value,
        apply: impl FnOnce(&mut WorkgroupProperties),
    ) -> Result<()> {
        self.ensure_active()?;
        let mut changes = Map::new();
        changes.insert(field.to_string(), value);

        match self.inner.api.update(self.name(), changes) {
            Ok(UpdateOutcome::Record(record)) => {
                self.apply_scalars(&record);
                Ok(())
            }
            Ok(UpdateOutcome::Applied) => {
                let mut state = self.inner.state.borrow_mut();
                apply(&mut state.properties);
                state.properties.last_update = today();
                state.last_refresh = Utc::now();
                Ok(())
            }
            Err(e) if e.is_not_found() => Err(self.discovered_deleted()),
            Err(e) => Err(e),
        }
    }

    /// Merge the scalar fields of `record`, leaving both rosters untouched.
    pub(crate) fn apply_scalars(&self, record: &WorkgroupRecord) {
        let mut state = self.inner.state.borrow_mut();
        state.properties = WorkgroupProperties::from_record(record);
        state.last_refresh = Utc::now();
    }

    /// Replace everything with `record`.
    pub(crate) fn apply_record(&self, record: &WorkgroupRecord) {
        let mut state = self.inner.state.borrow_mut();
        if state.deleted {
            log::info!("Workgroup {} is back", self.name());
        }
        state.deleted = false;
        state.properties = WorkgroupProperties::from_record(record);
        state.members.load(&record.members);
        state.administrators.load(&record.administrators);
        state.last_refresh = Utc::now();
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Re-fetch the full record. Allowed on a deleted workgroup, in which case
    /// it either confirms the deletion or revives the entity.
    pub fn refresh(&self) -> Result<()> {
        log::debug!("Refreshing {}", self.name());
        match self.inner.api.fetch(self.name())? {
            Some(record) => {
                self.apply_record(&record);
                Ok(())
            }
            None => Err(self.discovered_deleted()),
        }
    }

    pub fn delete(&self) -> Result<()> {
        self.ensure_active()?;
        match self.inner.api.delete(self.name()) {
            Ok(()) => {
                self.mark_deleted();
                Ok(())
            }
            Err(e) if e.is_not_found() => Err(self.discovered_deleted()),
            Err(e) => Err(e),
        }
    }

    /// Resolve the flattened people lists from the current remote state.
    pub fn get_privgroup(&self) -> Result<PrivgroupContents> {
        if !self.privgroup()? {
            return Err(WorkgroupError::PrivgroupUnavailable(self.name().to_string()));
        }
        let resolver = PrivgroupResolver::new(self.inner.api.as_ref());
        match resolver.resolve(self.name()) {
            Err(e) if e.is_not_found() => Err(self.discovered_deleted()),
            other => other,
        }
    }

    fn mark_deleted(&self) {
        let mut state = self.inner.state.borrow_mut();
        state.deleted = true;
        state.last_refresh = Utc::now();
        state.members.clear();
        state.administrators.clear();
    }

    /// Record a deletion found by some other operation, and build the error
    /// to report it.
    fn discovered_deleted(&self) -> WorkgroupError {
        log::warn!("Workgroup {} has been deleted", self.name());
        self.mark_deleted();
        WorkgroupError::WorkgroupDeleted(self.name().to_string())
    }

    // -----------------------------------------------------------------------
    // Roster plumbing for membership handles
    // -----------------------------------------------------------------------

    pub(crate) fn with_roster<R>(&self, side: Side, f: impl FnOnce(&MembershipSets) -> R) -> R {
        f(self.inner.state.borrow().roster(side))
    }

    pub(crate) fn read_roster<R>(
        &self,
        side: Side,
        f: impl FnOnce(&MembershipSets) -> R,
    ) -> Result<R> {
        self.ensure_active()?;
        Ok(self.with_roster(side, f))
    }

    pub(crate) fn roster_add(&self, side: Side, kind: MemberKind, id: &str) -> Result<()> {
        self.ensure_active()?;
        self.with_roster(side, |sets| sets.get(kind).validate(id))?;

        match self.inner.api.add_member(self.name(), side, kind, id) {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                self.probe_after_missing_entry()?;
                return Err(WorkgroupError::InvalidIdentifier {
                    kind,
                    identifier: id.to_string(),
                    reason: "not known to the Workgroup service".to_string(),
                });
            }
            Err(e) => return Err(e),
        }

        let mut state = self.inner.state.borrow_mut();
        state.roster_mut(side).get_mut(kind).insert(id)?;
        state.properties.last_update = today();
        Ok(())
    }

    pub(crate) fn roster_discard(&self, side: Side, kind: MemberKind, id: &str) -> Result<()> {
        self.ensure_active()?;
        if let Err(e) = self.with_roster(side, |sets| sets.get(kind).validate(id)) {
            log::debug!("Not discarding {}: {}", id, e);
            return Ok(());
        }

        match self.inner.api.remove_member(self.name(), side, kind, id) {
            Ok(()) => {
                self.inner.state.borrow_mut().properties.last_update = today();
            }
            Err(e) if e.is_not_found() => self.probe_after_missing_entry()?,
            Err(e) => return Err(e),
        }

        self.inner
            .state
            .borrow_mut()
            .roster_mut(side)
            .get_mut(kind)
            .remove(id);
        Ok(())
    }

    /// A roster route answered 404: either the workgroup is gone or the entry
    /// is unknown. Ask the workgroup route which one.
    fn probe_after_missing_entry(&self) -> Result<()> {
        let exists = match self.inner.api.exists(self.name())? {
            Some(exists) => exists,
            None => self.inner.api.fetch(self.name())?.is_some(),
        };
        if exists {
            Ok(())
        } else {
            Err(self.discovered_deleted())
        }
    }
}

impl MemberId for Workgroup {
    fn member_id(&self) -> String {
        self.name().to_string()
    }
}

impl fmt::Debug for Workgroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("Workgroup")
            .field("name", &self.inner.name)
            .field("deleted", &state.deleted)
            .field("last_refresh", &state.last_refresh)
            .field("properties", &state.properties)
            .finish()
    }
}

impl fmt::Display for Workgroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        if state.deleted {
            return write!(f, "Workgroup(deleted)");
        }
        let p = &state.properties;
        write!(
            f,
            "Workgroup(name={}, description={:?}, filter={}, privgroup={}, reusable={}, visibility={}, last_update={}, members={}, administrators={})",
            self.inner.name,
            p.description,
            p.filter,
            p.privgroup,
            p.reusable,
            p.visibility,
            p.last_update,
            state.members.len(),
            state.administrators.len(),
        )
    }
}

/// Today's date in the host's local timezone. Local changes stamp
/// `last_update` with it until the next refresh replaces it with the
/// remote-side date.
fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeWorkgroupServer;
    use crate::transport::Method;

    fn setup() -> (FakeWorkgroupServer, WorkgroupClient) {
        let server = FakeWorkgroupServer::new();
        server.insert_workgroup("test:1", "Test 1");
        server.add_entry("test:1", Side::Members, MemberKind::Person, "akkornel");
        server.add_entry("test:1", Side::Administrators, MemberKind::Person, "stanford");
        server.add_entry("test:1", Side::Administrators, MemberKind::Workgroup, "workgroup:test-owners");
        let client = WorkgroupClient::with_transport(server.clone());
        (server, client)
    }

    #[test]
    fn test_loaded_state() {
        let (_server, client) = setup();
        let wg = client.get("test:1").unwrap();
        assert_eq!(wg.name(), "test:1");
        assert_eq!(wg.description().unwrap(), "Test 1");
        assert!(wg.privgroup().unwrap());
        assert!(wg.can_see_membership().unwrap());
        assert!(wg.members().unwrap().people().contains("akkornel").unwrap());
        assert_eq!(wg.administrators().unwrap().len().unwrap(), 2);
        assert!(wg.client().is_some());
    }

    #[test]
    fn test_setter_merges_scalars_only() {
        let (server, client) = setup();
        let wg = client.get("test:1").unwrap();
        // Someone else adds a member; the local roster must not pick it up.
        server.add_entry("test:1", Side::Members, MemberKind::Person, "newperson");
        let before_refresh = wg.last_refresh();
        let members_before = wg.members().unwrap().people().identifiers().unwrap();

        wg.set_description("Changed").unwrap();

        assert_eq!(wg.description().unwrap(), "Changed");
        assert!(wg.last_refresh() >= before_refresh);
        assert_eq!(wg.members().unwrap().people().identifiers().unwrap(), members_before);
        assert!(!wg.members().unwrap().people().contains("newperson").unwrap());
    }

    #[test]
    fn test_setter_without_echo_applies_locally() {
        let (server, client) = setup();
        server.set_echo_updates(false);
        let wg = client.get("test:1").unwrap();
        wg.set_filter(WorkgroupFilter::Staff).unwrap();
        wg.set_visibility(WorkgroupVisibility::Private).unwrap();
        wg.set_reusable(false).unwrap();
        assert_eq!(wg.filter().unwrap(), WorkgroupFilter::Staff);
        assert_eq!(wg.visibility().unwrap(), WorkgroupVisibility::Private);
        assert!(!wg.reusable().unwrap());
        assert_eq!(server.workgroup("test:1").unwrap().filter, WorkgroupFilter::Staff);
    }

    #[test]
    fn test_setter_permission_denied() {
        let (server, client) = setup();
        let wg = client.get("test:1").unwrap();
        server.fail(Method::Put, "test:1", 403);
        let err = wg.set_privgroup(false).unwrap_err();
        assert!(matches!(err, WorkgroupError::PermissionDenied(_)));
        assert!(wg.privgroup().unwrap());
    }

    #[test]
    fn test_setter_rejects_bad_description_locally() {
        let (server, client) = setup();
        let wg = client.get("test:1").unwrap();
        let calls = server.calls().len();
        assert!(matches!(
            wg.set_description("snow ☃"),
            Err(WorkgroupError::InvalidDescription(_))
        ));
        assert_eq!(server.calls().len(), calls);
    }

    #[test]
    fn test_delete_is_terminal() {
        let (server, client) = setup();
        let wg = client.get("test:1").unwrap();
        let members = wg.members().unwrap();
        wg.delete().unwrap();
        assert!(wg.is_deleted());
        assert_eq!(wg.name(), "test:1");
        let _ = wg.last_refresh();

        let calls = server.calls().len();
        assert!(wg.description().unwrap_err().is_deleted());
        assert!(wg.last_update().unwrap_err().is_deleted());
        assert!(wg.set_description("x").unwrap_err().is_deleted());
        assert!(wg.members().unwrap_err().is_deleted());
        assert!(members.people().add("someone").unwrap_err().is_deleted());
        assert!(members.people().discard("someone").unwrap_err().is_deleted());
        assert!(members.people().contains("someone").unwrap_err().is_deleted());
        assert!(members.people().identifiers().unwrap_err().is_deleted());
        assert!(members.len().unwrap_err().is_deleted());
        assert!(wg.get_privgroup().unwrap_err().is_deleted());
        assert!(wg.delete().unwrap_err().is_deleted());
        assert_eq!(server.calls().len(), calls);
        assert_eq!(wg.to_string(), "Workgroup(deleted)");
    }

    #[test]
    fn test_refresh_discovers_deletion() {
        let (server, client) = setup();
        let wg = client.get("test:1").unwrap();
        server.remove_workgroup("test:1");
        assert!(wg.refresh().unwrap_err().is_deleted());
        assert!(wg.is_deleted());
    }

    #[test]
    fn test_refresh_revives_restored_workgroup() {
        let (server, client) = setup();
        let wg = client.get("test:1").unwrap();
        wg.delete().unwrap();
        server.insert_workgroup("test:1", "Restored");
        wg.refresh().unwrap();
        assert!(!wg.is_deleted());
        assert_eq!(wg.description().unwrap(), "Restored");
    }

    #[test]
    fn test_setter_discovers_deletion() {
        let (server, client) = setup();
        let wg = client.get("test:1").unwrap();
        server.remove_workgroup("test:1");
        assert!(wg.set_reusable(false).unwrap_err().is_deleted());
        assert!(wg.is_deleted());
    }

    #[test]
    fn test_membership_add_and_discard() {
        let (server, client) = setup();
        let wg = client.get("test:1").unwrap();
        let people = wg.members().unwrap().people();
        people.add("Newbie1").unwrap();
        assert!(people.contains("newbie1").unwrap());
        assert!(server.has_entry("test:1", Side::Members, "newbie1"));
        people.discard("newbie1").unwrap();
        assert!(!people.contains("newbie1").unwrap());
        assert!(!server.has_entry("test:1", Side::Members, "newbie1"));
    }

    #[test]
    fn test_roster_change_stamps_local_date() {
        let (server, client) = setup();
        let long_ago = NaiveDate::from_ymd_opt(2001, 1, 1).unwrap();
        server.set_last_update("test:1", long_ago);
        let wg = client.get("test:1").unwrap();
        assert_eq!(wg.last_update().unwrap(), long_ago);

        wg.members().unwrap().people().add("newbie1").unwrap();
        assert_eq!(wg.last_update().unwrap(), Local::now().date_naive());

        server.set_last_update("test:1", long_ago);
        wg.refresh().unwrap();
        assert_eq!(wg.last_update().unwrap(), long_ago);
    }

    #[test]
    fn test_add_invalid_identifier_makes_no_call() {
        let (server, client) = setup();
        let wg = client.get("test:1").unwrap();
        let calls = server.calls().len();
        let err = wg.members().unwrap().people().add("x").unwrap_err();
        assert!(matches!(err, WorkgroupError::InvalidIdentifier { .. }));
        assert_eq!(server.calls().len(), calls);
    }

    #[test]
    fn test_add_unknown_identifier() {
        let (server, client) = setup();
        let wg = client.get("test:1").unwrap();
        server.fail(Method::Put, "test:1/members/ghost1", 404);
        let err = wg.members().unwrap().people().add("ghost1").unwrap_err();
        assert!(matches!(err, WorkgroupError::InvalidIdentifier { .. }));
        assert!(!wg.is_deleted());
        assert!(!wg.members().unwrap().people().contains("ghost1").unwrap());
    }

    #[test]
    fn test_add_discovers_deletion() {
        let (server, client) = setup();
        let wg = client.get("test:1").unwrap();
        server.remove_workgroup("test:1");
        let err = wg.members().unwrap().people().add("newbie1").unwrap_err();
        assert!(err.is_deleted());
        assert!(wg.is_deleted());
    }

    #[test]
    fn test_discard_is_idempotent() {
        let (_server, client) = setup();
        let wg = client.get("test:1").unwrap();
        let people = wg.members().unwrap().people();
        assert!(!people.contains("nobody1").unwrap());
        people.discard("nobody1").unwrap();
        people.discard("nobody1").unwrap();
        assert!(!people.contains("nobody1").unwrap());
        assert_eq!(people.len().unwrap(), 1);
    }

    #[test]
    fn test_certificate_eligibility() {
        let (server, client) = setup();
        server.insert_workgroup("workgroup:test-owners", "Owners");
        let plain = client.get("test:1").unwrap();
        let calls = server.calls().len();
        let err = plain.members().unwrap().certificates().add("host.example.com").unwrap_err();
        assert!(matches!(err, WorkgroupError::InvalidIdentifier { kind: MemberKind::Certificate, .. }));
        assert!(plain.members().unwrap().certificates().is_empty().unwrap());
        assert_eq!(server.calls().len(), calls);

        plain.administrators().unwrap().certificates().add("host.example.com").unwrap();

        let owners = client.get("workgroup:test-owners").unwrap();
        owners.members().unwrap().certificates().add("host.example.com").unwrap();
        assert!(owners.members().unwrap().certificates().contains("host.example.com").unwrap());
    }

    #[test]
    fn test_nesting_by_entity() {
        let (server, client) = setup();
        server.insert_workgroup("test:2", "Test 2");
        let one = client.get("test:1").unwrap();
        let two = client.get("test:2").unwrap();
        one.members().unwrap().workgroups().add(&two).unwrap();
        assert!(one.members().unwrap().workgroups().contains(&two).unwrap());
        assert!(one.members().unwrap().workgroups().contains("TEST:2").unwrap());
    }

    #[test]
    fn test_apply_scalars_keeps_rosters() {
        let (server, client) = setup();
        let wg = client.get("test:1").unwrap();
        let mut record = server.workgroup("test:1").unwrap();
        record.description = "Echoed".to_string();
        record.members.clear();
        record.administrators.clear();
        wg.apply_scalars(&record);
        assert_eq!(wg.description().unwrap(), "Echoed");
        assert_eq!(wg.members().unwrap().len().unwrap(), 1);
        assert_eq!(wg.administrators().unwrap().len().unwrap(), 2);
    }

    #[test]
    fn test_privgroup_disabled() {
        let (server, client) = setup();
        let wg = client.get("test:1").unwrap();
        wg.set_privgroup(false).unwrap();
        let calls = server.calls().len();
        assert!(matches!(
            wg.get_privgroup(),
            Err(WorkgroupError::PrivgroupUnavailable(_))
        ));
        assert_eq!(server.calls().len(), calls);
    }

    #[test]
    fn test_new_workgroup_defaults() {
        let new = NewWorkgroup::new("T:X", "d");
        assert_eq!(new.name, "t:x");
        assert_eq!(new.filter, WorkgroupFilter::None);
        assert!(new.privgroup && new.reusable);
        assert_eq!(new.visibility, WorkgroupVisibility::Stanford);
        assert_eq!(new.body()["privgroup"], "TRUE");
        assert!(NewWorkgroup::new("nocolon", "d").validate().is_err());
    }

    #[test]
    fn test_display() {
        let (_server, client) = setup();
        let wg = client.get("test:1").unwrap();
        let text = wg.to_string();
        assert!(text.starts_with("Workgroup(name=test:1"));
        assert!(text.contains("members=1"));
    }
}
