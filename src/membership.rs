/// Membership rosters of a workgroup.
///
/// Each workgroup has two sides (members, administrators). Each side holds
/// three identifier sets, one per member kind (people, nested workgroups,
/// certificates).
///
/// - `IdentifierSet`: local set with a validator bound at construction
/// - `MembershipSets`: the three sets of one side (plain data, owned by the
///   workgroup state)
/// - `Membership` / `MembershipContainer`: handles returned by
///   `Workgroup::members()` and `Workgroup::administrators()`. Mutations go
///   through the owning workgroup to the remote side.
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WorkgroupError};
use crate::record::MemberRecord;
use crate::validate;
use crate::workgroup::Workgroup;

// ---------------------------------------------------------------------------
// Kinds and sides
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberKind {
    /// A person, identified by SUNetID.
    #[serde(alias = "USER")]
    Person,
    /// A nested workgroup, identified by its full name.
    Workgroup,
    /// A client certificate, identified by its subject CN.
    Certificate,
}

impl MemberKind {
    pub const ALL: [MemberKind; 3] = [
        MemberKind::Person,
        MemberKind::Workgroup,
        MemberKind::Certificate,
    ];

    /// Wire name used in roster entries and membership requests.
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberKind::Person => "PERSON",
            MemberKind::Workgroup => "WORKGROUP",
            MemberKind::Certificate => "CERTIFICATE",
        }
    }

    /// Wire name used by the search-by-target query.
    pub fn search_type(&self) -> &'static str {
        match self {
            MemberKind::Person => "USER",
            MemberKind::Workgroup => "WORKGROUP",
            MemberKind::Certificate => "CERTIFICATE",
        }
    }

    /// People and workgroup names are case-insensitive; certificate CNs
    /// are kept as given.
    pub fn normalize(&self, identifier: &str) -> String {
        let trimmed = identifier.trim();
        match self {
            MemberKind::Person | MemberKind::Workgroup => trimmed.to_lowercase(),
            MemberKind::Certificate => trimmed.to_string(),
        }
    }
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            MemberKind::Person => "person",
            MemberKind::Workgroup => "workgroup",
            MemberKind::Certificate => "certificate",
        };
        f.write_str(text)
    }
}

/// Which roster of a workgroup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Members,
    Administrators,
}

impl Side {
    /// Path segment of the roster route.
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Members => "members",
            Side::Administrators => "administrators",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Anything that names a roster entry
// ---------------------------------------------------------------------------

/// Something that can be added to (or looked up in) a roster: a raw
/// identifier, or a workgroup entity / search result standing for its name.
pub trait MemberId {
    fn member_id(&self) -> String;
}

impl MemberId for str {
    fn member_id(&self) -> String {
        self.to_string()
    }
}

impl MemberId for String {
    fn member_id(&self) -> String {
        self.clone()
    }
}

// ---------------------------------------------------------------------------
// IdentifierSet
// ---------------------------------------------------------------------------

type Validator = Rc<dyn Fn(&str) -> Result<()>>;

/// A set of identifiers of one kind. Every identifier is checked by the bound
/// validator before it is accepted.
#[derive(Clone)]
pub struct IdentifierSet {
    kind: MemberKind,
    items: BTreeSet<String>,
    validator: Validator,
}

impl IdentifierSet {
    pub fn new(kind: MemberKind, validator: impl Fn(&str) -> Result<()> + 'static) -> Self {
        Self {
            kind,
            items: BTreeSet::new(),
            validator: Rc::new(validator),
        }
    }

    /// The set for `kind` on `side` of the workgroup `workgroup`.
    ///
    /// Certificates may only be members of the reserved stem-owner
    /// workgroups; they may administer any workgroup.
    pub fn for_roster(kind: MemberKind, side: Side, workgroup: &str) -> Self {
        let certificate_members_allowed = validate::is_stem_owner(workgroup);
        Self::new(kind, move |identifier| {
            validate::identifier(kind, identifier)?;
            if kind == MemberKind::Certificate
                && side == Side::Members
                && !certificate_members_allowed
            {
                return Err(WorkgroupError::InvalidIdentifier {
                    kind,
                    identifier: identifier.to_string(),
                    reason: "certificates may only be members of stem-owner workgroups"
                        .to_string(),
                });
            }
            Ok(())
        })
    }

    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    /// Run the bound validator without touching the set.
    pub fn validate(&self, identifier: &str) -> Result<()> {
        (self.validator)(identifier)
    }

    /// Validate and insert. Returns whether the identifier was new.
    pub fn insert(&mut self, identifier: &str) -> Result<bool> {
        self.validate(identifier)?;
        Ok(self.items.insert(identifier.to_string()))
    }

    pub fn remove(&mut self, identifier: &str) -> bool {
        self.items.remove(identifier)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.items.contains(identifier)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.items.iter()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Replace the contents with what the remote side reported. Remote data
    /// is authoritative, so it is not re-validated.
    pub fn load<I, S>(&mut self, identifiers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.items = identifiers.into_iter().map(Into::into).collect();
    }
}

impl fmt::Debug for IdentifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentifierSet")
            .field("kind", &self.kind)
            .field("items", &self.items)
            .finish()
    }
}

impl PartialEq for IdentifierSet {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.items == other.items
    }
}

// ---------------------------------------------------------------------------
// MembershipSets
// ---------------------------------------------------------------------------

/// The three identifier sets making up one side of a workgroup.
#[derive(Clone, Debug, PartialEq)]
pub struct MembershipSets {
    side: Side,
    people: IdentifierSet,
    workgroups: IdentifierSet,
    certificates: IdentifierSet,
}

impl MembershipSets {
    pub fn new(side: Side, workgroup: &str) -> Self {
        Self {
            side,
            people: IdentifierSet::for_roster(MemberKind::Person, side, workgroup),
            workgroups: IdentifierSet::for_roster(MemberKind::Workgroup, side, workgroup),
            certificates: IdentifierSet::for_roster(MemberKind::Certificate, side, workgroup),
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn get(&self, kind: MemberKind) -> &IdentifierSet {
        match kind {
            MemberKind::Person => &self.people,
            MemberKind::Workgroup => &self.workgroups,
            MemberKind::Certificate => &self.certificates,
        }
    }

    pub fn get_mut(&mut self, kind: MemberKind) -> &mut IdentifierSet {
        match kind {
            MemberKind::Person => &mut self.people,
            MemberKind::Workgroup => &mut self.workgroups,
            MemberKind::Certificate => &mut self.certificates,
        }
    }

    /// Total entries across the three kinds.
    pub fn len(&self) -> usize {
        self.people.len() + self.workgroups.len() + self.certificates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.people.clear();
        self.workgroups.clear();
        self.certificates.clear();
    }

    /// Split a roster listing by kind and replace all three sets.
    pub fn load(&mut self, entries: &[MemberRecord]) {
        for kind in MemberKind::ALL {
            let ids = entries
                .iter()
                .filter(|entry| entry.kind == kind)
                .map(|entry| kind.normalize(&entry.id));
            self.get_mut(kind).load(ids);
        }
        log::debug!(
            "Loaded {} people, {} workgroups, {} certificates as {}",
            self.people.len(),
            self.workgroups.len(),
            self.certificates.len(),
            self.side
        );
    }
}

// ---------------------------------------------------------------------------
// Facet and container handles
// ---------------------------------------------------------------------------

/// The members or administrators facet of one workgroup.
#[derive(Clone)]
pub struct Membership {
    workgroup: Workgroup,
    side: Side,
}

impl Membership {
    pub(crate) fn new(workgroup: Workgroup, side: Side) -> Self {
        Self { workgroup, side }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn workgroup(&self) -> &Workgroup {
        &self.workgroup
    }

    pub fn container(&self, kind: MemberKind) -> MembershipContainer {
        MembershipContainer {
            workgroup: self.workgroup.clone(),
            side: self.side,
            kind,
        }
    }

    pub fn people(&self) -> MembershipContainer {
        self.container(MemberKind::Person)
    }

    pub fn workgroups(&self) -> MembershipContainer {
        self.container(MemberKind::Workgroup)
    }

    pub fn certificates(&self) -> MembershipContainer {
        self.container(MemberKind::Certificate)
    }

    /// Combined size of the three containers.
    pub fn len(&self) -> Result<usize> {
        self.workgroup.read_roster(self.side, |sets| sets.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl fmt::Debug for Membership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.workgroup
            .with_roster(self.side, |sets| fmt::Debug::fmt(sets, f))
    }
}

/// One kind of entry on one side of a workgroup, e.g. the people who
/// administer it.
#[derive(Clone)]
pub struct MembershipContainer {
    workgroup: Workgroup,
    side: Side,
    kind: MemberKind,
}

impl MembershipContainer {
    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Add an identifier remotely, then locally. Invalid identifiers are
    /// rejected before any request is sent.
    pub fn add<I: MemberId + ?Sized>(&self, identifier: &I) -> Result<()> {
        let identifier = self.kind.normalize(&identifier.member_id());
        self.workgroup.roster_add(self.side, self.kind, &identifier)
    }

    /// Remove an identifier. Succeeds whether or not it was present.
    pub fn discard<I: MemberId + ?Sized>(&self, identifier: &I) -> Result<()> {
        let identifier = self.kind.normalize(&identifier.member_id());
        self.workgroup.roster_discard(self.side, self.kind, &identifier)
    }

    /// Membership test against the local mirror. Reads fail with
    /// `WorkgroupDeleted` once the workgroup is deleted.
    pub fn contains<I: MemberId + ?Sized>(&self, identifier: &I) -> Result<bool> {
        let identifier = self.kind.normalize(&identifier.member_id());
        self.workgroup
            .read_roster(self.side, |sets| sets.get(self.kind).contains(&identifier))
    }

    pub fn len(&self) -> Result<usize> {
        self.workgroup
            .read_roster(self.side, |sets| sets.get(self.kind).len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Snapshot of the identifiers, in sorted order.
    pub fn identifiers(&self) -> Result<Vec<String>> {
        self.workgroup.read_roster(self.side, |sets| {
            sets.get(self.kind).iter().cloned().collect()
        })
    }

    pub fn iter(&self) -> Result<std::vec::IntoIter<String>> {
        Ok(self.identifiers()?.into_iter())
    }
}

impl fmt::Debug for MembershipContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.workgroup.with_roster(self.side, |sets| {
            f.debug_set().entries(sets.get(self.kind).iter()).finish()
        })
    }
}
