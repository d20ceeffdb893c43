/// Workgroup client: front door and identity cache.
///
/// The client keeps one [`Workgroup`] per canonical name. Every `get` of a
/// cached name returns the same entity, without refreshing it. The cache
/// lives until `clear_cache()`; entities obtained before a clear keep
/// working but are no longer handed out.
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::api::WorkgroupApi;
use crate::error::{Result, WorkgroupError};
use crate::membership::{MemberId, MemberKind};
use crate::record::WorkgroupRecord;
use crate::search::{SearchByResults, SearchResults};
use crate::transport::Transport;
use crate::validate;
use crate::workgroup::{NewWorkgroup, Workgroup};

#[cfg(feature = "network")]
use crate::config::ClientConfig;
#[cfg(feature = "network")]
use crate::transport::HttpTransport;

pub(crate) struct ClientShared {
    api: Rc<WorkgroupApi>,
    cache: RefCell<HashMap<String, Workgroup>>,
}

/// Cloneable handle; clones share one cache.
#[derive(Clone)]
pub struct WorkgroupClient {
    shared: Rc<ClientShared>,
}

impl WorkgroupClient {
    /// Client over any transport.
    pub fn with_transport<T: Transport + 'static>(transport: T) -> Self {
        Self {
            shared: Rc::new(ClientShared {
                api: Rc::new(WorkgroupApi::new(transport)),
                cache: RefCell::new(HashMap::new()),
            }),
        }
    }

    /// Client over mutual-TLS HTTPS for `config`.
    #[cfg(feature = "network")]
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(config)?;
        log::info!("Workgroup client ready for {}", config.environment);
        Ok(Self::with_transport(transport))
    }

    pub(crate) fn from_shared(shared: Rc<ClientShared>) -> Self {
        Self { shared }
    }

    pub fn ptr_eq(a: &WorkgroupClient, b: &WorkgroupClient) -> bool {
        Rc::ptr_eq(&a.shared, &b.shared)
    }

    // -----------------------------------------------------------------------
    // Cache
    // -----------------------------------------------------------------------

    fn cached(&self, name: &str) -> Option<Workgroup> {
        self.shared.cache.borrow().get(name).cloned()
    }

    fn insert(&self, record: &WorkgroupRecord) -> Workgroup {
        let workgroup = Workgroup::from_record(
            record,
            Rc::clone(&self.shared.api),
            Rc::downgrade(&self.shared),
        );
        self.shared
            .cache
            .borrow_mut()
            .insert(workgroup.name().to_string(), workgroup.clone());
        workgroup
    }

    /// Number of cached entities.
    pub fn cached_len(&self) -> usize {
        self.shared.cache.borrow().len()
    }

    /// Forget every cached entity.
    pub fn clear_cache(&self) {
        let mut cache = self.shared.cache.borrow_mut();
        log::debug!("Clearing {} cached workgroups", cache.len());
        cache.clear();
    }

    // -----------------------------------------------------------------------
    // Workgroups
    // -----------------------------------------------------------------------

    /// The entity for `name`, fetched on first use.
    pub fn get(&self, name: &str) -> Result<Workgroup> {
        let name = validate::canonical_name(name);
        if let Some(workgroup) = self.cached(&name) {
            log::debug!("Cache hit for {}", name);
            return Ok(workgroup);
        }
        log::debug!("Cache miss for {}", name);
        match self.shared.api.fetch(&name)? {
            Some(record) => Ok(self.insert(&record)),
            None => {
                log::warn!("Workgroup {} not found", name);
                Err(WorkgroupError::NotFound(name))
            }
        }
    }

    /// Whether `name` exists. Uses a HEAD probe, falling back to a full fetch
    /// when the server does not support it.
    pub fn contains(&self, name: &str) -> Result<bool> {
        let name = validate::canonical_name(name);
        if let Some(workgroup) = self.cached(&name) {
            if !workgroup.is_deleted() {
                return Ok(true);
            }
        }
        match self.shared.api.exists(&name)? {
            Some(exists) => Ok(exists),
            None => match self.get(&name) {
                Ok(_) => Ok(true),
                Err(e) if e.is_not_found() => Ok(false),
                Err(e) => Err(e),
            },
        }
    }

    /// Create a workgroup. Name and description are checked before the
    /// request is sent.
    pub fn create(&self, new: NewWorkgroup) -> Result<Workgroup> {
        new.validate()?;
        let record = match self.shared.api.create(&new.name, new.body())? {
            Some(record) => record,
            None => self.shared.api.fetch(&new.name)?.ok_or_else(|| {
                WorkgroupError::UnexpectedResponse {
                    status: 404,
                    message: format!("{} missing right after creation", new.name),
                }
            })?,
        };

        if let Some(existing) = self.cached(&new.name) {
            existing.apply_record(&record);
            return Ok(existing);
        }
        Ok(self.insert(&record))
    }

    // -----------------------------------------------------------------------
    // Searches
    // -----------------------------------------------------------------------

    /// Workgroups whose names match `pattern` (`*` is the wildcard). At least
    /// four characters must come before the first wildcard.
    pub fn search_by_name(&self, pattern: &str) -> Result<SearchResults> {
        validate::search_pattern(pattern)?;
        let records = self.shared.api.search_name(pattern)?;
        log::debug!("Search {} matched {} workgroups", pattern, records.len());
        Ok(SearchResults::new(pattern, &records))
    }

    pub fn search_by_user(&self, sunetid: &str) -> Result<SearchByResults> {
        self.search_target(MemberKind::Person, sunetid)
    }

    /// Accepts a name, a [`Workgroup`] or a `PartialWorkgroup`.
    pub fn search_by_workgroup<I: MemberId + ?Sized>(&self, workgroup: &I) -> Result<SearchByResults> {
        self.search_target(MemberKind::Workgroup, &workgroup.member_id())
    }

    pub fn search_by_certificate(&self, cn: &str) -> Result<SearchByResults> {
        self.search_target(MemberKind::Certificate, cn)
    }

    fn search_target(&self, kind: MemberKind, id: &str) -> Result<SearchByResults> {
        validate::search_target(id)?;
        let id = kind.normalize(id);
        let record = self.shared.api.search_target(kind, &id)?;
        Ok(SearchByResults::from_record(&record))
    }
}
