//! In-memory Workgroup service for tests.
//!
//! [`FakeWorkgroupServer`] implements [`Transport`] over a map of workgroup
//! records, answering the same routes and status codes as the real service.
//! Every request is recorded, and any method/path pair can be made to fail
//! with a given status.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use chrono::{Local, NaiveDate};
use serde_json::{json, Value};

use crate::error::TransportError;
use crate::membership::{MemberKind, Side};
use crate::properties::{Affiliation, WorkgroupFilter, WorkgroupVisibility};
use crate::record::{MemberRecord, SearchRecord, WorkgroupRecord};
use crate::transport::{ApiRequest, ApiResponse, Method, Transport};

#[derive(Default)]
struct ServerState {
    workgroups: BTreeMap<String, WorkgroupRecord>,
    people: HashMap<String, (String, Vec<Affiliation>)>,
    failures: Vec<(Method, String, u16)>,
    requests: Vec<ApiRequest>,
    /// Answer property updates with 204 instead of the updated record.
    silent_updates: bool,
}

/// Shared handle: clones see the same server.
#[derive(Clone, Default)]
pub struct FakeWorkgroupServer {
    state: Rc<RefCell<ServerState>>,
}

impl FakeWorkgroupServer {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Seeding
    // -----------------------------------------------------------------------

    /// Add (or replace) a workgroup with default settings and empty rosters.
    pub fn insert_workgroup(&self, name: &str, description: &str) {
        let record = WorkgroupRecord {
            name: name.to_string(),
            description: description.to_string(),
            privgroup: true,
            reusable: true,
            visibility: WorkgroupVisibility::Stanford,
            filter: WorkgroupFilter::None,
            last_update: today(),
            can_see_membership: Some(true),
            members: Vec::new(),
            administrators: Vec::new(),
        };
        self.state
            .borrow_mut()
            .workgroups
            .insert(name.to_string(), record);
    }

    pub fn remove_workgroup(&self, name: &str) {
        self.state.borrow_mut().workgroups.remove(name);
    }

    pub fn workgroup(&self, name: &str) -> Option<WorkgroupRecord> {
        self.state.borrow().workgroups.get(name).cloned()
    }

    /// Register a person's display name and affiliations; roster entries
    /// added afterwards carry them.
    pub fn add_person(&self, sunetid: &str, name: &str, affiliations: &[Affiliation]) {
        self.state
            .borrow_mut()
            .people
            .insert(sunetid.to_string(), (name.to_string(), affiliations.to_vec()));
    }

    pub fn add_entry(&self, workgroup: &str, side: Side, kind: MemberKind, id: &str) {
        let mut state = self.state.borrow_mut();
        let entry = state.member_record(kind, id);
        if let Some(record) = state.workgroups.get_mut(workgroup) {
            roster_mut(record, side).push(entry);
        }
    }

    pub fn has_entry(&self, workgroup: &str, side: Side, id: &str) -> bool {
        let state = self.state.borrow();
        match state.workgroups.get(workgroup) {
            Some(record) => roster(record, side).iter().any(|e| e.id == id),
            None => false,
        }
    }

    pub fn set_filter(&self, workgroup: &str, filter: WorkgroupFilter) {
        if let Some(record) = self.state.borrow_mut().workgroups.get_mut(workgroup) {
            record.filter = filter;
        }
    }

    pub fn set_last_update(&self, workgroup: &str, date: NaiveDate) {
        if let Some(record) = self.state.borrow_mut().workgroups.get_mut(workgroup) {
            record.last_update = date;
        }
    }

    pub fn set_privgroup(&self, workgroup: &str, privgroup: bool) {
        if let Some(record) = self.state.borrow_mut().workgroups.get_mut(workgroup) {
            record.privgroup = privgroup;
        }
    }

    /// Whether property updates echo the updated record (the default) or
    /// answer 204 with no body.
    pub fn set_echo_updates(&self, echo: bool) {
        self.state.borrow_mut().silent_updates = !echo;
    }

    /// Answer `method path` with `status` from now on.
    pub fn fail(&self, method: Method, path: &str, status: u16) {
        self.state
            .borrow_mut()
            .failures
            .push((method, path.to_string(), status));
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    /// Every request received, as `METHOD path[?query]`.
    pub fn calls(&self) -> Vec<String> {
        self.state
            .borrow()
            .requests
            .iter()
            .map(|r| {
                let mut line = format!("{} {}", r.method, r.path);
                if !r.query.is_empty() {
                    let query: Vec<String> =
                        r.query.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                    line.push('?');
                    line.push_str(&query.join("&"));
                }
                line
            })
            .collect()
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.state.borrow().requests.clone()
    }
}

impl Transport for FakeWorkgroupServer {
    fn perform(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let mut state = self.state.borrow_mut();
        state.requests.push(request.clone());

        let forced = state
            .failures
            .iter()
            .find(|(method, path, _)| *method == request.method && *path == request.path)
            .map(|(_, _, status)| *status);
        if let Some(status) = forced {
            return Ok(ApiResponse::new(status, json!({"message": "forced failure"})));
        }

        Ok(state.route(request))
    }
}

impl ServerState {
    fn member_record(&self, kind: MemberKind, id: &str) -> MemberRecord {
        let mut entry = MemberRecord::new(kind, id);
        if kind == MemberKind::Person {
            if let Some((name, affiliations)) = self.people.get(id) {
                entry.name = name.clone();
                entry.affiliations = affiliations.clone();
            }
        }
        entry
    }

    fn route(&mut self, request: &ApiRequest) -> ApiResponse {
        if request.path.is_empty() {
            return self.search_target(request);
        }
        if let Some(pattern) = request.path.strip_prefix("search/") {
            return self.search_name(pattern);
        }
        let parts: Vec<&str> = request.path.splitn(3, '/').collect();
        match parts.as_slice() {
            [name] => self.workgroup_route(request, name),
            [name, side, id] => self.roster_route(request, name, side, id),
            _ => not_found(&request.path),
        }
    }

    fn workgroup_route(&mut self, request: &ApiRequest, name: &str) -> ApiResponse {
        match request.method {
            Method::Get => match self.workgroups.get(name) {
                Some(record) => record_response(200, record),
                None => not_found(name),
            },
            Method::Head => match self.workgroups.get(name) {
                Some(_) => ApiResponse::new(200, Value::Null),
                None => ApiResponse::new(404, Value::Null),
            },
            Method::Post => {
                if self.workgroups.contains_key(name) {
                    return ApiResponse::new(409, json!({"message": "already exists"}));
                }
                let mut record = WorkgroupRecord {
                    name: name.to_string(),
                    description: String::new(),
                    privgroup: true,
                    reusable: true,
                    visibility: WorkgroupVisibility::Stanford,
                    filter: WorkgroupFilter::None,
                    last_update: today(),
                    can_see_membership: Some(true),
                    members: Vec::new(),
                    administrators: Vec::new(),
                };
                if let Err(message) = apply_changes(&mut record, request.body.as_ref()) {
                    return bad_request(&message);
                }
                self.workgroups.insert(name.to_string(), record.clone());
                record_response(201, &record)
            }
            Method::Put => {
                let silent = self.silent_updates;
                let Some(record) = self.workgroups.get_mut(name) else {
                    return not_found(name);
                };
                if let Err(message) = apply_changes(record, request.body.as_ref()) {
                    return bad_request(&message);
                }
                record.last_update = today();
                if silent {
                    ApiResponse::new(204, Value::Null)
                } else {
                    record_response(200, record)
                }
            }
            Method::Delete => match self.workgroups.remove(name) {
                Some(_) => ApiResponse::new(200, Value::Null),
                None => not_found(name),
            },
        }
    }

    fn roster_route(&mut self, request: &ApiRequest, name: &str, side: &str, id: &str) -> ApiResponse {
        let side = match side {
            "members" => Side::Members,
            "administrators" => Side::Administrators,
            other => return not_found(other),
        };
        let kind = request
            .body
            .as_ref()
            .and_then(|body| body.get("type").cloned())
            .and_then(|kind| serde_json::from_value::<MemberKind>(kind).ok());
        let Some(kind) = kind else {
            return bad_request("missing or unknown member type");
        };
        let entry = self.member_record(kind, id);
        let Some(record) = self.workgroups.get_mut(name) else {
            return not_found(name);
        };
        let list = roster_mut(record, side);
        let position = list.iter().position(|e| e.kind == kind && e.id == id);

        match (request.method, position) {
            (Method::Put, Some(_)) => ApiResponse::new(409, json!({"message": "already present"})),
            (Method::Put, None) => {
                list.push(entry);
                record.last_update = today();
                ApiResponse::new(200, Value::Null)
            }
            (Method::Delete, Some(index)) => {
                list.remove(index);
                record.last_update = today();
                ApiResponse::new(200, Value::Null)
            }
            (Method::Delete, None) => not_found(id),
            _ => ApiResponse::new(405, Value::Null),
        }
    }

    fn search_name(&self, pattern: &str) -> ApiResponse {
        let results: Vec<SearchRecord> = self
            .workgroups
            .values()
            .filter(|record| glob_match(pattern, &record.name))
            .map(search_record)
            .collect();
        ApiResponse::new(200, json!({ "results": to_json(&results) }))
    }

    fn search_target(&self, request: &ApiRequest) -> ApiResponse {
        let param = |key: &str| {
            request
                .query
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        };
        let (Some(kind), Some(id)) = (param("type"), param("id")) else {
            return bad_request("type and id are required");
        };
        let Ok(kind) = serde_json::from_value::<MemberKind>(Value::String(kind)) else {
            return bad_request("unknown type");
        };

        let matches = |side: Side| -> Vec<SearchRecord> {
            self.workgroups
                .values()
                .filter(|record| roster(record, side).iter().any(|e| e.kind == kind && e.id == id))
                .map(search_record)
                .collect()
        };
        ApiResponse::new(
            200,
            json!({
                "members": to_json(&matches(Side::Members)),
                "administrators": to_json(&matches(Side::Administrators)),
            }),
        )
    }
}

fn roster(record: &WorkgroupRecord, side: Side) -> &Vec<MemberRecord> {
    match side {
        Side::Members => &record.members,
        Side::Administrators => &record.administrators,
    }
}

fn roster_mut(record: &mut WorkgroupRecord, side: Side) -> &mut Vec<MemberRecord> {
    match side {
        Side::Members => &mut record.members,
        Side::Administrators => &mut record.administrators,
    }
}

/// Apply a create/update body. Booleans arrive as "TRUE"/"FALSE".
fn apply_changes(record: &mut WorkgroupRecord, body: Option<&Value>) -> Result<(), String> {
    let Some(Value::Object(changes)) = body else {
        return Err("expected a JSON object".to_string());
    };
    for (key, value) in changes {
        let text = value
            .as_str()
            .ok_or_else(|| format!("{} must be a string", key))?;
        match key.as_str() {
            "description" => record.description = text.to_string(),
            "filter" => record.filter = text.parse().map_err(|e| format!("{}", e))?,
            "visibility" => record.visibility = text.parse().map_err(|e| format!("{}", e))?,
            "privgroup" => record.privgroup = parse_flag(text)?,
            "reusable" => record.reusable = parse_flag(text)?,
            other => return Err(format!("unknown property {}", other)),
        }
    }
    Ok(())
}

fn parse_flag(text: &str) -> Result<bool, String> {
    match text {
        "TRUE" => Ok(true),
        "FALSE" => Ok(false),
        other => Err(format!("bad flag {}", other)),
    }
}

fn glob_match(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == text;
    }
    let Some(mut rest) = text.strip_prefix(parts[0]) else {
        return false;
    };
    let last = parts[parts.len() - 1];
    for part in &parts[1..parts.len() - 1] {
        match rest.find(part) {
            Some(index) => rest = &rest[index + part.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}

fn search_record(record: &WorkgroupRecord) -> SearchRecord {
    SearchRecord {
        name: record.name.clone(),
        description: record.description.clone(),
        last_update: record.last_update,
    }
}

fn record_response(status: u16, record: &WorkgroupRecord) -> ApiResponse {
    ApiResponse::new(status, to_json(record))
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn not_found(what: &str) -> ApiResponse {
    ApiResponse::new(404, json!({"message": format!("{} not found", what)}))
}

fn bad_request(message: &str) -> ApiResponse {
    ApiResponse::new(400, json!({ "message": message }))
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
