/// Workgroup API calls.
///
/// Builds the request for each operation, sends it through the configured
/// [`Transport`], and classifies the status code into a [`WorkgroupError`].
/// A 404 is returned as `NotFound` (or `None`/`false` where absence is an
/// ordinary answer); callers that hold an entity turn it into a deletion.
use serde_json::{Map, Value};

use crate::error::{Result, WorkgroupError};
use crate::membership::{MemberKind, Side};
use crate::record::{decode, NameSearchRecord, SearchRecord, TargetSearchRecord, WorkgroupRecord};
use crate::transport::{ApiRequest, ApiResponse, Method, Transport};

/// Outcome of a property update.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// The server echoed the updated record.
    Record(WorkgroupRecord),
    /// The server accepted the change without a body.
    Applied,
}

pub struct WorkgroupApi {
    transport: Box<dyn Transport>,
}

impl WorkgroupApi {
    pub fn new<T: Transport + 'static>(transport: T) -> Self {
        Self {
            transport: Box::new(transport),
        }
    }

    fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        log::debug!("{} /{}", request.method, request.path);
        let response = self.transport.perform(&request)?;
        log::debug!("{} /{} -> {}", request.method, request.path, response.status);
        Ok(response)
    }

    // -----------------------------------------------------------------------
    // Workgroups
    // -----------------------------------------------------------------------

    /// Full record of `name`, or `None` if the workgroup does not exist.
    pub fn fetch(&self, name: &str) -> Result<Option<WorkgroupRecord>> {
        let response = self.send(ApiRequest::new(Method::Get, name))?;
        match response.status {
            200..=299 => WorkgroupRecord::from_response(response.status, &response.body).map(Some),
            404 => Ok(None),
            _ => Err(classify(&response, name)),
        }
    }

    /// Lightweight existence probe. `None` when the server does not support
    /// HEAD on workgroups.
    pub fn exists(&self, name: &str) -> Result<Option<bool>> {
        let response = self.send(ApiRequest::new(Method::Head, name))?;
        match response.status {
            200..=299 => Ok(Some(true)),
            404 => Ok(Some(false)),
            405 | 501 => Ok(None),
            _ => Err(classify(&response, name)),
        }
    }

    /// Create a workgroup. Returns the new record when the server sends one.
    pub fn create(&self, name: &str, body: Value) -> Result<Option<WorkgroupRecord>> {
        let response = self.send(ApiRequest::new(Method::Post, name).with_body(body))?;
        match response.status {
            200..=299 => {
                log::info!("Created workgroup {}", name);
                record_if_present(&response)
            }
            409 => {
                log::warn!("Workgroup {} already exists", name);
                Err(WorkgroupError::AlreadyExists(name.to_string()))
            }
            _ => Err(classify(&response, name)),
        }
    }

    /// Send one or more property changes.
    pub fn update(&self, name: &str, changes: Map<String, Value>) -> Result<UpdateOutcome> {
        let request = ApiRequest::new(Method::Put, name).with_body(Value::Object(changes));
        let response = self.send(request)?;
        if !response.is_success() {
            return Err(classify(&response, name));
        }
        log::info!("Updated workgroup {}", name);
        Ok(match record_if_present(&response)? {
            Some(record) => UpdateOutcome::Record(record),
            None => UpdateOutcome::Applied,
        })
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        let response = self.send(ApiRequest::new(Method::Delete, name))?;
        if !response.is_success() {
            return Err(classify(&response, name));
        }
        log::info!("Deleted workgroup {}", name);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Rosters
    // -----------------------------------------------------------------------

    /// Add `id` to a roster. An entry that is already present counts as added.
    pub fn add_member(&self, name: &str, side: Side, kind: MemberKind, id: &str) -> Result<()> {
        let response = self.send(roster_request(Method::Put, name, side, kind, id))?;
        match response.status {
            200..=299 | 409 => {
                log::info!("Added {} {} to {} of {}", kind, id, side, name);
                Ok(())
            }
            _ => Err(classify(&response, name)),
        }
    }

    pub fn remove_member(&self, name: &str, side: Side, kind: MemberKind, id: &str) -> Result<()> {
        let response = self.send(roster_request(Method::Delete, name, side, kind, id))?;
        if !response.is_success() {
            return Err(classify(&response, name));
        }
        log::info!("Removed {} {} from {} of {}", kind, id, side, name);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Searches
    // -----------------------------------------------------------------------

    /// Workgroups whose names match `pattern`. No match is an empty list.
    pub fn search_name(&self, pattern: &str) -> Result<Vec<SearchRecord>> {
        let path = format!("search/{}", pattern);
        let response = self.send(ApiRequest::new(Method::Get, path))?;
        match response.status {
            200..=299 => {
                let record: NameSearchRecord = decode(response.status, &response.body)?;
                Ok(record.results)
            }
            404 => Ok(Vec::new()),
            _ => Err(classify(&response, pattern)),
        }
    }

    /// Workgroups in which `id` appears as a member or administrator.
    pub fn search_target(&self, kind: MemberKind, id: &str) -> Result<TargetSearchRecord> {
        let request = ApiRequest::new(Method::Get, "")
            .with_query("type", kind.search_type())
            .with_query("id", id);
        let response = self.send(request)?;
        match response.status {
            200..=299 => decode(response.status, &response.body),
            404 => Ok(TargetSearchRecord {
                members: Vec::new(),
                administrators: Vec::new(),
            }),
            _ => Err(classify(&response, id)),
        }
    }
}

fn roster_request(method: Method, name: &str, side: Side, kind: MemberKind, id: &str) -> ApiRequest {
    let path = format!("{}/{}/{}", name, side.as_str(), id);
    let mut body = Map::new();
    body.insert("type".to_string(), Value::String(kind.as_str().to_string()));
    ApiRequest::new(method, path).with_body(Value::Object(body))
}

fn record_if_present(response: &ApiResponse) -> Result<Option<WorkgroupRecord>> {
    match &response.body {
        Value::Object(map) if map.contains_key("name") => {
            WorkgroupRecord::from_response(response.status, &response.body).map(Some)
        }
        _ => Ok(None),
    }
}

/// Map a failed response onto the error taxonomy. `subject` names what the
/// request was about (workgroup name, search pattern or identifier).
pub(crate) fn classify(response: &ApiResponse, subject: &str) -> WorkgroupError {
    match response.status {
        401 | 403 => {
            log::warn!("Permission denied for {}", subject);
            WorkgroupError::PermissionDenied(subject.to_string())
        }
        404 => WorkgroupError::NotFound(subject.to_string()),
        400 | 500 => {
            log::error!("Upstream API error ({}): {}", response.status, response.message());
            WorkgroupError::Upstream {
                status: response.status,
                message: response.message(),
            }
        }
        status => {
            log::error!("Unexpected response ({}) for {}", status, subject);
            WorkgroupError::UnexpectedResponse {
                status,
                message: response.message(),
            }
        }
    }
}
