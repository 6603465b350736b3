use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use contracts::shared::choices::ChoiceSet;
use contracts::shared::field_path::{FieldPath, PathToken};
use contracts::shared::form_settings::{ComparisonExclusion, FormSection, FormSettings};
use contracts::shared::json_tree;
use contracts::shared::metadata::{RuleSet, ValidationErrors};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::capabilities::{PathAddressable, Persistable};
use super::comparison;
use super::events::{EventBus, SaveFailure, StoreEvent, SubscriptionId};
use super::path_status::{PathQueues, PathStatus};
use super::snapshot::{sync_path, Snapshot};
use crate::error::StoreError;
use crate::shared::api_utils::{collection_url, identity, record_url};
use crate::shared::config::{RootKind, StoreConfig};
use crate::transport::{
    PersistRequest, PersistResponse, PersistenceTransport, RequestMethod, TransportError,
};

/// One dispatched request, as kept in the request history
#[derive(Debug, Clone, PartialEq)]
pub struct RequestRecord {
    pub method: RequestMethod,
    pub url: String,
    /// `None` until the request completes, and when the transport failed
    pub status: Option<u16>,
}

/// A save that has been dispatched and not yet completed.
///
/// Produced by [`FormStateStore::begin_save`]; hand it back to
/// [`FormStateStore::complete_save`] together with the transport outcome.
#[derive(Debug, Clone)]
pub struct SaveTicket {
    id: u64,
    paths: Vec<FieldPath>,
    payload: Value,
    request: PersistRequest,
}

impl SaveTicket {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn paths(&self) -> &[FieldPath] {
        &self.paths
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn request(&self) -> &PersistRequest {
        &self.request
    }
}

/// FormStateStore owns one editable record and its last-persisted snapshot.
///
/// Все изменения происходят синхронно в одном потоке; подписчики получают
/// события сразу после изменения.
pub struct FormStateStore {
    config: StoreConfig,
    transport: Arc<dyn PersistenceTransport>,
    record: Value,
    snapshot: Snapshot,
    rules: RuleSet,
    choices: Arc<ChoiceSet>,
    exclusions: Vec<ComparisonExclusion>,
    sections: Vec<FormSection>,
    active_section: Option<String>,
    queues: PathQueues,
    local_errors: ValidationErrors,
    server_errors: ValidationErrors,
    in_flight: Option<u64>,
    next_ticket: u64,
    history: Vec<RequestRecord>,
    events: EventBus,
}

impl FormStateStore {
    pub fn new(
        config: StoreConfig,
        transport: Arc<dyn PersistenceTransport>,
        payload: Value,
    ) -> Self {
        let mut store = Self {
            config,
            transport,
            record: Value::Null,
            snapshot: Snapshot::new(Value::Null),
            rules: RuleSet::new(),
            choices: Arc::new(ChoiceSet::new()),
            exclusions: Vec::new(),
            sections: Vec::new(),
            active_section: None,
            queues: PathQueues::default(),
            local_errors: ValidationErrors::new(),
            server_errors: ValidationErrors::new(),
            in_flight: None,
            next_ticket: 0,
            history: Vec::new(),
            events: EventBus::default(),
        };
        store.load(payload);
        store
    }

    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self.revalidate();
        self
    }

    pub fn with_choices(mut self, choices: Arc<ChoiceSet>) -> Self {
        self.choices = choices;
        self
    }

    pub fn with_exclusions(mut self, exclusions: Vec<ComparisonExclusion>) -> Self {
        self.exclusions = exclusions;
        self
    }

    pub fn with_sections(mut self, sections: Vec<FormSection>) -> Result<Self, StoreError> {
        for section in sections {
            self.register_section(section)?;
        }
        Ok(self)
    }

    /// Sections and exclusions from the form's settings
    pub fn with_form_settings(self, settings: FormSettings) -> Result<Self, StoreError> {
        self.with_exclusions(settings.exclusions)
            .with_sections(settings.sections)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn record(&self) -> &Value {
        &self.record
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn choices(&self) -> &Arc<ChoiceSet> {
        &self.choices
    }

    pub fn is_saving(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn request_history(&self) -> &[RequestRecord] {
        &self.history
    }

    /// HTTP status of the most recent completed request
    pub fn latest_request_status(&self) -> Option<u16> {
        self.history.iter().rev().find_map(|r| r.status)
    }

    /// Local rule failures together with those reported by the server
    pub fn validation_errors(&self) -> ValidationErrors {
        let mut all = self.local_errors.clone();
        all.merge(self.server_errors.clone());
        all
    }

    pub fn validation_failed_paths_under(&self, prefix: &FieldPath) -> Vec<FieldPath> {
        self.validation_errors()
            .within(std::slice::from_ref(prefix))
            .paths()
            .cloned()
            .collect()
    }

    pub fn touched_paths(&self) -> Vec<FieldPath> {
        self.queues.updated().cloned().collect()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&StoreEvent) + 'static) -> SubscriptionId {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Replace record and snapshot wholesale
    pub fn load(&mut self, payload: Value) {
        let mut payload = if payload.is_null() {
            match self.config.record.root {
                RootKind::Object => Value::Object(Default::default()),
                RootKind::Array => Value::Array(Vec::new()),
            }
        } else {
            payload
        };

        if let (Some(key), Value::Array(items)) = (&self.config.record.sort_by, &mut payload) {
            items.sort_by(|a, b| compare_sort_keys(a.get(key), b.get(key)));
        }

        self.snapshot = Snapshot::of(&payload);
        self.record = payload;
        self.reset_bookkeeping();
        tracing::debug!(resource = %self.config.api.resource, "record loaded");
        self.events.emit(StoreEvent::Reloaded);
    }

    /// Merge top-level keys of `payload` into the record and take a fresh snapshot
    pub fn partial_load(&mut self, payload: Value) -> Result<(), StoreError> {
        if !self.record.is_object() || !payload.is_object() {
            return Err(StoreError::NotAnObject);
        }
        json_tree::merge_top_level(&mut self.record, &payload);
        self.snapshot = Snapshot::of(&self.record);
        self.reset_bookkeeping();
        tracing::debug!(resource = %self.config.api.resource, "record partially loaded");
        self.events.emit(StoreEvent::Reloaded);
        Ok(())
    }

    fn reset_bookkeeping(&mut self) {
        self.queues.clear();
        self.local_errors = ValidationErrors::new();
        self.server_errors = ValidationErrors::new();
        self.prune_sections();
    }

    fn prune_sections(&mut self) {
        let record = &self.record;
        for section in self.sections.iter_mut() {
            section.paths.retain(|path| {
                let keep = json_tree::contains(record, path);
                if !keep {
                    tracing::warn!(section = %section.key, path = %path, "section path no longer resolves, dropped");
                }
                keep
            });
        }
    }

    // ========================================================================
    // Field access
    // ========================================================================

    pub fn get(&self, path: &FieldPath) -> Option<&Value> {
        json_tree::get(&self.record, path)
    }

    /// Typed read; `Ok(None)` when the path does not resolve
    pub fn get_as<T: DeserializeOwned>(&self, path: &FieldPath) -> Result<Option<T>, StoreError> {
        self.get(path)
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(|e| StoreError::Decode {
                    path: path.clone(),
                    message: e.to_string(),
                })
            })
            .transpose()
    }

    pub fn set(&mut self, path: &FieldPath, value: Value) -> Result<(), StoreError> {
        if let Err(source) = json_tree::assign(&mut self.record, path, value) {
            tracing::warn!(path = %path, reason = %source, "set rejected");
            self.events.emit(StoreEvent::PathRejected {
                path: path.clone(),
                reason: source.to_string(),
            });
            return Err(StoreError::Unassignable {
                path: path.clone(),
                source,
            });
        }

        self.queues.mark_updated(path.clone());
        self.server_errors.clear_under(path);
        tracing::trace!(path = %path, "field set");
        self.events.emit(StoreEvent::PathChanged { path: path.clone() });
        self.revalidate();
        Ok(())
    }

    pub fn choice_label(&self, category: &str, code: &Value) -> Option<String> {
        self.choices.label_for_value(category, code)
    }

    // ========================================================================
    // Dirty tracking
    // ========================================================================

    /// Record differs from snapshot at any of `paths`; empty means anywhere
    pub fn is_dirty(&self, paths: &[FieldPath]) -> bool {
        if paths.is_empty() {
            return !comparison::equivalent(&self.record, self.snapshot.value(), &self.exclusions);
        }
        paths.iter().any(|path| {
            comparison::path_differs(&self.record, self.snapshot.value(), path, &self.exclusions)
        })
    }

    pub fn path_status(&self, path: &FieldPath) -> PathStatus {
        self.queues.status(path, &self.validation_errors())
    }

    fn revalidate(&mut self) {
        let before = self.validation_errors();
        self.local_errors = self.local_failures();

        let after = self.validation_errors();
        if before != after {
            tracing::debug!(failures = after.len(), "validation changed");
            self.events.emit(StoreEvent::ValidationChanged { errors: after });
        }
    }

    /// Rules run against the record without the rows marked for deletion;
    /// failures are reported at record positions
    fn local_failures(&self) -> ValidationErrors {
        let mut deleted: Vec<FieldPath> = self.queues.deleted().cloned().collect();
        if deleted.is_empty() {
            return self.rules.validate(&self.record);
        }
        deleted.sort_by(|a, b| b.cmp(a));
        let mut pruned = self.record.clone();
        for path in &deleted {
            json_tree::remove(&mut pruned, path);
        }

        let mut errors = ValidationErrors::new();
        for (path, messages) in self.rules.validate(&pruned).iter() {
            let path = restore_indices(path, &deleted);
            if deleted.iter().any(|d| path.starts_with(d)) {
                continue;
            }
            for message in messages {
                errors.add(path.clone(), message.clone());
            }
        }
        errors
    }

    // ========================================================================
    // Rows
    // ========================================================================

    /// Append `template` to the array at `array_path`; returns its index
    pub fn push_item(&mut self, array_path: &FieldPath, template: Value) -> Result<usize, StoreError> {
        let index = match self.get(array_path) {
            Some(Value::Array(items)) => items.len(),
            _ => return Err(StoreError::NotAnArray(array_path.clone())),
        };
        let row = array_path.child_index(index);
        json_tree::assign(&mut self.record, &row, template).map_err(|source| {
            StoreError::Unassignable {
                path: row.clone(),
                source,
            }
        })?;

        self.queues.mark_created(row.clone());
        self.events.emit(StoreEvent::PathChanged { path: row });
        self.revalidate();
        Ok(index)
    }

    /// Remove one array element; later rows shift down
    pub fn remove_item(&mut self, path: &FieldPath) -> Result<Value, StoreError> {
        let (index, array_path) = match path.split_last() {
            Some((last, parent)) => match (last.as_index(), self.get(&parent)) {
                (Some(index), Some(Value::Array(_))) => (index, parent),
                _ => return Err(StoreError::NotAnArray(parent)),
            },
            None => return Err(StoreError::NotAnArray(FieldPath::root())),
        };
        let removed = json_tree::remove(&mut self.record, path)
            .ok_or_else(|| StoreError::UnknownPath(path.clone()))?;

        self.queues.shift_after_removal(&array_path, index);
        self.server_errors.clear_under(&array_path);
        self.events.emit(StoreEvent::PathChanged { path: array_path });
        self.revalidate();
        Ok(removed)
    }

    /// Mark or unmark `path` for deletion on the next save; returns the new mark
    pub fn toggle_delete(&mut self, path: &FieldPath) -> Result<bool, StoreError> {
        if self.get(path).is_none() {
            return Err(StoreError::UnknownPath(path.clone()));
        }
        let marked = self.queues.toggle_deleted(path);
        self.events.emit(StoreEvent::PathChanged { path: path.clone() });
        self.revalidate();
        Ok(marked)
    }

    // ========================================================================
    // Sections
    // ========================================================================

    /// Add or replace a section; every path must resolve in the record
    pub fn register_section(&mut self, section: FormSection) -> Result<(), StoreError> {
        if let Some(missing) = section.paths.iter().find(|p| self.get(p).is_none()) {
            return Err(StoreError::UnknownPath(missing.clone()));
        }
        match self.sections.iter_mut().find(|s| s.key == section.key) {
            Some(existing) => *existing = section,
            None => self.sections.push(section),
        }
        Ok(())
    }

    pub fn set_active_section(&mut self, key: &str) -> Result<(), StoreError> {
        if !self.sections.iter().any(|s| s.key == key) {
            return Err(StoreError::UnknownSection(key.to_string()));
        }
        self.active_section = Some(key.to_string());
        Ok(())
    }

    pub fn active_section(&self) -> Option<&FormSection> {
        let key = self.active_section.as_deref()?;
        self.sections.iter().find(|s| s.key == key)
    }

    pub fn section_paths(&self, key: &str) -> Result<Vec<FieldPath>, StoreError> {
        self.sections
            .iter()
            .find(|s| s.key == key)
            .map(|s| s.paths.clone())
            .ok_or_else(|| StoreError::UnknownSection(key.to_string()))
    }

    fn active_paths(&self) -> Result<Vec<FieldPath>, StoreError> {
        self.active_section()
            .map(|s| s.paths.clone())
            .ok_or(StoreError::NoActiveSection)
    }

    pub fn is_active_dirty(&self) -> Result<bool, StoreError> {
        let paths = self.active_paths()?;
        // a section that lost all its paths has nothing to compare
        Ok(!paths.is_empty() && self.is_dirty(&paths))
    }

    pub async fn save_active(&mut self) -> Result<(), StoreError> {
        let paths = self.active_paths()?;
        self.save(&paths).await
    }

    pub fn discard_active(&mut self) -> Result<(), StoreError> {
        let paths = self.active_paths()?;
        if !paths.is_empty() {
            self.discard(&paths);
        }
        Ok(())
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Validate, build the partial payload and mark a save as in flight
    pub fn begin_save(&mut self, paths: &[FieldPath]) -> Result<SaveTicket, StoreError> {
        if self.in_flight.is_some() {
            tracing::warn!(resource = %self.config.api.resource, "save rejected, another save is in flight");
            return Err(StoreError::SaveInFlight);
        }

        let scope: Vec<FieldPath> = if paths.is_empty() {
            vec![FieldPath::root()]
        } else {
            paths.to_vec()
        };
        if let Some(missing) = scope.iter().find(|p| self.get(p).is_none()) {
            return Err(StoreError::UnknownPath(missing.clone()));
        }
        let scope = self.widen_scope(&scope);

        self.revalidate();
        let failures = self.local_errors.within(&scope);
        if !failures.is_empty() {
            tracing::info!(failures = failures.len(), "save blocked by validation");
            let errors = self.validation_errors();
            self.events.emit(StoreEvent::ValidationChanged { errors });
            return Err(StoreError::Validation(failures));
        }

        let mut payload = json_tree::extract(&self.record, &scope)?;
        let mut deleted = self.queues.deleted_within(&scope);
        // deepest and highest index first, so earlier removals do not shift later ones
        deleted.sort_by(|a, b| b.cmp(a));
        for path in &deleted {
            json_tree::remove(&mut payload, path);
        }

        let id_key = self.config.record.id_key.as_str();
        let id = identity(&self.record, id_key).cloned();
        if let (Some(id), Value::Object(map)) = (&id, &mut payload) {
            map.insert(id_key.to_string(), id.clone());
        }
        let (method, url) = match &id {
            Some(id) => (RequestMethod::Put, record_url(&self.config.api, id)),
            None => (RequestMethod::Post, collection_url(&self.config.api)),
        };

        self.next_ticket += 1;
        self.in_flight = Some(self.next_ticket);
        self.history.push(RequestRecord {
            method,
            url: url.clone(),
            status: None,
        });
        tracing::info!(
            method = method.as_str(),
            url = %url,
            paths = %join_paths(&scope),
            "dispatching save"
        );

        Ok(SaveTicket {
            id: self.next_ticket,
            paths: scope,
            payload: payload.clone(),
            request: PersistRequest {
                method,
                url,
                body: payload,
            },
        })
    }

    /// Scope as sent: an array whose rows were deleted, removed or pushed
    /// since the snapshot goes out whole when the scope reaches into it
    fn widen_scope(&self, scope: &[FieldPath]) -> Vec<FieldPath> {
        let mut arrays: Vec<FieldPath> = self
            .queues
            .deleted()
            .filter_map(|path| {
                let (last, parent) = path.split_last()?;
                last.as_index()?;
                matches!(self.get(&parent), Some(Value::Array(_))).then_some(parent)
            })
            .collect();
        for path in scope {
            let ancestors = std::iter::once(FieldPath::root()).chain(path.ancestors());
            for ancestor in ancestors.filter(|a| a.len() < path.len()) {
                let Some(Value::Array(items)) = self.get(&ancestor) else {
                    continue;
                };
                let same_rows = matches!(
                    self.snapshot.get(&ancestor),
                    Some(Value::Array(saved)) if saved.len() == items.len()
                );
                if !same_rows {
                    arrays.push(ancestor);
                }
            }
        }

        let mut widened = scope.to_vec();
        for array in arrays {
            let reaches_in = scope
                .iter()
                .any(|p| p.len() > array.len() && p.starts_with(&array));
            let covered = widened.iter().any(|p| array.starts_with(p));
            if reaches_in && !covered {
                tracing::debug!(array = %array, "row set changed, saving the whole array");
                widened.push(array);
            }
        }

        // paths inside another scope path add nothing
        let mut collapsed: Vec<FieldPath> = Vec::with_capacity(widened.len());
        for path in &widened {
            let inside = widened
                .iter()
                .any(|other| other.len() < path.len() && path.starts_with(other));
            if !inside && !collapsed.contains(path) {
                collapsed.push(path.clone());
            }
        }
        collapsed
    }

    /// Apply the outcome of the save described by `ticket`
    pub fn complete_save(
        &mut self,
        ticket: SaveTicket,
        outcome: Result<PersistResponse, TransportError>,
    ) -> Result<(), StoreError> {
        if self.in_flight != Some(ticket.id) {
            return Err(StoreError::StaleTicket(ticket.id));
        }
        self.in_flight = None;
        let SaveTicket { paths, payload, .. } = ticket;

        let response = match outcome {
            Ok(response) => response,
            Err(error) => {
                self.record_status(None);
                tracing::error!(error = %error, "save failed in transport");
                self.events.emit(StoreEvent::SaveFailed {
                    payload,
                    failure: SaveFailure::Transport(error.to_string()),
                });
                return Err(StoreError::Transport(error));
            }
        };
        self.record_status(Some(response.status));

        if !response.is_success() {
            let errors = ValidationErrors::from_response(&response.body);
            tracing::warn!(status = response.status, failures = errors.len(), "save rejected by server");
            let before = self.validation_errors();
            self.server_errors.merge(errors.clone());
            let after = self.validation_errors();
            if before != after {
                self.events.emit(StoreEvent::ValidationChanged { errors: after });
            }
            self.events.emit(StoreEvent::SaveFailed {
                payload,
                failure: SaveFailure::Rejected {
                    status: response.status,
                    errors: errors.clone(),
                },
            });
            return Err(StoreError::Rejected {
                status: response.status,
                errors,
            });
        }

        let (record, snapshot) = match self.apply_response(&paths, &response.body) {
            Ok(applied) => applied,
            Err(missing) => {
                tracing::error!(missing = %join_paths(&missing), "save response is missing saved paths");
                self.events.emit(StoreEvent::SaveFailed {
                    payload,
                    failure: SaveFailure::Shape {
                        missing: missing.clone(),
                    },
                });
                return Err(StoreError::Shape { missing });
            }
        };

        self.record = record;
        self.snapshot = snapshot;
        for path in &paths {
            self.queues.clear_under(path);
            self.server_errors.clear_under(path);
        }
        self.prune_sections();
        self.revalidate();

        tracing::info!(paths = %join_paths(&paths), "save applied");
        self.events.emit(StoreEvent::Saved {
            paths,
            response: response.body,
        });
        Ok(())
    }

    /// Record and snapshot after taking the server's values at `paths`.
    /// On failure returns the paths that could not be taken.
    fn apply_response(
        &self,
        paths: &[FieldPath],
        body: &Value,
    ) -> Result<(Value, Snapshot), Vec<FieldPath>> {
        let missing: Vec<FieldPath> = paths
            .iter()
            .filter(|p| match json_tree::get(body, p) {
                Some(value) => p.is_root() && value.is_null(),
                None => true,
            })
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(missing);
        }

        let mut record = self.record.clone();
        let mut taken = paths.to_vec();
        for path in paths {
            sync_path(&mut record, body, path).map_err(|_| vec![path.clone()])?;
        }

        let id_key = self.config.record.id_key.as_str();
        if let (Some(id), Value::Object(map)) = (identity(body, id_key), &mut record) {
            map.insert(id_key.to_string(), id.clone());
            taken.push(FieldPath::key(id_key));
        }

        let snapshot = self
            .snapshot
            .with_paths_from(&record, &taken)
            .map_err(|_| taken.clone())?;
        Ok((record, snapshot))
    }

    fn record_status(&mut self, status: Option<u16>) {
        if let Some(last) = self.history.last_mut() {
            last.status = status;
        }
    }

    /// begin_save, transport round-trip, complete_save
    pub async fn save(&mut self, paths: &[FieldPath]) -> Result<(), StoreError> {
        let ticket = self.begin_save(paths)?;
        let transport = Arc::clone(&self.transport);
        let outcome = transport.send(ticket.request().clone()).await;
        self.complete_save(ticket, outcome)
    }

    // ========================================================================
    // Reload / delete
    // ========================================================================

    /// Send a bodiless request, keep it in the history and report failures
    async fn dispatch(&mut self, request: PersistRequest) -> Result<PersistResponse, StoreError> {
        if self.in_flight.is_some() {
            tracing::warn!(method = request.method.as_str(), "request rejected, a save is in flight");
            return Err(StoreError::SaveInFlight);
        }
        let method = request.method;
        self.history.push(RequestRecord {
            method,
            url: request.url.clone(),
            status: None,
        });
        tracing::info!(method = method.as_str(), url = %request.url, "dispatching request");

        let transport = Arc::clone(&self.transport);
        let response = match transport.send(request).await {
            Ok(response) => response,
            Err(error) => {
                tracing::error!(method = method.as_str(), error = %error, "request failed in transport");
                self.events.emit(StoreEvent::RequestFailed {
                    method,
                    failure: SaveFailure::Transport(error.to_string()),
                });
                return Err(StoreError::Transport(error));
            }
        };
        self.record_status(Some(response.status));

        if !response.is_success() {
            let errors = ValidationErrors::from_response(&response.body);
            tracing::warn!(method = method.as_str(), status = response.status, "request rejected by server");
            self.events.emit(StoreEvent::RequestFailed {
                method,
                failure: SaveFailure::Rejected {
                    status: response.status,
                    errors: errors.clone(),
                },
            });
            return Err(StoreError::Rejected {
                status: response.status,
                errors,
            });
        }
        Ok(response)
    }

    /// Fetch the record again and [`load`](Self::load) it; local edits are dropped.
    /// Array-rooted stores fetch the collection.
    pub async fn reload(&mut self) -> Result<(), StoreError> {
        let id_key = self.config.record.id_key.as_str();
        let url = match (identity(&self.record, id_key), &self.config.record.root) {
            (Some(id), _) => record_url(&self.config.api, id),
            (None, RootKind::Array) => collection_url(&self.config.api),
            (None, RootKind::Object) => return Err(StoreError::MissingIdentity),
        };

        let response = self
            .dispatch(PersistRequest::bare(RequestMethod::Get, url))
            .await?;
        let fits = match self.config.record.root {
            RootKind::Object => response.body.is_object(),
            RootKind::Array => response.body.is_array(),
        };
        if !fits {
            let missing = vec![FieldPath::root()];
            tracing::error!("reload response does not hold a record");
            self.events.emit(StoreEvent::RequestFailed {
                method: RequestMethod::Get,
                failure: SaveFailure::Shape {
                    missing: missing.clone(),
                },
            });
            return Err(StoreError::Shape { missing });
        }

        self.load(response.body);
        Ok(())
    }

    /// Delete the record on the server, then empty the store
    pub async fn delete_record(&mut self) -> Result<(), StoreError> {
        let id = identity(&self.record, &self.config.record.id_key)
            .cloned()
            .ok_or(StoreError::MissingIdentity)?;
        let url = record_url(&self.config.api, &id);

        self.dispatch(PersistRequest::bare(RequestMethod::Delete, url))
            .await?;
        tracing::info!(id = %id, "record deleted");
        self.load(Value::Null);
        self.events.emit(StoreEvent::Deleted { id });
        Ok(())
    }

    /// Reset `paths` to their snapshot values; empty means the whole record
    pub fn discard(&mut self, paths: &[FieldPath]) {
        if paths.is_empty() || paths.iter().any(FieldPath::is_root) {
            self.record = self.snapshot.value().clone();
            self.queues.clear();
            self.server_errors = ValidationErrors::new();
            self.revalidate();
            tracing::debug!("all changes discarded");
            self.events.emit(StoreEvent::Reloaded);
            return;
        }

        let mut ordered = paths.to_vec();
        ordered.sort_by(|a, b| b.cmp(a));
        for path in &ordered {
            if let Err(e) = sync_path(&mut self.record, self.snapshot.value(), path) {
                tracing::warn!(path = %path, error = %e, "discard could not restore path");
            }
            self.queues.clear_under(path);
            self.server_errors.clear_under(path);
        }

        for path in paths {
            self.events.emit(StoreEvent::PathChanged { path: path.clone() });
        }
        self.revalidate();
    }
}

impl PathAddressable for FormStateStore {
    fn get(&self, path: &FieldPath) -> Option<&Value> {
        FormStateStore::get(self, path)
    }

    fn set(&mut self, path: &FieldPath, value: Value) -> Result<(), StoreError> {
        FormStateStore::set(self, path, value)
    }
}

#[async_trait(?Send)]
impl Persistable for FormStateStore {
    async fn save(&mut self, paths: &[FieldPath]) -> Result<(), StoreError> {
        FormStateStore::save(self, paths).await
    }

    fn discard(&mut self, paths: &[FieldPath]) {
        FormStateStore::discard(self, paths)
    }
}

/// Record position of `path`, given in the record with `deleted` removed
fn restore_indices(path: &FieldPath, deleted: &[FieldPath]) -> FieldPath {
    let mut tokens: Vec<PathToken> = Vec::with_capacity(path.len());
    for token in path.tokens() {
        let PathToken::Index(index) = token else {
            tokens.push(token.clone());
            continue;
        };
        let parent = FieldPath::from_tokens(tokens.clone());
        let mut gone: Vec<usize> = deleted
            .iter()
            .filter_map(|d| match d.split_last() {
                Some((last, p)) if p == parent => last.as_index(),
                _ => None,
            })
            .collect();
        gone.sort_unstable();

        let mut index = *index;
        for removed in gone {
            if removed <= index {
                index += 1;
            }
        }
        tokens.push(PathToken::Index(index));
    }
    FieldPath::from_tokens(tokens)
}

fn join_paths(paths: &[FieldPath]) -> String {
    paths
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Nulls and missing keys sort first; numbers by value, strings lexically
fn compare_sort_keys(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}
