//! In-process [`DispatchStore`] for tests and single-node development.
//!
//! All state sits behind one async mutex. Every trait method takes the lock
//! for its whole duration, so `try_lease` is a true compare-and-set.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

use super::model::{
    BrowserVariant, CapabilityPredicate, Factory, NewBrowser, NewFactory, NewRequestGroup,
    ShotRequest,
};
use super::store::{DispatchStore, EligibleQuery, ScanCursor, StoreError};

#[derive(Debug, Default)]
struct State {
    last_group_id: DbId,
    last_factory_id: DbId,
    last_browser_id: DbId,
    last_request_group_id: DbId,
    last_request_id: DbId,
    browser_groups: Vec<(DbId, String)>,
    factories: Vec<Factory>,
    browsers: Vec<BrowserVariant>,
    requests: Vec<ShotRequest>,
}

impl State {
    fn browser_group_id(&mut self, name: &str) -> DbId {
        let name = name.trim().to_lowercase();
        if let Some((id, _)) = self.browser_groups.iter().find(|(_, n)| *n == name) {
            return *id;
        }
        self.last_group_id += 1;
        self.browser_groups.push((self.last_group_id, name));
        self.last_group_id
    }

    fn browser_group_name(&self, id: DbId) -> String {
        self.browser_groups
            .iter()
            .find(|(gid, _)| *gid == id)
            .map(|(_, name)| name.clone())
            .unwrap_or_default()
    }

    fn request_mut(&mut self, id: DbId) -> Option<&mut ShotRequest> {
        self.requests.iter_mut().find(|r| r.id == id)
    }
}

/// Memory-backed store. Cheap to construct; wrap in an `Arc` to share.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle a browser variant's `active` flag. Returns whether it existed.
    pub async fn set_browser_active(&self, browser_id: DbId, active: bool) -> bool {
        let mut state = self.state.lock().await;
        match state.browsers.iter_mut().find(|b| b.id == browser_id) {
            Some(browser) => {
                browser.active = active;
                true
            }
            None => false,
        }
    }
}

fn after_cursor(request: &ShotRequest, cursor: Option<ScanCursor>) -> bool {
    match cursor {
        None => true,
        Some(c) => (request.submitted_at, request.id) > (c.submitted_at, c.id),
    }
}

#[async_trait]
impl DispatchStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn find_factory_by_name(&self, name: &str) -> Result<Option<Factory>, StoreError> {
        let name = name.to_lowercase();
        let state = self.state.lock().await;
        Ok(state.factories.iter().find(|f| f.name == name).cloned())
    }

    async fn record_poll(
        &self,
        factory_id: DbId,
        at: Timestamp,
        ip_address: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let factory = state
            .factories
            .iter_mut()
            .find(|f| f.id == factory_id)
            .ok_or(CoreError::NotFound {
                entity: "Factory",
                id: factory_id,
            })?;
        factory.last_poll_at = Some(at);
        factory.ip_address = Some(ip_address.to_string());
        Ok(())
    }

    async fn list_active_browsers(
        &self,
        factory_id: DbId,
    ) -> Result<Vec<BrowserVariant>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .browsers
            .iter()
            .filter(|b| b.factory_id == factory_id && b.active)
            .cloned()
            .collect())
    }

    async fn eligible_requests(&self, query: &EligibleQuery) -> Result<Vec<ShotRequest>, StoreError> {
        let state = self.state.lock().await;
        let mut page: Vec<ShotRequest> = state
            .requests
            .iter()
            .filter(|r| {
                r.completed_at.is_none()
                    && r.expires_at > query.now
                    && r.locked_at.map_or(true, |at| at < query.stale_before)
                    && query
                        .browser_group_ids
                        .contains(&r.predicate.browser_group_id)
                    && after_cursor(r, query.after)
            })
            .cloned()
            .collect();
        page.sort_by_key(|r| (r.submitted_at, r.id));
        page.truncate(query.limit.max(0) as usize);
        Ok(page)
    }

    async fn try_lease(
        &self,
        request_id: DbId,
        factory_id: DbId,
        now: Timestamp,
        stale_before: Timestamp,
    ) -> Result<Option<ShotRequest>, StoreError> {
        let mut state = self.state.lock().await;
        let Some(request) = state.request_mut(request_id) else {
            return Ok(None);
        };
        let leasable = request.completed_at.is_none()
            && request.expires_at > now
            && request.locked_at.map_or(true, |at| at < stale_before);
        if !leasable {
            return Ok(None);
        }
        request.factory_id = Some(factory_id);
        request.locked_at = Some(now);
        Ok(Some(request.clone()))
    }

    async fn release_lease(&self, request_id: DbId, factory_id: DbId) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        match state.request_mut(request_id) {
            Some(request) if request.is_leased_by(factory_id) => {
                request.factory_id = None;
                request.locked_at = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_request(&self, request_id: DbId) -> Result<Option<ShotRequest>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.requests.iter().find(|r| r.id == request_id).cloned())
    }

    async fn find_leased_request(
        &self,
        request_id: DbId,
        factory_id: DbId,
    ) -> Result<Option<ShotRequest>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .requests
            .iter()
            .find(|r| r.id == request_id && r.is_leased_by(factory_id))
            .cloned())
    }

    async fn mark_completed(
        &self,
        request_id: DbId,
        factory_id: DbId,
        at: Timestamp,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        match state.request_mut(request_id) {
            Some(request) if request.is_leased_by(factory_id) && !request.is_completed() => {
                request.completed_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn create_factory(&self, input: &NewFactory) -> Result<Factory, StoreError> {
        let name = input.name.to_lowercase();
        let mut state = self.state.lock().await;
        if state.factories.iter().any(|f| f.name == name) {
            return Err(StoreError::Conflict(format!(
                "Factory '{name}' already exists"
            )));
        }
        state.last_factory_id += 1;
        let factory = Factory {
            id: state.last_factory_id,
            name,
            password_hash: input.password_hash.clone(),
            ip_address: None,
            last_poll_at: None,
            screen_sizes: input.screen_sizes.clone(),
            color_depths: input.color_depths.clone(),
            created_at: chrono::Utc::now(),
        };
        state.factories.push(factory.clone());
        Ok(factory)
    }

    async fn add_browser(
        &self,
        factory_id: DbId,
        input: &NewBrowser,
    ) -> Result<BrowserVariant, StoreError> {
        let mut state = self.state.lock().await;
        if !state.factories.iter().any(|f| f.id == factory_id) {
            return Err(CoreError::NotFound {
                entity: "Factory",
                id: factory_id,
            }
            .into());
        }
        let browser_group_id = state.browser_group_id(&input.browser_group);
        state.last_browser_id += 1;
        let browser = BrowserVariant {
            id: state.last_browser_id,
            factory_id,
            browser_group_id,
            browser_group: state.browser_group_name(browser_group_id),
            version: input.version.clone(),
            major: input.major,
            minor: input.minor,
            command: input.command.clone().unwrap_or_default(),
            active: input.active.unwrap_or(true),
            javascript_id: input.javascript_id,
            java_id: input.java_id,
            flash_id: input.flash_id,
        };
        state.browsers.push(browser.clone());
        Ok(browser)
    }

    async fn submit_request_group(
        &self,
        input: &NewRequestGroup,
    ) -> Result<Vec<ShotRequest>, StoreError> {
        let mut state = self.state.lock().await;
        state.last_request_group_id += 1;
        let request_group_id = state.last_request_group_id;

        let mut created = Vec::with_capacity(input.browsers.len());
        for wanted in &input.browsers {
            let browser_group_id = state.browser_group_id(&wanted.browser_group);
            state.last_request_id += 1;
            let request = ShotRequest {
                id: state.last_request_id,
                request_group_id,
                predicate: CapabilityPredicate {
                    browser_group_id,
                    major: wanted.major,
                    minor: wanted.minor,
                    plugins: input.plugins.clone(),
                },
                width: input.width,
                height: input.height,
                bits_per_pixel: input.bits_per_pixel,
                submitted_at: input.submitted_at,
                expires_at: input.expires_at,
                completed_at: None,
                factory_id: None,
                locked_at: None,
            };
            state.requests.push(request.clone());
            created.push(request);
        }
        Ok(created)
    }
}
