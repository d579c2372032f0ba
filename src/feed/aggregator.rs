use super::config::{FeedConfig, FetchMode};
use super::error::{FeedError, Result};
use super::item::NotificationItem;
use super::merge::{admin_page, collect_role_items};
use super::read_state::{KeyValueStore, ReadState};
use super::source::FeedSource;
use super::{Identity, Role};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedEntry {
    #[serde(flatten)]
    pub item: NotificationItem,
    pub read: bool,
}

/// What the viewer currently sees.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedView {
    pub role: Role,
    pub user_id: String,
    /// Unread first, then read; newest first within each group.
    pub items: Vec<FeedEntry>,
    pub unread_count: usize,
    pub has_more: bool,
    pub offset: usize,
    pub page_size: usize,
    pub badge: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeUpdate {
    pub identity: Identity,
    pub unread: usize,
    pub changed: bool,
}

struct FeedState {
    identity: Option<Identity>,
    /// Bumped whenever the viewer changes or a page load starts; responses
    /// carrying an older value are dropped.
    generation: u64,
    read: ReadState,
    /// The current viewer's full merged list, for roles whose sources are
    /// not jointly paginated. Dropped whenever the viewer changes.
    merged: Option<(Identity, Vec<NotificationItem>)>,
    /// Loaded items, newest first.
    items: Vec<NotificationItem>,
    offset: usize,
    page_size: usize,
    has_more: bool,
    badge: usize,
}

impl FeedState {
    fn merged_for(&self, identity: &Identity) -> Option<&[NotificationItem]> {
        match &self.merged {
            Some((owner, items)) if owner == identity => Some(items.as_slice()),
            _ => None,
        }
    }

    fn reset_page(&mut self) {
        self.items.clear();
        self.offset = 0;
        self.has_more = false;
    }

    fn current(&self) -> Result<Identity> {
        self.identity.clone().ok_or(FeedError::NoIdentity)
    }

    fn is_current(&self, identity: &Identity, generation: u64) -> bool {
        self.generation == generation && self.identity.as_ref() == Some(identity)
    }

    fn unread_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| !self.read.is_read(&item.id))
            .count()
    }

    fn view(&self) -> Result<FeedView> {
        let identity = self.current()?;
        let (unread, read): (Vec<&NotificationItem>, Vec<&NotificationItem>) = self
            .items
            .iter()
            .partition(|item| !self.read.is_read(&item.id));
        let unread_count = unread.len();
        let items = unread
            .into_iter()
            .map(|item| FeedEntry {
                item: item.clone(),
                read: false,
            })
            .chain(read.into_iter().map(|item| FeedEntry {
                item: item.clone(),
                read: true,
            }))
            .collect();

        Ok(FeedView {
            role: identity.role,
            user_id: identity.user_id,
            items,
            unread_count,
            has_more: self.has_more,
            offset: self.offset,
            page_size: self.page_size,
            badge: self.badge,
        })
    }

    /// Shows the first `offset + page_size` merged items.
    fn show_merged_prefix(&mut self, identity: &Identity) {
        let merged = self.merged_for(identity).unwrap_or(&[]);
        let shown = (self.offset + self.page_size).min(merged.len());
        let has_more = merged.len() > shown;
        let items = merged[..shown].to_vec();
        self.items = items;
        self.has_more = has_more;
    }
}

/// Feed state for one viewer at a time. Shared between the request loop and
/// the badge refresher; the lock is never held across a source call.
pub struct NotificationFeed {
    source: Arc<dyn FeedSource>,
    store: Arc<dyn KeyValueStore>,
    config: Mutex<FeedConfig>,
    clock: Clock,
    state: Mutex<FeedState>,
}

impl NotificationFeed {
    pub fn new(
        source: Arc<dyn FeedSource>,
        store: Arc<dyn KeyValueStore>,
        config: FeedConfig,
    ) -> Self {
        let page_size = config.feed.page_size.max(1);
        Self {
            source,
            store,
            config: Mutex::new(config),
            clock: Arc::new(Utc::now),
            state: Mutex::new(FeedState {
                identity: None,
                generation: 0,
                read: ReadState::default(),
                merged: None,
                items: Vec::new(),
                offset: 0,
                page_size,
                has_more: false,
                badge: 0,
            }),
        }
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    fn state(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> FeedConfig {
        self.config
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Takes effect from the next load that does not name its own page size;
    /// the current page is left alone.
    pub fn set_config(&self, config: FeedConfig) {
        let page_size = config.feed.page_size.max(1);
        *self.config.lock().unwrap_or_else(PoisonError::into_inner) = config;
        let mut st = self.state();
        if st.items.is_empty() {
            st.page_size = page_size;
        }
    }

    pub fn identity(&self) -> Option<Identity> {
        self.state().identity.clone()
    }

    /// Switches the viewer and loads their read markers. Returns how many ids
    /// are marked read.
    pub fn identify(&self, identity: Identity) -> usize {
        let read = ReadState::load(self.store.as_ref(), &identity);
        let page_size = self.config().feed.page_size.max(1);

        let mut st = self.state();
        if st.identity.as_ref() != Some(&identity) {
            tracing::info!(viewer = %identity, "feed viewer changed");
            st.generation += 1;
            st.merged = None;
            st.reset_page();
            st.page_size = page_size;
            st.badge = 0;
        }
        st.read = read;
        st.identity = Some(identity);
        st.read.len()
    }

    pub fn clear_identity(&self) {
        let mut st = self.state();
        st.generation += 1;
        st.identity = None;
        st.read = ReadState::default();
        st.merged = None;
        st.reset_page();
        st.badge = 0;
    }

    pub fn snapshot(&self) -> Result<FeedView> {
        self.state().view()
    }

    /// Loads the first page. A failure to resolve the viewer empties the feed
    /// rather than surfacing an error.
    /// Without an explicit `page_size` the configured one is used.
    pub async fn load(&self, page_size: Option<usize>) -> Result<FeedView> {
        let page_size = page_size
            .unwrap_or_else(|| self.config().feed.page_size)
            .max(1);
        let (identity, generation) = {
            let mut st = self.state();
            let identity = st.current()?;
            st.generation += 1;
            st.page_size = page_size;
            (identity, st.generation)
        };

        let fetched = self.fetch_first_page(&identity, page_size).await;

        let mut st = self.state();
        if !st.is_current(&identity, generation) {
            tracing::debug!(viewer = %identity, "discarding stale feed load");
            return Err(FeedError::Superseded);
        }
        st.offset = 0;
        match fetched {
            Ok(FirstPage::Admin(items)) => {
                st.has_more = items.len() == page_size;
                st.items = items;
            }
            Ok(FirstPage::Merged(merged)) => {
                st.merged = Some((identity.clone(), merged));
                st.show_merged_prefix(&identity);
            }
            Err(e) => {
                tracing::warn!(viewer = %identity, error = %e, "feed load failed; clearing feed");
                st.merged = None;
                st.reset_page();
            }
        }
        st.view()
    }

    async fn fetch_first_page(&self, identity: &Identity, page_size: usize) -> Result<FirstPage> {
        self.source
            .resolve(identity)
            .await
            .map_err(FeedError::Identity)?;

        if identity.role == Role::Admin {
            return Ok(FirstPage::Admin(
                admin_page(self.source.as_ref(), page_size, 0).await,
            ));
        }
        let limits = self.config().limits(FetchMode::Full);
        let now = (self.clock)();
        Ok(FirstPage::Merged(
            collect_role_items(self.source.as_ref(), identity, &limits, now).await,
        ))
    }

    /// Extends the visible window by one page. A no-op when nothing is left.
    pub async fn load_more(&self) -> Result<FeedView> {
        let (identity, generation, offset, page_size) = {
            let mut st = self.state();
            let identity = st.current()?;
            if !st.has_more {
                return st.view();
            }
            let next = st.offset + st.page_size;
            // `has_more` is only set for other roles alongside their merged
            // list, so paging them never goes back to the sources.
            if identity.role != Role::Admin {
                st.offset = next;
                st.show_merged_prefix(&identity);
                return st.view();
            }
            st.generation += 1;
            (identity, st.generation, next, st.page_size)
        };

        let page = admin_page(self.source.as_ref(), page_size, offset).await;
        let mut st = self.state();
        if !st.is_current(&identity, generation) {
            return Err(FeedError::Superseded);
        }
        st.offset = offset;
        st.has_more = page.len() == page_size;
        st.items.extend(page);
        st.view()
    }

    pub fn toggle_one(&self, id: &str) -> Result<FeedView> {
        let mut st = self.state();
        let identity = st.current()?;
        st.read.toggle(id);
        st.read.persist(self.store.as_ref(), &identity);
        st.view()
    }

    /// Marks every loaded item read. Items not yet paged in are untouched.
    pub fn mark_all_read(&self) -> Result<FeedView> {
        let mut st = self.state();
        let identity = st.current()?;
        let FeedState { items, read, .. } = &mut *st;
        read.mark_read(items.iter().map(|item| item.id.as_str()));
        st.read.persist(self.store.as_ref(), &identity);
        st.view()
    }

    pub fn mark_all_unread(&self) -> Result<FeedView> {
        let mut st = self.state();
        let identity = st.current()?;
        let FeedState { items, read, .. } = &mut *st;
        read.mark_unread(items.iter().map(|item| item.id.as_str()));
        st.read.persist(self.store.as_ref(), &identity);
        st.view()
    }

    pub fn unread_count(&self) -> usize {
        self.state().unread_count()
    }

    pub fn badge(&self) -> usize {
        self.state().badge
    }

    /// Recounts unread items from a small first page per source. Touches only
    /// the badge; the loaded page and cursor are left alone. Returns `None`
    /// when there is no viewer, the viewer changed meanwhile, or the viewer
    /// could not be resolved.
    pub async fn refresh_badge(&self) -> Option<BadgeUpdate> {
        let identity = self.identity()?;
        if let Err(e) = self.source.resolve(&identity).await {
            tracing::debug!(viewer = %identity, error = %e, "badge refresh skipped");
            return None;
        }

        let limits = self.config().limits(FetchMode::Badge);
        let now = (self.clock)();
        let items = collect_role_items(self.source.as_ref(), &identity, &limits, now).await;

        let mut st = self.state();
        if st.identity.as_ref() != Some(&identity) {
            return None;
        }
        let unread = items
            .iter()
            .filter(|item| !st.read.is_read(&item.id))
            .count();
        let changed = st.badge != unread;
        st.badge = unread;
        Some(BadgeUpdate {
            identity,
            unread,
            changed,
        })
    }
}

enum FirstPage {
    Admin(Vec<NotificationItem>),
    Merged(Vec<NotificationItem>),
}
