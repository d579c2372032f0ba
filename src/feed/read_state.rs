use super::Identity;
use std::collections::HashSet;

/// Small persistent string store the read markers live in.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
}

pub fn storage_key(identity: &Identity) -> String {
    format!(
        "notifications_read_{}_{}",
        identity.role.as_str(),
        identity.user_id
    )
}

/// Ids the viewer has acknowledged. Anything not in the set is unread; ids for
/// items that have since left the feed are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadState {
    ids: HashSet<String>,
}

impl ReadState {
    /// Missing, unreadable or malformed stored state all yield an empty set.
    pub fn load(store: &dyn KeyValueStore, identity: &Identity) -> Self {
        let key = storage_key(identity);
        let raw = match store.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self::default(),
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "failed to read stored read state");
                return Self::default();
            }
        };
        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(ids) => Self {
                ids: ids.into_iter().collect(),
            },
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "ignoring malformed read state");
                Self::default()
            }
        }
    }

    /// Write failures are logged; the in-memory set stays authoritative.
    pub fn persist(&self, store: &dyn KeyValueStore, identity: &Identity) {
        let key = storage_key(identity);
        let mut ids: Vec<&String> = self.ids.iter().collect();
        ids.sort();
        let encoded = match serde_json::to_string(&ids) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode read state");
                return;
            }
        };
        if let Err(e) = store.set(&key, &encoded) {
            tracing::warn!(error = %e, key = %key, "failed to persist read state");
        }
    }

    pub fn is_read(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Flips one id. Returns the new membership.
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.ids.remove(id) {
            false
        } else {
            self.ids.insert(id.to_string());
            true
        }
    }

    pub fn mark_read<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
        self.ids.extend(ids.into_iter().map(str::to_string));
    }

    pub fn mark_unread<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
        for id in ids {
            self.ids.remove(id);
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::MemoryStore;
    use super::*;
    use crate::feed::Role;

    fn student() -> Identity {
        Identity::new(Role::Student, "stu-1")
    }

    #[test]
    fn key_includes_role_and_user() {
        assert_eq!(storage_key(&student()), "notifications_read_student_stu-1");
    }

    #[test]
    fn toggle_twice_restores_membership() {
        let mut state = ReadState::default();
        assert!(state.toggle("notice_1"));
        assert!(!state.toggle("notice_1"));
        assert!(!state.is_read("notice_1"));
    }

    #[test]
    fn persist_then_load_roundtrips_through_store() {
        let store = MemoryStore::default();
        let mut state = ReadState::default();
        state.mark_read(["notice_1", "att_4"]);
        state.persist(&store, &student());

        assert_eq!(
            store.raw("notifications_read_student_stu-1").as_deref(),
            Some(r#"["att_4","notice_1"]"#)
        );
        assert_eq!(ReadState::load(&store, &student()), state);
    }

    #[test]
    fn unreadable_store_falls_back_to_empty() {
        let store = MemoryStore::failing();
        let state = ReadState::load(&store, &student());
        assert_eq!(state.len(), 0);

        let store = MemoryStore::default();
        store.put_raw("notifications_read_student_stu-1", "{not json");
        assert_eq!(ReadState::load(&store, &student()).len(), 0);
    }
}
