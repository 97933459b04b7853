use std::sync::{Arc, RwLock};

use indexmap::IndexMap;

use crate::session::ImportSession;

/// Live sessions keyed by socket id, in creation order.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<IndexMap<String, Arc<ImportSession>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<Arc<ImportSession>> {
        self.sessions
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(id)
            .cloned()
    }

    /// Insert or replace the session under its id.
    pub fn insert(&self, session: Arc<ImportSession>) -> Option<Arc<ImportSession>> {
        self.sessions
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .insert(session.id().to_string(), session)
    }

    /// Insert unless the id is taken; returns the session now registered.
    pub fn get_or_insert(&self, session: Arc<ImportSession>) -> Arc<ImportSession> {
        let mut map = self.sessions.write().unwrap_or_else(|p| p.into_inner());
        map.entry(session.id().to_string()).or_insert(session).clone()
    }

    pub fn remove(&self, id: &str) -> Option<Arc<ImportSession>> {
        self.sessions
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .shift_remove(id)
    }

    pub fn list(&self) -> Vec<Arc<ImportSession>> {
        self.sessions
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .values()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{SessionConfig, StoredCredential};

    fn session(id: &str) -> Arc<ImportSession> {
        Arc::new(ImportSession::new(
            id,
            SessionConfig {
                credential: Some(StoredCredential::Plain { url: "redis://x".into() }),
                id_field: None,
                key_prefix: String::new(),
                stop_on_error: false,
                transform_code: None,
                upload_path: "/tmp".into(),
                upload_type: None,
            },
        ))
    }

    #[test]
    fn insert_get_remove_keeps_order() {
        let reg = SessionRegistry::new();
        reg.insert(session("b"));
        reg.insert(session("a"));
        let ids: Vec<String> = reg.list().iter().map(|s| s.id().to_string()).collect();
        assert_eq!(ids, vec!["b", "a"]);

        assert!(reg.get("a").is_some());
        assert!(reg.remove("a").is_some());
        assert!(reg.get("a").is_none());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn get_or_insert_keeps_existing() {
        let reg = SessionRegistry::new();
        let first = session("s");
        reg.insert(first.clone());
        let got = reg.get_or_insert(session("s"));
        assert!(Arc::ptr_eq(&first, &got));
    }
}
