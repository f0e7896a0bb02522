//! Session journey tracking
//!
//! A journey id identifies one user session across requests. It is created
//! lazily, can be replaced or reset, and can be remembered per named event so
//! callers can tell whether an event already happened in the current journey.

use std::sync::{Arc, Mutex};
use tracing::info;
use uuid::Uuid;

use crate::store::{KeyValueStore, Result};

pub struct JourneyService {
    current: Mutex<Option<String>>,
    store: Arc<dyn KeyValueStore>,
}

impl JourneyService {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            current: Mutex::new(None),
            store,
        }
    }

    /// Current journey id, generating one on first use
    pub fn journey_id(&self) -> String {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        match current.as_ref() {
            Some(id) => id.clone(),
            None => {
                let id = Uuid::new_v4().to_string();
                info!(journey_id = %id, "Generated new journey id");
                *current = Some(id.clone());
                id
            }
        }
    }

    pub fn set_id(&self, id: impl Into<String>) {
        let id = id.into();
        info!(journey_id = %id, "Set journey id");
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = Some(id);
    }

    /// Forget the current id; the next read generates a fresh one
    pub fn reset(&self) {
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn storage_key(event: &str, description: Option<&str>) -> String {
        match description {
            Some(description) => format!("{event}_{description}"),
            None => event.to_string(),
        }
    }

    /// Remember the current journey id against `event`
    pub fn store_journey_id(&self, event: &str, description: Option<&str>) -> Result<()> {
        let id = self.journey_id();
        self.store.set(&Self::storage_key(event, description), &id)
    }

    pub fn journey_id_for_event(
        &self,
        event: &str,
        description: Option<&str>,
    ) -> Result<Option<String>> {
        self.store.get(&Self::storage_key(event, description))
    }

    /// True when the stored id for `event` is missing or differs from the current one
    pub fn has_started_new_journey(&self, event: &str, description: Option<&str>) -> Result<bool> {
        let current = self.journey_id();
        let stored = self.journey_id_for_event(event, description)?;
        Ok(stored.as_deref() != Some(current.as_str()))
    }
}
