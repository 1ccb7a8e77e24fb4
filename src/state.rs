//! Application state: the injected session store, provider client, gate,
//! and prompts.
//!
//! Sessions are never reached through process-wide statics; everything
//! goes through the [`SessionStore`] handle owned here, so alternative
//! stores can be swapped in at construction time.

use std::sync::Arc;

use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::{load_tutor_config_from_env, Prompts};
use crate::gate::ProviderGate;
use crate::provider::ProviderClient;
use crate::session::{InMemorySessionStore, LearnerSession, SessionStore};

pub struct AppState {
    pub sessions: Arc<dyn SessionStore>,
    pub provider: Option<ProviderClient>,
    pub gate: ProviderGate,
    pub prompts: Prompts,
}

impl AppState {
    /// Build state from env: load config, init provider client, wire the
    /// default in-memory session store.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let prompts = load_tutor_config_from_env()
            .map(|c| c.prompts)
            .unwrap_or_default();

        let provider = ProviderClient::from_env();
        match &provider {
            Some(p) => {
                info!(target: "tutorforge_backend", base_url = %p.base_url, fast_model = %p.fast_model, strong_model = %p.strong_model, "Provider enabled.");
            }
            None => {
                info!(target: "tutorforge_backend", "Provider disabled (no OPENAI_API_KEY). Using fallback content only.");
            }
        }

        Self::with_store(Arc::new(InMemorySessionStore::new()), provider, prompts)
    }

    /// Assemble state around an explicit session store (tests inject their
    /// own here).
    pub fn with_store(
        sessions: Arc<dyn SessionStore>,
        provider: Option<ProviderClient>,
        prompts: Prompts,
    ) -> Self {
        Self { sessions, provider, gate: ProviderGate::new(), prompts }
    }

    /// Resolve the session for a request, creating one when the client
    /// sent no id or an id we no longer hold. Returns the effective id.
    #[instrument(level = "debug", skip(self))]
    pub fn ensure_session(&self, requested: Option<&str>) -> String {
        if let Some(id) = requested {
            if self.sessions.get(id).is_some() {
                return id.to_string();
            }
        }
        let id = requested
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        self.sessions.put(LearnerSession::new(id.clone()));
        info!(target: "tutorforge_backend", session_id = %id, "Created learner session");
        id
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_state() -> AppState {
        AppState::with_store(Arc::new(InMemorySessionStore::new()), None, Prompts::default())
    }

    #[test]
    fn ensure_session_creates_and_reuses() {
        let state = bare_state();
        let id = state.ensure_session(None);
        assert_eq!(state.sessions.len(), 1);

        let same = state.ensure_session(Some(&id));
        assert_eq!(same, id);
        assert_eq!(state.sessions.len(), 1);

        let other = state.ensure_session(Some("client-chosen"));
        assert_eq!(other, "client-chosen");
        assert_eq!(state.sessions.len(), 2);
    }
}
