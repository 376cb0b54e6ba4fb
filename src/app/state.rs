use super::{ComponentState, MonitorApp};
use std::collections::HashMap;
use tracing::{debug, warn};

impl MonitorApp {
    pub async fn set_component_state(&self, component: &str, state: ComponentState) {
        let previous = self
            .component_states
            .lock()
            .await
            .insert(component.to_string(), state);

        if state == ComponentState::Failed && previous != Some(ComponentState::Failed) {
            warn!("Component '{}' failed", component);
        } else {
            debug!("Component '{}' state changed to: {}", component, state);
        }
    }

    pub async fn get_component_state(&self, component: &str) -> Option<ComponentState> {
        self.component_states.lock().await.get(component).copied()
    }

    pub async fn get_all_component_states(&self) -> HashMap<String, ComponentState> {
        self.component_states.lock().await.clone()
    }

    /// One-line `name=state` summary sorted by component name, for logs
    pub async fn component_summary(&self) -> String {
        let states = self.component_states.lock().await;
        let mut entries: Vec<_> = states.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        entries
            .iter()
            .map(|(name, state)| format!("{}={}", name, state))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
