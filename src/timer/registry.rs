use std::{collections::HashMap, sync::Arc};

use log::{error, info, warn};
use tokio::sync::Mutex;

use crate::breaks::BreakState;
use crate::sessions::SessionService;
use crate::settings::PreferencesStore;

use super::{ControllerOptions, TimerController};

/// Lazily creates one [`TimerController`] per user.
pub struct TimerRegistry {
    controllers: Mutex<HashMap<String, TimerController>>,
    service: SessionService,
    prefs: Arc<PreferencesStore>,
    options: ControllerOptions,
}

impl TimerRegistry {
    pub fn new(
        service: SessionService,
        prefs: Arc<PreferencesStore>,
        options: ControllerOptions,
    ) -> Self {
        Self {
            controllers: Mutex::new(HashMap::new()),
            service,
            prefs,
            options,
        }
    }

    pub fn preferences(&self) -> &PreferencesStore {
        &self.prefs
    }

    /// The caller's controller, created on first use with the user's saved
    /// break preferences.
    pub async fn controller(&self, user_id: &str) -> TimerController {
        let mut controllers = self.controllers.lock().await;
        if let Some(controller) = controllers.get(user_id) {
            return controller.clone();
        }

        let prefs = self.prefs.get(user_id).unwrap_or_else(|err| {
            warn!("Using default break preferences for {user_id}: {err:#}");
            Default::default()
        });
        let controller = TimerController::new(
            user_id,
            self.service.clone(),
            BreakState::from_preferences(prefs),
            self.options,
        );
        controllers.insert(user_id.to_string(), controller.clone());
        info!("Created timer controller for user {user_id}");
        controller
    }

    /// Stops every ticker. Commits still queued at this point are lost.
    pub async fn shutdown(&self) {
        let controllers: Vec<TimerController> =
            self.controllers.lock().await.values().cloned().collect();
        for controller in controllers {
            controller.shutdown().await;
            let pending = controller.flush_pending().await;
            if pending > 0 {
                error!(
                    "Discarding {pending} unsaved session(s) for user {} on shutdown",
                    controller.user_id()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breaks::{BreakPreferences, PomodoroPreset};
    use crate::db::Database;

    #[tokio::test]
    async fn controllers_are_per_user_and_reused() {
        let prefs = Arc::new(PreferencesStore::in_memory());
        prefs
            .update(
                "deep",
                BreakPreferences {
                    pomodoro_interval: 90,
                    pomodoro_preset: PomodoroPreset::DeepWork,
                    reminders_enabled: true,
                },
            )
            .unwrap();
        let service = SessionService::new(Arc::new(Database::open_in_memory().unwrap()));
        let registry = TimerRegistry::new(
            service,
            prefs,
            ControllerOptions {
                tick_interval: None,
                ..Default::default()
            },
        );

        let deep = registry.controller("deep").await;
        assert_eq!(deep.get_breaks().await.pomodoro_interval, 90);
        let other = registry.controller("other").await;
        assert_eq!(other.get_breaks().await.pomodoro_interval, 25);

        deep.start_break().await.unwrap();
        let again = registry.controller("deep").await;
        assert!(again.get_breaks().await.is_break_active);
        assert!(!other.get_breaks().await.is_break_active);
        registry.shutdown().await;
    }
}
