use serde::Serialize;

use crate::models::{AppState, Task};
use crate::progression::due_tasks;

pub const DEFAULT_REMINDER_BODY: &str = "Hora da sua atividade!";

/// Delivers reminders to the user.
///
/// The terminal implements this with a bell on stderr; other front ends can
/// plug in desktop or push notifications.
pub trait Notifier: Send + Sync {
    /// Ask for permission to show notifications. Returns whether it was granted.
    fn request_permission(&self) -> bool;
    fn send(&self, title: &str, body: &str);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reminder {
    pub title: String,
    pub body: String,
}

impl Reminder {
    #[must_use]
    pub fn for_task(task: &Task) -> Self {
        let body = if task.description.trim().is_empty() {
            DEFAULT_REMINDER_BODY.to_string()
        } else {
            task.description.clone()
        };
        Self {
            title: format!("ResetLiving: {}", task.title),
            body,
        }
    }
}

/// Fires due-task reminders at most once per clock minute.
#[derive(Debug, Default)]
pub struct ReminderGate {
    last_fired: Option<String>,
}

impl ReminderGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reminders for tasks due at `now_hhmm`, unless this minute already fired.
    pub fn poll(&mut self, state: &AppState, now_hhmm: &str) -> Vec<Reminder> {
        if !state.has_onboarded || self.last_fired.as_deref() == Some(now_hhmm) {
            return Vec::new();
        }
        let reminders: Vec<Reminder> = due_tasks(state, now_hhmm)
            .into_iter()
            .map(Reminder::for_task)
            .collect();
        if !reminders.is_empty() {
            self.last_fired = Some(now_hhmm.to_string());
        }
        reminders
    }

    /// Poll and hand every reminder to `notifier`. Returns how many were sent.
    pub fn dispatch(&mut self, state: &AppState, now_hhmm: &str, notifier: &dyn Notifier) -> usize {
        let reminders = self.poll(state, now_hhmm);
        for r in &reminders {
            notifier.send(&r.title, &r.body);
        }
        reminders.len()
    }
}
