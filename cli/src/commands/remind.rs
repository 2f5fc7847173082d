use std::time::Duration;

use anyhow::{Result, bail};
use chrono::Local;
use serde_json::json;

use resetliving_core::reminders::{Notifier, ReminderGate};
use resetliving_core::service::WellnessService;

const CHECK_INTERVAL: Duration = Duration::from_secs(10);

/// Run one schedule check at the current local time.
fn check_now(svc: &WellnessService, gate: &mut ReminderGate, notifier: &dyn Notifier) -> Result<usize> {
    let now = Local::now();
    let state = svc.state(now.date_naive())?;
    let hhmm = now.format("%H:%M").to_string();
    let sent = gate.dispatch(&state, &hhmm, notifier);
    if sent > 0 {
        log::debug!("sent {sent} reminder(s) for {hhmm}");
    }
    Ok(sent)
}

/// Watch the schedule and notify when a task is due, until Ctrl-C.
pub(crate) async fn cmd_remind(svc: &WellnessService, notifier: &dyn Notifier) -> Result<()> {
    if !svc.notifications_enabled()? {
        if !notifier.request_permission() {
            bail!("Notifications are not available here. Run `resetliving remind` from a terminal");
        }
        svc.set_notifications_enabled(true)?;
    }
    if !svc.state(Local::now().date_naive())?.has_onboarded {
        bail!("Complete onboarding first (resetliving onboard)");
    }

    eprintln!("Watching today's schedule. Press Ctrl-C to stop.");
    let mut gate = ReminderGate::new();
    let mut ticker = tokio::time::interval(CHECK_INTERVAL);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                check_now(svc, &mut gate, notifier)?;
            }
            _ = &mut ctrl_c => {
                eprintln!("Stopped watching.");
                break;
            }
        }
    }
    Ok(())
}

pub(crate) fn cmd_notify_enable(
    svc: &WellnessService,
    notifier: &dyn Notifier,
    json: bool,
) -> Result<()> {
    let granted = notifier.request_permission();
    svc.set_notifications_enabled(granted)?;
    if json {
        println!("{}", json!({ "notifications": granted }));
    } else if granted {
        println!("Notifications enabled. Run `resetliving remind` to get reminders.");
        notifier.send("ResetLiving", "Notificações ativadas!");
    } else {
        bail!("Notification permission denied: stderr is not a terminal");
    }
    Ok(())
}

pub(crate) fn cmd_notify_disable(svc: &WellnessService, json: bool) -> Result<()> {
    svc.set_notifications_enabled(false)?;
    if json {
        println!("{}", json!({ "notifications": false }));
    } else {
        println!("Notifications disabled");
    }
    Ok(())
}

pub(crate) fn cmd_notify_status(svc: &WellnessService, json: bool) -> Result<()> {
    let enabled = svc.notifications_enabled()?;
    if json {
        println!("{}", json!({ "notifications": enabled }));
    } else {
        println!("Notifications: {}", if enabled { "enabled" } else { "disabled" });
    }
    Ok(())
}
