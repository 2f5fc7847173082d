use std::io::{IsTerminal, Write};

use resetliving_core::reminders::Notifier;

/// Rings the terminal bell and prints the reminder on stderr.
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn request_permission(&self) -> bool {
        std::io::stderr().is_terminal()
    }

    fn send(&self, title: &str, body: &str) {
        let now = chrono::Local::now().format("%H:%M");
        let mut err = std::io::stderr().lock();
        let _ = writeln!(err, "\x07[{now}] {title}: {body}");
        let _ = err.flush();
    }
}
