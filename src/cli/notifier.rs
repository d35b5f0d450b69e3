use std::io::Write;

use crate::model::settings::Permission;
use crate::ops::notify::Notifier;

/// Shows reminders on the terminal. A terminal can always print, so
/// permission is always granted.
#[derive(Debug, Default)]
pub struct TerminalNotifier {
    /// Ring the terminal bell with each reminder
    pub bell: bool,
    pub shown: usize,
}

impl TerminalNotifier {
    pub fn new(bell: bool) -> Self {
        TerminalNotifier { bell, shown: 0 }
    }

    /// Ring the bell on stderr for a task action, when sound is on.
    pub fn chime(&self) {
        let _ = self.chime_to(&mut std::io::stderr().lock());
    }

    pub fn chime_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        if self.bell {
            out.write_all(b"\x07")?;
            out.flush()?;
        }
        Ok(())
    }
}

impl Notifier for TerminalNotifier {
    fn permission(&self) -> Permission {
        Permission::Granted
    }

    fn request_permission(&mut self) -> Permission {
        Permission::Granted
    }

    fn display(&mut self, title: &str, body: &str) {
        let mut out = std::io::stdout().lock();
        let bell = if self.bell { "\x07" } else { "" };
        let _ = writeln!(out, "{}{}: {}", bell, title, body);
        let _ = out.flush();
        self.shown += 1;
    }
}
