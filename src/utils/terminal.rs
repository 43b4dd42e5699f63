//! Terminal title updates

use std::io::{IsTerminal, Write};

/// Sets the terminal title on stderr.
///
/// Does nothing when stderr is redirected, so captured logs and JSON runs
/// never carry escape sequences.
pub fn set_terminal_title(title: &str) {
    let mut stderr = std::io::stderr();
    if !stderr.is_terminal() {
        return;
    }
    // OSC 0: icon name and window title
    let _ = write!(stderr, "\x1b]0;{title}\x07");
    let _ = stderr.flush();
}
