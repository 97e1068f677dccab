use std::io::{self, BufRead, Write};
use tracing::warn;

/// Blocking wait for a human to clear a bot-detection interstitial.
pub trait SecurityCheck {
    fn wait_for_human(&self, context: &str);
}

/// Pauses until Enter is pressed on the controlling terminal. No timeout.
pub struct ConsoleSecurityCheck;

impl SecurityCheck for ConsoleSecurityCheck {
    fn wait_for_human(&self, context: &str) {
        warn!(context, "Security check detected, waiting for manual resolution");
        print!("Solve the security check in the browser, then press Enter to continue... ");
        let _ = io::stdout().flush();
        let mut line = String::new();
        let _ = io::stdin().lock().read_line(&mut line);
    }
}

/// Returns immediately; used when nobody is at the terminal and in tests.
pub struct NoopSecurityCheck;

impl SecurityCheck for NoopSecurityCheck {
    fn wait_for_human(&self, _context: &str) {}
}
