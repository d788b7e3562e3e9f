//! Console message rendering.

/// Emoji-prefixed console lines. Informational output goes to stdout,
/// warnings and errors to stderr so piped credential output stays clean.
pub struct ConsoleDisplay;

impl Default for ConsoleDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleDisplay {
    pub fn new() -> Self {
        Self
    }

    pub fn info(&self, message: &str) {
        println!("ℹ️  {message}");
    }

    pub fn warning(&self, message: &str) {
        eprintln!("⚠️  {message}");
    }

    pub fn error(&self, message: &str) {
        eprintln!("❌ {message}");
    }

    pub fn progress(&self, message: &str) {
        println!("🔄 {message}");
    }

    pub fn success(&self, message: &str) {
        println!("✅ {message}");
    }
}
