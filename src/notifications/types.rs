//! Notification types shared by alert channels

/// Severity of a system alert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Severity::Info => "ℹ️",
            Severity::Warning => "⚠️",
            Severity::Error => "❌",
            Severity::Critical => "🚨",
        }
    }
}

/// Discord hard limit is 2000 characters; leave headroom for the suffix
pub const MAX_MESSAGE_LEN: usize = 1900;

/// Truncate a message to the Discord limit, marking the cut
pub fn clamp_message(message: &str) -> String {
    if message.chars().count() <= MAX_MESSAGE_LEN {
        return message.to_string();
    }
    let truncated: String = message.chars().take(MAX_MESSAGE_LEN).collect();
    format!("{}... (truncated)", truncated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_message_unchanged() {
        assert_eq!(clamp_message("hello"), "hello");
    }

    #[test]
    fn test_long_message_truncated() {
        let long = "x".repeat(3000);
        let clamped = clamp_message(&long);
        assert!(clamped.chars().count() < 2000);
        assert!(clamped.ends_with("(truncated)"));
    }
}
