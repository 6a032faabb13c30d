//! Risk Classifier - danger marker detection and the command denylist
//!
//! The command executor role is told to prefix destructive commands with
//! `CONFIRM:`. The classifier only detects and strips that marker; it does
//! not verify the marker against the command text. A model that forgets the
//! marker gets the ordinary single confirmation. The denylist check is
//! reported alongside as an advisory, it never changes the risk tag.

use serde::{Deserialize, Serialize};

/// Marker the model puts in front of destructive commands
pub const DANGER_MARKER: &str = "CONFIRM:";

/// Prefix the model uses to refuse a request
pub const REFUSAL_MARKER: &str = "SafetyError:";

/// Literal dangerous substrings (plain containment, not a parser)
pub const DENYLIST: &[&str] = &[
    "rm -rf /",
    "chmod -R 777 /",
    ":(){:|:&};:",
    "mkfs",
    "dd if=/dev/random",
];

/// First denylisted substring contained in `command`, if any
pub fn denylist_hit(command: &str) -> Option<&'static str> {
    DENYLIST.iter().copied().find(|pattern| command.contains(pattern))
}

/// Confirmation tier a proposal requires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskTag {
    /// Runs without confirmation (direct input, alias expansion)
    Normal,
    /// Single yes/no confirmation
    Confirm,
    /// Confirmation, second warning, and exact re-type
    ConfirmDestructive,
}

impl RiskTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTag::Normal => "normal",
            RiskTag::Confirm => "confirm",
            RiskTag::ConfirmDestructive => "destructive",
        }
    }

    pub fn requires_confirmation(&self) -> bool {
        !matches!(self, RiskTag::Normal)
    }
}

/// Result of inspecting a model reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Command text with the marker removed
    pub command: String,
    /// Whether the model flagged the command destructive
    pub dangerous: bool,
    /// Advisory denylist match on the stripped command
    pub denylist_hit: Option<&'static str>,
}

impl Classification {
    /// Risk tag for a model-produced command
    pub fn risk_tag(&self) -> RiskTag {
        if self.dangerous {
            RiskTag::ConfirmDestructive
        } else {
            RiskTag::Confirm
        }
    }
}

/// Detect and strip the danger marker
pub fn classify(text: &str) -> Classification {
    let trimmed = text.trim();
    let (command, dangerous) = match trimmed.strip_prefix(DANGER_MARKER) {
        Some(rest) => (rest.trim().to_string(), true),
        None => (trimmed.to_string(), false),
    };

    Classification {
        denylist_hit: denylist_hit(&command),
        command,
        dangerous,
    }
}

/// Reason text when the model refused the request
pub fn refusal_reason(text: &str) -> Option<String> {
    text.trim()
        .strip_prefix(REFUSAL_MARKER)
        .map(|reason| reason.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_stripped_and_flagged() {
        let c = classify("CONFIRM:rm -rf /tmp/*");
        assert_eq!(c.command, "rm -rf /tmp/*");
        assert!(c.dangerous);
        assert_eq!(c.risk_tag(), RiskTag::ConfirmDestructive);
    }

    #[test]
    fn test_marker_with_space() {
        let c = classify("  CONFIRM: apt remove vim \n");
        assert_eq!(c.command, "apt remove vim");
        assert!(c.dangerous);
    }

    #[test]
    fn test_plain_command_needs_single_confirmation() {
        let c = classify("ls -la");
        assert_eq!(c.command, "ls -la");
        assert!(!c.dangerous);
        assert_eq!(c.risk_tag(), RiskTag::Confirm);
        assert_eq!(c.denylist_hit, None);
    }

    #[test]
    fn test_marker_only_recognised_as_prefix() {
        let c = classify("echo CONFIRM:done");
        assert!(!c.dangerous);
        assert_eq!(c.command, "echo CONFIRM:done");
    }

    #[test]
    fn test_denylist_is_advisory() {
        // No marker: stays a single confirmation even though it is denylisted
        let c = classify("sudo mkfs.ext4 /dev/sdb1");
        assert_eq!(c.denylist_hit, Some("mkfs"));
        assert_eq!(c.risk_tag(), RiskTag::Confirm);
    }

    #[test]
    fn test_denylist_patterns() {
        assert_eq!(denylist_hit("rm -rf / --no-preserve-root"), Some("rm -rf /"));
        assert_eq!(denylist_hit(":(){:|:&};:"), Some(":(){:|:&};:"));
        assert_eq!(denylist_hit("dd if=/dev/random of=/dev/sda"), Some("dd if=/dev/random"));
        assert_eq!(denylist_hit("chmod -R 777 /"), Some("chmod -R 777 /"));
        assert_eq!(denylist_hit("rm -r ./build"), None);
    }

    #[test]
    fn test_refusal() {
        assert_eq!(
            refusal_reason("SafetyError: would wipe the disk").as_deref(),
            Some("would wipe the disk")
        );
        assert_eq!(refusal_reason("ls"), None);
    }

    #[test]
    fn test_normal_tag_skips_confirmation() {
        assert!(!RiskTag::Normal.requires_confirmation());
        assert!(RiskTag::Confirm.requires_confirmation());
        assert!(RiskTag::ConfirmDestructive.requires_confirmation());
    }
}
