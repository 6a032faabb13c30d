//! Command proposals - candidate commands awaiting the confirmation workflow

use crate::risk::{classify, Classification, RiskTag};
use serde::{Deserialize, Serialize};

/// Where a proposal came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceRole {
    /// Typed by the user with `!`
    Direct,
    /// Produced by the command executor role
    Translated,
    /// Direct input whose first token was an alias
    Alias,
    /// Fix suggested after a failed command
    DiagnosticSuggestion,
}

impl SourceRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceRole::Direct => "direct",
            SourceRole::Translated => "translated",
            SourceRole::Alias => "alias",
            SourceRole::DiagnosticSuggestion => "diagnostic",
        }
    }
}

/// Immutable candidate command, consumed once by the workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandProposal {
    raw_text: String,
    risk_tag: RiskTag,
    source_role: SourceRole,
    denylist_hit: Option<&'static str>,
}

impl CommandProposal {
    /// Proposal from a model reply; the danger marker decides the tier
    pub fn from_model(reply: &str, source_role: SourceRole) -> Self {
        Self::from_classification(classify(reply), source_role)
    }

    pub fn from_classification(classification: Classification, source_role: SourceRole) -> Self {
        Self {
            risk_tag: classification.risk_tag(),
            denylist_hit: classification.denylist_hit,
            raw_text: classification.command,
            source_role,
        }
    }

    /// User-typed command that runs without confirmation
    pub fn direct(command: &str, used_alias: bool) -> Self {
        Self {
            raw_text: command.trim().to_string(),
            risk_tag: RiskTag::Normal,
            source_role: if used_alias {
                SourceRole::Alias
            } else {
                SourceRole::Direct
            },
            denylist_hit: None,
        }
    }

    /// Command text with any marker already stripped
    pub fn command(&self) -> &str {
        &self.raw_text
    }

    pub fn risk_tag(&self) -> RiskTag {
        self.risk_tag
    }

    pub fn source_role(&self) -> SourceRole {
        self.source_role
    }

    pub fn denylist_hit(&self) -> Option<&'static str> {
        self.denylist_hit
    }

    pub fn is_dangerous(&self) -> bool {
        self.risk_tag == RiskTag::ConfirmDestructive
    }
}
