//! `alias` REPL command
//!
//! Arguments are split with shell quoting rules, so
//! `alias add gs "git status --short"` works as expected.

use shellpilot_common::alias::AliasTable;

pub const USAGE: &str = "Usage: alias [add|remove|list|import|export|help]";

pub const HELP: &str = "Alias Management Commands:
  alias add <name> \"<command>\" [--description <text>]  Add new alias
  alias remove <name>                                   Remove alias
  alias list [name]                                     List all aliases or show details
  alias import <file>                                   Import aliases from JSON file
  alias export <file>                                   Export aliases to JSON file
  alias help                                            Show this help";

/// Text to print after an alias command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasReply {
    Info(String),
    Error(String),
}

impl AliasReply {
    pub fn text(&self) -> &str {
        match self {
            AliasReply::Info(t) | AliasReply::Error(t) => t,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, AliasReply::Error(_))
    }
}

/// Handle everything after the `alias` keyword
pub fn handle(args: &str, table: &mut AliasTable) -> AliasReply {
    let Some(parts) = shlex::split(args) else {
        return AliasReply::Error("Error processing alias command: unbalanced quotes".to_string());
    };
    let Some(subcommand) = parts.first() else {
        return AliasReply::Info(USAGE.to_string());
    };

    match (subcommand.to_lowercase().as_str(), &parts[1..]) {
        ("add", [name, rest @ ..]) if !rest.is_empty() => {
            let (command, description) = split_description(rest);
            if command.is_empty() {
                return AliasReply::Error(USAGE.to_string());
            }
            match table.add(name, &command, &description) {
                Ok(()) => AliasReply::Info(format!("Alias '{}' added", name)),
                Err(e) => AliasReply::Error(e.to_string()),
            }
        }
        ("remove", [name, ..]) => match table.remove(name) {
            Ok(()) => AliasReply::Info(format!("Alias '{}' removed", name)),
            Err(e) => AliasReply::Error(e.to_string()),
        },
        ("list", [name, ..]) => match table.get(name) {
            Some(alias) => AliasReply::Info(format!(
                "{}: {}\nDescription: {}\nCreated: {}\nUpdated: {}",
                name, alias.command, alias.description, alias.created_at, alias.updated_at
            )),
            None => AliasReply::Error(format!("Alias not found: '{}'", name)),
        },
        ("list", []) => {
            if table.is_empty() {
                return AliasReply::Info("No aliases defined.".to_string());
            }
            let lines: Vec<String> = table
                .list()
                .map(|(name, alias)| format!("{}: {}", name, alias.command))
                .collect();
            AliasReply::Info(lines.join("\n"))
        }
        ("import", [path, ..]) => match table.import(path) {
            Ok(report) => {
                let mut text = format!("Imported {} alias(es)", report.count());
                for rejected in &report.rejected {
                    text.push_str(&format!("\n  skipped {}: {}", rejected.name, rejected.reason));
                }
                AliasReply::Info(text)
            }
            Err(e) => AliasReply::Error(format!("Import error: {}", e)),
        },
        ("export", [path, ..]) => match table.export(path) {
            Ok(()) => AliasReply::Info(format!("Aliases exported to {}", path)),
            Err(e) => AliasReply::Error(format!("Export failed: {}", e)),
        },
        ("help", _) => AliasReply::Info(HELP.to_string()),
        _ => AliasReply::Error(
            "Invalid alias command: use 'alias help' for valid commands".to_string(),
        ),
    }
}

/// Split `cmd words... --description text...` into command and description
fn split_description(rest: &[String]) -> (String, String) {
    match rest.iter().position(|p| p == "--description" || p == "-d") {
        Some(idx) => (rest[..idx].join(" "), rest[idx + 1..].join(" ")),
        None => (rest.join(" "), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_add_quoted_and_list() {
        let mut table = AliasTable::in_memory();
        let reply = handle("add gs \"git status --short\"", &mut table);
        assert_eq!(reply, AliasReply::Info("Alias 'gs' added".to_string()));
        assert_eq!(table.get("gs").unwrap().command, "git status --short");

        let list = handle("list", &mut table);
        assert_eq!(list.text(), "gs: git status --short");
    }

    #[test]
    fn test_add_with_description() {
        let mut table = AliasTable::in_memory();
        handle("add ll ls -la --description long listing", &mut table);
        let alias = table.get("ll").unwrap();
        assert_eq!(alias.command, "ls -la");
        assert_eq!(alias.description, "long listing");
        assert!(handle("list ll", &mut table).text().contains("Description: long listing"));
    }

    #[test]
    fn test_validation_errors_are_inline() {
        let mut table = AliasTable::in_memory();
        assert!(handle("add 9bad ls", &mut table).is_error());
        assert!(handle("add nuke \"rm -rf /\"", &mut table).is_error());
        assert!(handle("remove ghost", &mut table).is_error());
        assert!(handle("list ghost", &mut table).is_error());
        assert!(table.is_empty());
    }

    #[test]
    fn test_usage_and_help() {
        let mut table = AliasTable::in_memory();
        assert_eq!(handle("", &mut table).text(), USAGE);
        assert_eq!(handle("help", &mut table).text(), HELP);
        assert!(handle("frobnicate", &mut table).is_error());
        assert!(handle("add onlyname", &mut table).is_error());
        assert!(handle("add x \"unterminated", &mut table).is_error());
    }

    #[test]
    fn test_export_then_import() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("aliases.json");
        let file = file.to_str().unwrap();

        let mut table = AliasTable::in_memory();
        handle("add gs \"git status\"", &mut table);
        assert!(!handle(&format!("export {}", file), &mut table).is_error());

        let mut other = AliasTable::in_memory();
        let reply = handle(&format!("import {}", file), &mut other);
        assert_eq!(reply.text(), "Imported 1 alias(es)");
        assert_eq!(other.get("gs").unwrap().command, "git status");
    }

    #[test]
    fn test_import_missing_file() {
        let mut table = AliasTable::in_memory();
        let reply = handle("import /no/such/aliases.json", &mut table);
        assert!(reply.is_error());
        assert!(reply.text().starts_with("Import error"));
    }
}
