//! Alias Table - short names for command templates
//!
//! Aliases are stored as `{ "aliases": { name: { command, description,
//! created_at, updated_at } } }` and written through on every mutation.
//! Expansion is a single textual pass: the template of an alias that names
//! another alias is NOT expanded again. Chained aliases are unsupported.

use crate::error::AliasError;
use crate::paths::expand_tilde;
use crate::risk::denylist_hit;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{info, warn};

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_]\w*$").expect("alias name pattern is valid"))
}

fn now() -> String {
    chrono::Local::now().to_rfc3339()
}

/// One stored alias
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alias {
    pub command: String,
    #[serde(default)]
    pub description: String,
    /// ISO 8601 creation time
    #[serde(default = "now")]
    pub created_at: String,
    /// ISO 8601 last update time
    #[serde(default = "now")]
    pub updated_at: String,
}

/// On-disk alias document
#[derive(Debug, Default, Serialize, Deserialize)]
struct AliasDocument {
    #[serde(default)]
    aliases: BTreeMap<String, Alias>,
}

/// Import input; entries stay raw so one bad entry cannot sink the batch
#[derive(Debug, Default, Deserialize)]
struct RawAliasDocument {
    #[serde(default)]
    aliases: BTreeMap<String, serde_json::Value>,
}

/// Outcome of a single-pass expansion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    pub resolved: String,
    pub used_alias: bool,
}

/// Entry refused during import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedAlias {
    pub name: String,
    pub reason: String,
}

/// Summary of an import
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: Vec<String>,
    pub rejected: Vec<RejectedAlias>,
}

impl ImportReport {
    pub fn count(&self) -> usize {
        self.imported.len()
    }
}

/// Validate an alias name against `[A-Za-z_]\w*`
pub fn validate_name(name: &str) -> Result<(), AliasError> {
    if name_pattern().is_match(name) {
        Ok(())
    } else {
        Err(AliasError::InvalidName(name.to_string()))
    }
}

/// Validate a command template against the denylist
pub fn validate_command(name: &str, command: &str) -> Result<(), AliasError> {
    match denylist_hit(command) {
        Some(pattern) => Err(AliasError::InvalidCommand {
            name: name.to_string(),
            pattern: pattern.to_string(),
        }),
        None => Ok(()),
    }
}

/// In-memory alias mapping, optionally backed by a file
#[derive(Debug, Default)]
pub struct AliasTable {
    aliases: BTreeMap<String, Alias>,
    path: Option<PathBuf>,
}

impl AliasTable {
    /// Table without persistence
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the alias file once; an unreadable or corrupt file yields an
    /// empty table that will overwrite it on the next mutation
    pub fn open(path: &Path) -> Self {
        let aliases = match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<AliasDocument>(&content) {
                Ok(doc) => doc.aliases,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "ignoring corrupt alias file");
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };

        Self {
            aliases,
            path: Some(path.to_path_buf()),
        }
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Alias> {
        self.aliases.get(name)
    }

    /// All aliases, sorted by name
    pub fn list(&self) -> impl Iterator<Item = (&String, &Alias)> {
        self.aliases.iter()
    }

    pub fn add(&mut self, name: &str, command: &str, description: &str) -> Result<(), AliasError> {
        validate_name(name)?;
        validate_command(name, command)?;
        if self.aliases.contains_key(name) {
            return Err(AliasError::Duplicate(name.to_string()));
        }

        let stamp = now();
        let mut next = self.aliases.clone();
        next.insert(
            name.to_string(),
            Alias {
                command: command.to_string(),
                description: description.to_string(),
                created_at: stamp.clone(),
                updated_at: stamp,
            },
        );
        self.commit(next)?;
        info!(alias = name, "alias added");
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<(), AliasError> {
        let mut next = self.aliases.clone();
        if next.remove(name).is_none() {
            return Err(AliasError::NotFound(name.to_string()));
        }
        self.commit(next)?;
        info!(alias = name, "alias removed");
        Ok(())
    }

    /// Replace the first token when it names an alias
    pub fn expand(&self, input: &str) -> Expansion {
        let trimmed = input.trim();
        let (head, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim_start()),
            None => (trimmed, ""),
        };

        match self.aliases.get(head) {
            Some(alias) if !head.is_empty() => Expansion {
                resolved: format!("{} {}", alias.command, rest).trim().to_string(),
                used_alias: true,
            },
            _ => Expansion {
                resolved: input.to_string(),
                used_alias: false,
            },
        }
    }

    /// Merge aliases from a JSON document, re-validating every entry
    pub fn import(&mut self, path: &str) -> Result<ImportReport, AliasError> {
        let path = expand_tilde(path);
        if !path.is_file() {
            return Err(AliasError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let content = fs::read_to_string(&path)?;
        let doc: RawAliasDocument = serde_json::from_str(&content)?;

        let mut report = ImportReport::default();
        let mut next = self.aliases.clone();
        for (name, raw) in doc.aliases {
            match Self::validate_import_entry(&name, raw) {
                Ok(alias) => {
                    next.insert(name.clone(), alias);
                    report.imported.push(name);
                }
                Err(reason) => {
                    warn!(alias = %name, %reason, "rejected alias during import");
                    report.rejected.push(RejectedAlias { name, reason });
                }
            }
        }

        self.commit(next)?;
        Ok(report)
    }

    fn validate_import_entry(name: &str, raw: serde_json::Value) -> Result<Alias, String> {
        validate_name(name).map_err(|e| e.to_string())?;
        let alias: Alias = serde_json::from_value(raw)
            .map_err(|e| format!("Malformed alias entry '{}': {}", name, e))?;
        validate_command(name, &alias.command).map_err(|e| e.to_string())?;
        Ok(alias)
    }

    /// Write all aliases to a JSON document
    pub fn export(&self, path: &str) -> Result<(), AliasError> {
        write_document(&expand_tilde(path), &self.aliases)
    }

    /// Write `next` to the backing file, then make it live; a failed write
    /// leaves the table unchanged
    fn commit(&mut self, next: BTreeMap<String, Alias>) -> Result<(), AliasError> {
        if let Some(path) = &self.path {
            write_document(path, &next)?;
        }
        self.aliases = next;
        Ok(())
    }
}

fn write_document(path: &Path, aliases: &BTreeMap<String, Alias>) -> Result<(), AliasError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let doc = AliasDocument {
        aliases: aliases.clone(),
    };
    let json = serde_json::to_string_pretty(&doc)?;
    fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn table_with(entries: &[(&str, &str)]) -> AliasTable {
        let mut table = AliasTable::in_memory();
        for (name, command) in entries {
            table.add(name, command, "").unwrap();
        }
        table
    }

    #[test]
    fn test_invalid_names_rejected_without_mutation() {
        let mut table = table_with(&[("ll", "ls -la")]);
        for bad in ["", "1abc", "my-alias", "has space", "dot.name", "é"] {
            let err = table.add(bad, "echo hi", "").unwrap_err();
            assert!(matches!(err, AliasError::InvalidName(_)), "{bad}");
        }
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_valid_names() {
        let mut table = AliasTable::in_memory();
        for good in ["_", "a", "_private", "gs2", "Deploy_Prod"] {
            table.add(good, "echo ok", "").unwrap();
        }
        assert_eq!(table.len(), 5);
    }

    #[test]
    fn test_denylisted_command_rejected() {
        let mut table = AliasTable::in_memory();
        let err = table.add("nuke", "sudo rm -rf / --no-preserve-root", "").unwrap_err();
        assert!(matches!(err, AliasError::InvalidCommand { .. }));
        assert!(table.is_empty());
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut table = table_with(&[("ll", "ls -la")]);
        let err = table.add("ll", "ls -l", "").unwrap_err();
        assert!(matches!(err, AliasError::Duplicate(_)));
        assert_eq!(table.get("ll").unwrap().command, "ls -la");
    }

    #[test]
    fn test_remove() {
        let mut table = table_with(&[("ll", "ls -la")]);
        table.remove("ll").unwrap();
        assert!(table.is_empty());
        assert!(matches!(table.remove("ll"), Err(AliasError::NotFound(_))));
    }

    #[test]
    fn test_expand_with_arguments() {
        let table = table_with(&[("gs", "git status")]);
        let e = table.expand("gs --short");
        assert_eq!(e.resolved, "git status --short");
        assert!(e.used_alias);

        let e = table.expand("gs");
        assert_eq!(e.resolved, "git status");
    }

    #[test]
    fn test_expand_passes_through_unknown() {
        let table = table_with(&[("gs", "git status")]);
        let e = table.expand("ls -la");
        assert_eq!(e.resolved, "ls -la");
        assert!(!e.used_alias);
        assert_eq!(table.expand("").resolved, "");
    }

    #[test]
    fn test_expand_is_not_recursive() {
        let table = table_with(&[("a", "b --flag"), ("b", "echo nested")]);
        assert_eq!(table.expand("a x").resolved, "b --flag x");
    }

    #[test]
    fn test_expand_idempotent_on_non_alias_input() {
        let table = table_with(&[("gs", "git status"), ("ll", "ls -la")]);
        for input in ["ls -la", "echo gs", "cargo build --release", "  du -sh . "] {
            let once = table.expand(input).resolved;
            let twice = table.expand(&once).resolved;
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_write_through_persistence() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("aliases.json");

        let mut table = AliasTable::open(&path);
        table.add("ll", "ls -la", "long listing").unwrap();

        let reloaded = AliasTable::open(&path);
        let alias = reloaded.get("ll").unwrap();
        assert_eq!(alias.command, "ls -la");
        assert_eq!(alias.description, "long listing");

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["aliases"]["ll"]["command"], "ls -la");
        assert!(raw["aliases"]["ll"]["created_at"].is_string());
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("aliases.json");
        fs::write(&path, "{not json").unwrap();
        assert!(AliasTable::open(&path).is_empty());
    }

    #[test]
    fn test_import_partial_batch() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("import.json");
        fs::write(
            &source,
            r#"{
              "aliases": {
                "ll": {"command": "ls -la", "description": "list"},
                "wipe": {"command": "rm -rf / --no-preserve-root"},
                "bad-name": {"command": "echo hi"},
                "fork": {"command": ":(){:|:&};:"},
                "nocmd": {"description": "missing command"},
                "gs": {"command": "git status"}
              }
            }"#,
        )
        .unwrap();

        let mut table = AliasTable::in_memory();
        let report = table.import(source.to_str().unwrap()).unwrap();
        assert_eq!(report.imported, vec!["gs".to_string(), "ll".to_string()]);
        assert_eq!(report.rejected.len(), 4);
        assert!(table.get("wipe").is_none());
        assert!(table.get("fork").is_none());
        assert_eq!(table.get("ll").unwrap().description, "list");
    }

    #[test]
    fn test_import_errors() {
        let dir = TempDir::new().unwrap();
        let mut table = AliasTable::in_memory();

        let missing = dir.path().join("nope.json");
        assert!(matches!(
            table.import(missing.to_str().unwrap()),
            Err(AliasError::FileNotFound { .. })
        ));

        let garbage = dir.path().join("garbage.json");
        fs::write(&garbage, "[[[").unwrap();
        assert!(matches!(
            table.import(garbage.to_str().unwrap()),
            Err(AliasError::Parse(_))
        ));
    }

    #[test]
    fn test_export_import_roundtrip() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out.json");

        let mut table = AliasTable::in_memory();
        table.add("ll", "ls -la", "long").unwrap();
        table.add("gs", "git status", "").unwrap();
        table.add("_up", "cd ..", "parent dir").unwrap();
        table.export(out.to_str().unwrap()).unwrap();

        let mut fresh = AliasTable::in_memory();
        let report = fresh.import(out.to_str().unwrap()).unwrap();
        assert_eq!(report.count(), 3);

        let original: Vec<_> = table.list().collect();
        let restored: Vec<_> = fresh.list().collect();
        assert_eq!(original, restored);
    }

    #[test]
    fn test_failed_write_leaves_table_unchanged() {
        let dir = TempDir::new().unwrap();
        let backing = dir.path().join("aliases.json");
        let mut table = AliasTable::open(&backing);
        table.add("gs", "git status", "").unwrap();

        // A directory where the alias file should be makes every write fail
        fs::remove_file(&backing).unwrap();
        fs::create_dir(&backing).unwrap();

        assert!(matches!(table.add("ll", "ls -la", ""), Err(AliasError::Io(_))));
        assert!(table.get("ll").is_none());
        assert!(!table.expand("ll /tmp").used_alias);

        assert!(table.remove("gs").is_err());
        assert!(table.get("gs").is_some());

        let import = dir.path().join("import.json");
        fs::write(&import, r#"{"aliases": {"up": {"command": "cd .."}}}"#).unwrap();
        assert!(table.import(import.to_str().unwrap()).is_err());
        assert!(table.get("up").is_none());
        assert_eq!(table.len(), 1);
    }
}
