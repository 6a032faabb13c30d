//! Additional data for the command executor role
//!
//! When a request talks about file contents and names an existing file, the
//! file is attached so the model can use real names and content.

use std::collections::BTreeMap;
use std::path::Path;

/// Words that suggest the request is about file contents
const FILE_KEYWORDS: &[&str] = &["file", "content", "read", "merge"];

/// Largest file attached to a prompt
const MAX_FILE_BYTES: u64 = 16 * 1024;

/// Collect extra key/value data for a natural language request
pub fn gather(user_input: &str) -> BTreeMap<String, String> {
    let mut data = BTreeMap::new();
    let lower = user_input.to_lowercase();
    if !FILE_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return data;
    }

    for word in user_input.split_whitespace() {
        let word = word.trim_matches(|c| c == '"' || c == '\'' || c == ',');
        let path = Path::new(word);
        if !path.is_file() {
            continue;
        }
        let Ok(meta) = path.metadata() else {
            continue;
        };
        if meta.len() > MAX_FILE_BYTES {
            data.insert(
                "file_content".to_string(),
                format!("(file too large to attach: {} bytes)", meta.len()),
            );
        } else if let Ok(content) = std::fs::read_to_string(path) {
            data.insert("file_content".to_string(), content);
        } else {
            continue;
        }
        data.insert("target_file".to_string(), word.to_string());
        break;
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_no_keywords_no_data() {
        assert!(gather("list processes").is_empty());
    }

    #[test]
    fn test_attaches_named_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, "alpha\nbeta\n").unwrap();

        let data = gather(&format!("read the file {}", file.display()));
        assert_eq!(data.get("file_content").map(String::as_str), Some("alpha\nbeta\n"));
        assert_eq!(
            data.get("target_file").map(String::as_str),
            Some(file.to_str().unwrap())
        );
    }

    #[test]
    fn test_keyword_without_existing_file() {
        assert!(gather("read file does-not-exist.txt").is_empty());
    }

    #[test]
    fn test_large_file_not_inlined() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("big.log");
        std::fs::write(&file, vec![b'x'; (MAX_FILE_BYTES + 1) as usize]).unwrap();

        let data = gather(&format!("show content of {}", file.display()));
        assert!(data["file_content"].starts_with("(file too large"));
    }
}
