//! uid → user name resolution from `/etc/passwd`.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::types::UNKNOWN_USER;

pub const DEFAULT_PASSWD_PATH: &str = "/etc/passwd";

/// Name lookup table, loaded once per batch.
#[derive(Debug, Clone, Default)]
pub struct UserTable {
    names: HashMap<u32, String>,
}

impl UserTable {
    /// Load the system passwd file. An unreadable file yields an empty table.
    pub fn load() -> Self {
        Self::load_from(Path::new(DEFAULT_PASSWD_PATH))
    }

    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => Self::from_passwd_content(&content),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "passwd unreadable");
                Self::default()
            }
        }
    }

    /// Parse `name:x:uid:...` lines. The first entry for a uid wins.
    pub fn from_passwd_content(content: &str) -> Self {
        let mut names = HashMap::new();
        for line in content.lines() {
            if line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split(':').collect();
            if fields.len() < 3 || fields[0].is_empty() {
                continue;
            }
            if let Ok(uid) = fields[2].parse::<u32>() {
                names.entry(uid).or_insert_with(|| fields[0].to_string());
            }
        }
        Self { names }
    }

    pub fn lookup(&self, uid: u32) -> Option<&str> {
        self.names.get(&uid).map(String::as_str)
    }

    /// Display name for an optional uid.
    pub fn name_for(&self, uid: Option<u32>) -> String {
        uid.and_then(|u| self.lookup(u))
            .unwrap_or(UNKNOWN_USER)
            .to_string()
    }
}
