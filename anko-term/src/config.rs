//! Session configuration and persistence.
//!
//! One JSON object per session; a session file is an ordered array of
//! them. Reads are defensive: unknown fields are ignored, missing or
//! nonsensical values fall back to defaults, and a malformed document
//! yields defaults instead of an error. Only writing can fail.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use anko_pty::session::default_shell;
use anko_pty::PtyConfig;

pub const DEFAULT_ROWS: u16 = 25;
pub const DEFAULT_COLS: u16 = 80;
pub const DEFAULT_SCROLLBACK: usize = 10000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub shell: String,
    /// Command-line tail after the shell path, whitespace separated.
    pub args: String,
    /// Initial working directory; empty means inherit.
    pub working_dir: String,
    pub title: String,
    pub profile_name: String,
    pub rows: u16,
    pub cols: u16,
    pub scrollback_lines: usize,
    pub tab_index: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            shell: default_shell(),
            args: String::new(),
            working_dir: String::new(),
            title: String::new(),
            profile_name: String::new(),
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
            scrollback_lines: DEFAULT_SCROLLBACK,
            tab_index: 0,
        }
    }
}

impl SessionConfig {
    /// Clamp nonsense from hand-edited or stale files back to defaults.
    fn sanitize(mut self) -> Self {
        if self.shell.is_empty() {
            self.shell = default_shell();
        }
        if self.rows == 0 {
            self.rows = DEFAULT_ROWS;
        }
        if self.cols == 0 {
            self.cols = DEFAULT_COLS;
        }
        if self.scrollback_lines == 0 {
            self.scrollback_lines = DEFAULT_SCROLLBACK;
        }
        self
    }

    /// Parse one session object. Never fails; a broken document is a
    /// default session.
    pub fn from_json(json: &str) -> Self {
        serde_json::from_str::<SessionConfig>(json)
            .unwrap_or_default()
            .sanitize()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub(crate) fn pty_config(&self) -> PtyConfig {
        PtyConfig {
            shell: self.shell.clone(),
            args: self.args.split_whitespace().map(str::to_string).collect(),
            working_dir: if self.working_dir.is_empty() {
                None
            } else {
                Some(self.working_dir.clone().into())
            },
            rows: self.rows,
            cols: self.cols,
        }
    }
}

/// Write every open session to `path` as a JSON array.
pub fn save_sessions(path: &Path, sessions: &[SessionConfig]) -> io::Result<()> {
    let json = serde_json::to_string_pretty(sessions)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    fs::write(path, json)
}

/// Read a session file. Missing or unreadable files and malformed JSON
/// all come back as "no sessions".
pub fn load_sessions(path: &Path) -> Vec<SessionConfig> {
    let Ok(content) = fs::read_to_string(path) else {
        return Vec::new();
    };
    match serde_json::from_str::<Vec<SessionConfig>>(&content) {
        Ok(sessions) => sessions.into_iter().map(SessionConfig::sanitize).collect(),
        Err(e) => {
            log::warn!("ignoring malformed session file {}: {e}", path.display());
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_preserves_fields() {
        let config = SessionConfig {
            shell: "/bin/zsh".into(),
            args: "-l -i".into(),
            working_dir: "/tmp".into(),
            title: "work".into(),
            profile_name: "default".into(),
            rows: 50,
            cols: 132,
            scrollback_lines: 5000,
            tab_index: 2,
        };
        let json = config.to_json().unwrap();
        assert_eq!(SessionConfig::from_json(&json), config);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config = SessionConfig::from_json(r#"{"shell": "/bin/bash"}"#);
        assert_eq!(config.shell, "/bin/bash");
        assert_eq!(config.rows, DEFAULT_ROWS);
        assert_eq!(config.cols, DEFAULT_COLS);
        assert_eq!(config.scrollback_lines, DEFAULT_SCROLLBACK);
        assert_eq!(config.tab_index, 0);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let config =
            SessionConfig::from_json(r#"{"rows": 30, "future_flag": true, "theme": "dark"}"#);
        assert_eq!(config.rows, 30);
    }

    #[test]
    fn malformed_json_yields_defaults() {
        let config = SessionConfig::from_json("{nope");
        assert!(!config.shell.is_empty());
        assert_eq!(config.rows, DEFAULT_ROWS);
    }

    #[test]
    fn zero_geometry_is_repaired() {
        let config = SessionConfig::from_json(r#"{"rows": 0, "cols": 0, "scrollback_lines": 0}"#);
        assert_eq!(config.rows, DEFAULT_ROWS);
        assert_eq!(config.cols, DEFAULT_COLS);
        assert_eq!(config.scrollback_lines, DEFAULT_SCROLLBACK);
    }

    #[test]
    fn session_file_roundtrip() {
        let dir = std::env::temp_dir().join(format!("anko-sessions-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sessions.json");

        let sessions = vec![
            SessionConfig {
                title: "first".into(),
                tab_index: 0,
                ..Default::default()
            },
            SessionConfig {
                title: "second".into(),
                tab_index: 1,
                rows: 40,
                ..Default::default()
            },
        ];
        save_sessions(&path, &sessions).unwrap();

        let loaded = load_sessions(&path);
        assert_eq!(loaded, sessions);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_is_empty() {
        assert!(load_sessions(Path::new("/nonexistent/sessions.json")).is_empty());
    }

    #[test]
    fn args_split_for_spawn() {
        let config = SessionConfig {
            shell: "/bin/sh".into(),
            args: "-c ls".into(),
            ..Default::default()
        };
        let pty = config.pty_config();
        assert_eq!(pty.args, vec!["-c".to_string(), "ls".to_string()]);
        assert!(pty.working_dir.is_none());
    }
}
