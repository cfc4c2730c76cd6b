//! Agent capability flags and the per-task-type requirement table

use serde::{Deserialize, Serialize};

/// Fixed capability set of an agent type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    pub can_code: bool,
    pub can_chat: bool,
    pub can_edit: bool,
    pub can_execute_shell: bool,
    pub can_read_files: bool,
    pub can_write_files: bool,
    pub can_search: bool,
    pub can_browse_web: bool,
    pub supports_streaming: bool,
    pub supports_multi_file: bool,
    pub supports_project: bool,
}

impl AgentCapabilities {
    /// Every flag set; for full-featured coding agents
    pub fn full() -> Self {
        Self {
            can_code: true,
            can_chat: true,
            can_edit: true,
            can_execute_shell: true,
            can_read_files: true,
            can_write_files: true,
            can_search: true,
            can_browse_web: true,
            supports_streaming: true,
            supports_multi_file: true,
            supports_project: true,
        }
    }

    /// Fixed requirement table: does this capability set qualify for the
    /// given task type? Unrecognized task types pass unconditionally.
    pub fn meets_requirements(&self, task_type: &str) -> bool {
        match task_type {
            "code" | "refactor" | "test" => self.can_code && self.can_write_files,
            "analyze" | "review" | "explain" => self.can_read_files,
            "debug" => self.can_code && self.can_execute_shell,
            "document" => self.can_write_files,
            "chat" => self.can_chat,
            "shell" => self.can_execute_shell,
            _ => true,
        }
    }
}
