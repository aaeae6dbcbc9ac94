//! Client-side wizard state. Held in memory only.

use serde::{Deserialize, Serialize};

/// A file chosen during intake, with its contents
#[derive(Clone, PartialEq, Eq)]
pub struct FileDraft {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl FileDraft {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            mime_type: mime_type.into(),
            bytes,
        }
    }
}

impl std::fmt::Debug for FileDraft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileDraft")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("mime_type", &self.mime_type)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WizardStep {
    #[default]
    Intake,
    Verify,
    Success,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionDraft {
    pub email: String,
    pub file: Option<FileDraft>,
}

impl SessionDraft {
    pub fn is_empty(&self) -> bool {
        self.email.is_empty() && self.file.is_none()
    }
}

/// What the success screen reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    pub file_name: String,
    pub file_size_bytes: u64,
}
