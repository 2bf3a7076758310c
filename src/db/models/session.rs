use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use self::validation::{validate_notes, validate_project_name, ValidationError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Typescript,
    Javascript,
    Python,
    Java,
    Go,
    Rust,
    Cpp,
    Csharp,
    Other,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Typescript => "typescript",
            Language::Javascript => "javascript",
            Language::Python => "python",
            Language::Java => "java",
            Language::Go => "go",
            Language::Rust => "rust",
            Language::Cpp => "cpp",
            Language::Csharp => "csharp",
            Language::Other => "other",
        }
    }
}

impl FromStr for Language {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "typescript" => Ok(Language::Typescript),
            "javascript" => Ok(Language::Javascript),
            "python" => Ok(Language::Python),
            "java" => Ok(Language::Java),
            "go" => Ok(Language::Go),
            "rust" => Ok(Language::Rust),
            "cpp" => Ok(Language::Cpp),
            "csharp" => Ok(Language::Csharp),
            "other" => Ok(Language::Other),
            other => Err(ValidationError::UnknownValue {
                field: "language",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    #[default]
    Coding,
    Debugging,
    Review,
    Learning,
    Planning,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Coding => "coding",
            ActivityType::Debugging => "debugging",
            ActivityType::Review => "review",
            ActivityType::Learning => "learning",
            ActivityType::Planning => "planning",
        }
    }
}

impl FromStr for ActivityType {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "coding" => Ok(ActivityType::Coding),
            "debugging" => Ok(ActivityType::Debugging),
            "review" => Ok(ActivityType::Review),
            "learning" => Ok(ActivityType::Learning),
            "planning" => Ok(ActivityType::Planning),
            other => Err(ValidationError::UnknownValue {
                field: "activityType",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded or in-progress interval of tracked work.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub project_name: String,
    pub language: Language,
    pub activity_type: ActivityType,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating a session. Every field is optional at the wire
/// level so a missing field is reported by [`SessionCreate::validate`] rather
/// than by the JSON decoder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCreate {
    pub project_name: Option<String>,
    pub language: Option<Language>,
    pub activity_type: Option<ActivityType>,
    pub notes: Option<String>,
}

/// Validated fields shared by a new session record and the live timer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionDraft {
    pub project_name: String,
    pub language: Language,
    pub activity_type: ActivityType,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpdate {
    pub project_name: Option<String>,
    pub language: Option<Language>,
    pub activity_type: Option<ActivityType>,
    pub notes: Option<String>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_minutes: Option<u64>,
    pub is_active: Option<bool>,
}

/// A finished timer run, ready to be stored as an inactive session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionCommit {
    pub draft: SessionDraft,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub elapsed_seconds: u64,
    pub duration_minutes: u64,
}

/// Whole minutes in `seconds`, half a minute rounding up.
pub fn rounded_minutes(seconds: u64) -> u64 {
    (seconds + 30) / 60
}

fn minutes_between(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    let millis = (end - start).num_milliseconds().max(0) as u64;
    (millis + 30_000) / 60_000
}

impl SessionCreate {
    pub fn validate(self) -> Result<SessionDraft, ValidationError> {
        let project_name = self
            .project_name
            .filter(|name| !name.trim().is_empty())
            .ok_or(ValidationError::MissingField("projectName"))?;
        let language = self
            .language
            .ok_or(ValidationError::MissingField("language"))?;
        let activity_type = self
            .activity_type
            .ok_or(ValidationError::MissingField("activityType"))?;

        let draft = SessionDraft {
            project_name,
            language,
            activity_type,
            notes: self.notes,
        };
        draft.validate()?;
        Ok(draft)
    }
}

impl SessionDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_project_name(&self.project_name)?;
        if let Some(notes) = &self.notes {
            validate_notes(notes)?;
        }
        Ok(())
    }
}

impl Session {
    pub fn new(user_id: &str, draft: SessionDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            project_name: draft.project_name,
            language: draft.language,
            activity_type: draft.activity_type,
            start_time: now,
            end_time: None,
            duration_minutes: None,
            notes: draft.notes,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builds the inactive record for a finished timer run.
    pub fn from_commit(user_id: &str, commit: SessionCommit, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            project_name: commit.draft.project_name,
            language: commit.draft.language,
            activity_type: commit.draft.activity_type,
            start_time: commit.start_time,
            end_time: Some(commit.end_time),
            duration_minutes: Some(commit.duration_minutes),
            notes: commit.draft.notes,
            is_active: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merges `update` into the record. Nothing is changed when validation
    /// fails. `is_active` and `end_time` always move together.
    pub fn apply_update(
        &mut self,
        update: SessionUpdate,
        now: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        if let Some(name) = &update.project_name {
            validate_project_name(name)?;
        }
        if let Some(notes) = &update.notes {
            validate_notes(notes)?;
        }
        if let Some(end_time) = update.end_time {
            if end_time < self.start_time {
                return Err(ValidationError::EndBeforeStart);
            }
            if update.is_active == Some(true) {
                return Err(ValidationError::Conflicting("isActive", "endTime"));
            }
        }

        if let Some(name) = update.project_name {
            self.project_name = name;
        }
        if let Some(language) = update.language {
            self.language = language;
        }
        if let Some(activity_type) = update.activity_type {
            self.activity_type = activity_type;
        }
        if let Some(notes) = update.notes {
            self.notes = Some(notes);
        }

        match (update.is_active, update.end_time) {
            (Some(true), _) => {
                self.is_active = true;
                self.end_time = None;
                self.duration_minutes = None;
            }
            (_, Some(end_time)) => {
                self.is_active = false;
                self.end_time = Some(end_time);
                self.duration_minutes = Some(minutes_between(self.start_time, end_time));
            }
            (Some(false), None) if self.is_active => {
                self.is_active = false;
                self.end_time = Some(now);
                self.duration_minutes = Some(minutes_between(self.start_time, now));
            }
            _ => {}
        }

        if let Some(minutes) = update.duration_minutes {
            if !self.is_active {
                self.duration_minutes = Some(minutes);
            }
        }

        self.updated_at = now;
        Ok(())
    }

    pub fn end(&mut self, now: DateTime<Utc>) -> Result<(), ValidationError> {
        if !self.is_active {
            return Err(ValidationError::AlreadyEnded);
        }
        self.is_active = false;
        self.end_time = Some(now);
        self.duration_minutes = Some(minutes_between(self.start_time, now));
        self.updated_at = now;
        Ok(())
    }
}

/// Validation functions for session data
pub mod validation {
    use thiserror::Error;

    pub const MAX_NOTES_CHARS: usize = 500;
    pub const MAX_PROJECT_NAME_CHARS: usize = 200;

    #[derive(Debug, Clone, PartialEq, Eq, Error)]
    pub enum ValidationError {
        #[error("Missing required field: {0}")]
        MissingField(&'static str),
        #[error("projectName must not be empty")]
        EmptyProjectName,
        #[error("{field} must be at most {max} characters")]
        TooLong { field: &'static str, max: usize },
        #[error("unknown {field} '{value}'")]
        UnknownValue { field: &'static str, value: String },
        #[error("endTime must not be before startTime")]
        EndBeforeStart,
        #[error("{0} conflicts with {1}")]
        Conflicting(&'static str, &'static str),
        #[error("session has already ended")]
        AlreadyEnded,
        #[error("{field} must be between {min} and {max}")]
        OutOfRange {
            field: &'static str,
            min: u64,
            max: u64,
        },
    }

    pub fn validate_project_name(name: &str) -> Result<(), ValidationError> {
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyProjectName);
        }
        if name.chars().count() > MAX_PROJECT_NAME_CHARS {
            return Err(ValidationError::TooLong {
                field: "projectName",
                max: MAX_PROJECT_NAME_CHARS,
            });
        }
        Ok(())
    }

    pub fn validate_notes(notes: &str) -> Result<(), ValidationError> {
        if notes.chars().count() > MAX_NOTES_CHARS {
            return Err(ValidationError::TooLong {
                field: "notes",
                max: MAX_NOTES_CHARS,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn draft() -> SessionDraft {
        SessionDraft {
            project_name: "Demo".into(),
            language: Language::Python,
            activity_type: ActivityType::Coding,
            notes: None,
        }
    }

    #[test]
    fn rounded_minutes_rounds_half_up() {
        assert_eq!(rounded_minutes(0), 0);
        assert_eq!(rounded_minutes(29), 0);
        assert_eq!(rounded_minutes(60), 1);
        assert_eq!(rounded_minutes(89), 1);
        assert_eq!(rounded_minutes(90), 2);
    }

    #[test]
    fn create_without_language_is_rejected() {
        let create = SessionCreate {
            project_name: Some("Demo".into()),
            language: None,
            activity_type: Some(ActivityType::Coding),
            notes: None,
        };
        assert_eq!(
            create.validate(),
            Err(ValidationError::MissingField("language"))
        );
    }

    #[test]
    fn blank_project_name_counts_as_missing() {
        let create = SessionCreate {
            project_name: Some("   ".into()),
            language: Some(Language::Go),
            activity_type: Some(ActivityType::Review),
            notes: None,
        };
        assert_eq!(
            create.validate(),
            Err(ValidationError::MissingField("projectName"))
        );
    }

    #[test]
    fn notes_over_limit_are_rejected() {
        let create = SessionCreate {
            project_name: Some("Demo".into()),
            language: Some(Language::Rust),
            activity_type: Some(ActivityType::Learning),
            notes: Some("x".repeat(501)),
        };
        assert!(matches!(
            create.validate(),
            Err(ValidationError::TooLong { field: "notes", .. })
        ));
    }

    #[test]
    fn enums_use_lowercase_wire_names() {
        let parsed: SessionCreate = serde_json::from_str(
            r#"{"projectName":"Demo","language":"csharp","activityType":"debugging"}"#,
        )
        .unwrap();
        assert_eq!(parsed.language, Some(Language::Csharp));
        assert_eq!(parsed.activity_type, Some(ActivityType::Debugging));
        assert!(serde_json::from_str::<SessionCreate>(r#"{"language":"cobol"}"#).is_err());
        assert_eq!("cpp".parse::<Language>().unwrap(), Language::Cpp);
    }

    #[test]
    fn end_sets_all_inactive_fields_together() {
        let start = Utc::now();
        let mut session = Session::new("user_1", draft(), start);
        session.end(start + Duration::seconds(90)).unwrap();

        assert!(!session.is_active);
        assert_eq!(session.end_time, Some(start + Duration::seconds(90)));
        assert_eq!(session.duration_minutes, Some(2));
        assert_eq!(session.end(start), Err(ValidationError::AlreadyEnded));
    }

    #[test]
    fn deactivating_update_fills_end_time() {
        let start = Utc::now();
        let mut session = Session::new("user_1", draft(), start);
        let later = start + Duration::minutes(10);
        session
            .apply_update(
                SessionUpdate {
                    is_active: Some(false),
                    ..Default::default()
                },
                later,
            )
            .unwrap();

        assert!(!session.is_active);
        assert_eq!(session.end_time, Some(later));
        assert_eq!(session.duration_minutes, Some(10));
        assert_eq!(session.updated_at, later);
    }

    #[test]
    fn reactivating_update_clears_end_time() {
        let start = Utc::now();
        let mut session = Session::new("user_1", draft(), start);
        session.end(start + Duration::minutes(5)).unwrap();
        session
            .apply_update(
                SessionUpdate {
                    is_active: Some(true),
                    ..Default::default()
                },
                start + Duration::minutes(6),
            )
            .unwrap();

        assert!(session.is_active);
        assert_eq!(session.end_time, None);
        assert_eq!(session.duration_minutes, None);
    }

    #[test]
    fn invalid_update_changes_nothing() {
        let start = Utc::now();
        let mut session = Session::new("user_1", draft(), start);
        let before = session.clone();
        let result = session.apply_update(
            SessionUpdate {
                language: Some(Language::Java),
                project_name: Some(String::new()),
                ..Default::default()
            },
            start + Duration::minutes(1),
        );

        assert_eq!(result, Err(ValidationError::EmptyProjectName));
        assert_eq!(session, before);
    }
}
