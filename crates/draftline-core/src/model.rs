//! Data model for the strategy composite
//!
//! A `Strategy` is the parent record. Child collections (goals, values,
//! pillars) and attachments reference it by `StrategyId`. Items that are not
//! yet committed are represented as `StagedChild` and live only in the
//! staging store.

use crate::ids::{RecordId, StagedId, StrategyId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Editable strategy fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyFields {
    /// Display name
    pub name: String,
    /// Free-text description
    pub description: String,
    /// First day covered
    pub start_date: NaiveDate,
    /// Last day covered
    pub end_date: NaiveDate,
    /// Strategic details free text
    pub strategic_details: String,
    /// Vision and mission free text
    pub vision_mission: String,
    /// Focus areas free text
    pub focus_areas: String,
}

impl StrategyFields {
    /// Create fields with a name and a date range; free-text fields empty
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            start_date,
            end_date,
            strategic_details: String::new(),
            vision_mission: String::new(),
            focus_areas: String::new(),
        }
    }

    /// Placeholder values used for a freshly created draft
    #[must_use]
    pub fn placeholder(name: impl Into<String>, today: NaiveDate) -> Self {
        Self::new(name, today, today)
    }

    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// With strategic details
    #[inline]
    #[must_use]
    pub fn with_strategic_details(mut self, details: impl Into<String>) -> Self {
        self.strategic_details = details.into();
        self
    }

    /// With vision and mission
    #[inline]
    #[must_use]
    pub fn with_vision_mission(mut self, vision_mission: impl Into<String>) -> Self {
        self.vision_mission = vision_mission.into();
        self
    }

    /// With focus areas
    #[inline]
    #[must_use]
    pub fn with_focus_areas(mut self, focus_areas: impl Into<String>) -> Self {
        self.focus_areas = focus_areas.into();
        self
    }
}

/// Update payload for a strategy
///
/// `is_draft` is `None` when the phase must not change (edit mode).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyPatch {
    /// New field values
    pub fields: StrategyFields,
    /// Optional phase flag
    pub is_draft: Option<bool>,
}

impl StrategyPatch {
    /// Patch that commits a draft
    #[inline]
    #[must_use]
    pub fn commit(fields: StrategyFields) -> Self {
        Self {
            fields,
            is_draft: Some(false),
        }
    }

    /// Patch that leaves the phase alone
    #[inline]
    #[must_use]
    pub fn fields_only(fields: StrategyFields) -> Self {
        Self {
            fields,
            is_draft: None,
        }
    }
}

/// Parent record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strategy {
    /// Server-assigned id
    pub id: StrategyId,
    /// Owning user
    pub owner: UserId,
    /// Field values
    pub fields: StrategyFields,
    /// Draft flag
    pub is_draft: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

impl Strategy {
    /// Current lifecycle phase
    #[inline]
    #[must_use]
    pub fn phase(&self) -> StrategyPhase {
        StrategyPhase::from_draft_flag(self.is_draft)
    }
}

/// Strategy lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyPhase {
    /// Server-persisted placeholder, still being assembled
    Draft,
    /// Finalized record
    Committed,
}

impl StrategyPhase {
    /// Map the persisted draft flag to a phase
    #[inline]
    #[must_use]
    pub fn from_draft_flag(is_draft: bool) -> Self {
        if is_draft {
            Self::Draft
        } else {
            Self::Committed
        }
    }

    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// `Committed` is terminal: it never returns to `Draft`.
    #[inline]
    #[must_use]
    pub fn can_transition_to(self, next: StrategyPhase) -> bool {
        !matches!((self, next), (Self::Committed, Self::Draft))
    }
}

/// Child collection kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildKind {
    /// Strategic goal
    StrategicGoal,
    /// Operational goal
    OperationalGoal,
    /// Value
    Value,
    /// Pillar
    Pillar,
}

impl ChildKind {
    /// All kinds, in display order
    pub const ALL: [ChildKind; 4] = [
        ChildKind::StrategicGoal,
        ChildKind::OperationalGoal,
        ChildKind::Value,
        ChildKind::Pillar,
    ];

    /// Stable name
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ChildKind::StrategicGoal => "strategic_goal",
            ChildKind::OperationalGoal => "operational_goal",
            ChildKind::Value => "value",
            ChildKind::Pillar => "pillar",
        }
    }

    /// Goals carry duration/element/status
    #[inline]
    #[must_use]
    pub fn is_goal(self) -> bool {
        matches!(self, ChildKind::StrategicGoal | ChildKind::OperationalGoal)
    }
}

impl std::fmt::Display for ChildKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Goal fields (strategic and operational)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalFields {
    /// Goal name
    pub name: String,
    /// Duration label
    pub duration: String,
    /// Element label
    pub element: String,
    /// Optional description
    pub description: Option<String>,
    /// Active flag
    pub status: bool,
}

impl GoalFields {
    /// Create goal fields
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, duration: impl Into<String>, element: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            duration: duration.into(),
            element: element.into(),
            description: None,
            status: true,
        }
    }

    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// With status
    #[inline]
    #[must_use]
    pub fn with_status(mut self, status: bool) -> Self {
        self.status = status;
        self
    }
}

/// Name/description fields (values and pillars)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedFields {
    /// Name
    pub name: String,
    /// Optional description
    pub description: Option<String>,
}

impl NamedFields {
    /// Create named fields
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Child field values tagged by kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChildFields {
    /// Strategic goal
    StrategicGoal(GoalFields),
    /// Operational goal
    OperationalGoal(GoalFields),
    /// Value
    Value(NamedFields),
    /// Pillar
    Pillar(NamedFields),
}

impl ChildFields {
    /// Kind of this payload
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ChildKind {
        match self {
            ChildFields::StrategicGoal(_) => ChildKind::StrategicGoal,
            ChildFields::OperationalGoal(_) => ChildKind::OperationalGoal,
            ChildFields::Value(_) => ChildKind::Value,
            ChildFields::Pillar(_) => ChildKind::Pillar,
        }
    }

    /// Display name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            ChildFields::StrategicGoal(g) | ChildFields::OperationalGoal(g) => &g.name,
            ChildFields::Value(n) | ChildFields::Pillar(n) => &n.name,
        }
    }

    /// Description, if any
    #[inline]
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        match self {
            ChildFields::StrategicGoal(g) | ChildFields::OperationalGoal(g) => g.description.as_deref(),
            ChildFields::Value(n) | ChildFields::Pillar(n) => n.description.as_deref(),
        }
    }

    /// Case-insensitive match on name or description
    #[must_use]
    pub fn matches_term(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }
        self.name().to_lowercase().contains(&term)
            || self
                .description()
                .is_some_and(|d| d.to_lowercase().contains(&term))
    }
}

/// Committed child record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildRecord {
    /// Server-assigned id
    pub id: RecordId,
    /// Parent reference
    pub strategy_id: StrategyId,
    /// Field values
    pub fields: ChildFields,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

impl ChildRecord {
    /// Kind of this record
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ChildKind {
        self.fields.kind()
    }
}

/// Where a staged item came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "origin", content = "source", rename_all = "snake_case")]
pub enum StagedOrigin {
    /// Entered by the user on this composite
    Authored,
    /// Cloned from a committed child of another strategy
    CopiedFrom(RecordId),
}

/// Not-yet-committed child item
///
/// Carries no parent reference; the parent is supplied at finalize time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedChild {
    /// Temporary id
    pub id: StagedId,
    /// Provenance
    pub origin: StagedOrigin,
    /// Field values
    pub fields: ChildFields,
}

impl StagedChild {
    /// Stage a freshly authored item
    #[inline]
    #[must_use]
    pub fn authored(fields: ChildFields) -> Self {
        Self {
            id: StagedId::new(),
            origin: StagedOrigin::Authored,
            fields,
        }
    }

    /// Stage a copy of a committed record (copy-on-select)
    #[inline]
    #[must_use]
    pub fn copied_from(source: &ChildRecord) -> Self {
        Self {
            id: StagedId::new(),
            origin: StagedOrigin::CopiedFrom(source.id),
            fields: source.fields.clone(),
        }
    }

    /// Kind of this item
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ChildKind {
        self.fields.kind()
    }
}

/// Attachment metadata fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentFields {
    /// Original file name
    pub file_name: String,
    /// Path inside the blob bucket
    pub storage_path: String,
    /// Public URL of the blob
    pub public_url: String,
    /// Size in bytes
    pub size_bytes: u64,
    /// MIME type
    pub mime_type: String,
}

/// Committed attachment metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRecord {
    /// Server-assigned id
    pub id: RecordId,
    /// Parent reference
    pub strategy_id: StrategyId,
    /// Metadata fields
    pub fields: AttachmentFields,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Raw file awaiting upload
#[derive(Clone, PartialEq, Eq)]
pub struct PendingFile {
    /// File name as supplied by the user
    pub file_name: String,
    /// MIME type
    pub mime_type: String,
    /// File contents
    pub bytes: Vec<u8>,
}

impl PendingFile {
    /// Create pending file
    #[inline]
    #[must_use]
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Size in bytes
    #[inline]
    #[must_use]
    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Extension taken from the file name, `bin` when there is none
    #[must_use]
    pub fn extension(&self) -> &str {
        match self.file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => ext,
            _ => "bin",
        }
    }
}

impl std::fmt::Debug for PendingFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingFile")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("size_bytes", &self.bytes.len())
            .finish()
    }
}

/// Attachment as seen by list rendering: either still a raw file or
/// already committed metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentEntry {
    /// Not uploaded yet
    Pending(PendingFile),
    /// Uploaded and registered
    Committed(AttachmentRecord),
}

impl AttachmentEntry {
    /// Display file name
    #[inline]
    #[must_use]
    pub fn file_name(&self) -> &str {
        match self {
            AttachmentEntry::Pending(file) => &file.file_name,
            AttachmentEntry::Committed(record) => &record.fields.file_name,
        }
    }
}

/// Committed item queued for removal at finalize time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum DeletionMarker {
    /// Child record
    Child {
        /// Child kind
        kind: ChildKind,
        /// Record id
        id: RecordId,
    },
    /// Attachment metadata and blob
    Attachment {
        /// Attachment id
        id: RecordId,
    },
}

impl DeletionMarker {
    /// Id of the marked record
    #[inline]
    #[must_use]
    pub fn record_id(&self) -> RecordId {
        match self {
            DeletionMarker::Child { id, .. } | DeletionMarker::Attachment { id } => *id,
        }
    }
}
