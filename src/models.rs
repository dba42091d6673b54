use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

pub type CategoryId = String;
pub type HabitId = String;
pub type TodoId = String;
pub type ArchiveId = String;
pub type FolderId = String;
pub type ProjectId = String;
pub type LabTagId = String;

pub const LAB_VERSION: u32 = 1;

/// Per-day score for one habit. Stored on the wire as `0`, `1` or `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Score {
    Miss,
    Partial,
    Done,
}

impl Score {
    pub fn value(self) -> u8 {
        match self {
            Self::Miss => 0,
            Self::Partial => 1,
            Self::Done => 2,
        }
    }
}

impl TryFrom<u8> for Score {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Miss),
            1 => Ok(Self::Partial),
            2 => Ok(Self::Done),
            other => Err(format!("score must be 0, 1 or 2, got {}", other)),
        }
    }
}

impl From<Score> for u8 {
    fn from(value: Score) -> Self {
        value.value()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// Eisenhower matrix placement of a todo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Quadrant {
    UrgentImportant,
    NotUrgentImportant,
    UrgentNotImportant,
    NotUrgentNotImportant,
}

impl Quadrant {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UrgentImportant => "urgentImportant",
            Self::NotUrgentImportant => "notUrgentImportant",
            Self::UrgentNotImportant => "urgentNotImportant",
            Self::NotUrgentNotImportant => "notUrgentNotImportant",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DailyViewMode {
    #[default]
    List,
    Grid,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TodoViewMode {
    #[default]
    List,
    Matrix,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub sort_index: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: HabitId,
    pub category_id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub priority: Priority,
    pub sort_index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    pub updated_at: DateTime<Utc>,
}

impl Habit {
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.start_date.map_or(true, |start| start <= date)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    pub id: TodoId,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<FolderId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quadrant: Option<Quadrant>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoArchiveItem {
    pub id: ArchiveId,
    pub text: String,
    pub completed_at: DateTime<Utc>,
    pub restored_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<FolderId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quadrant: Option<Quadrant>,
}

impl TodoArchiveItem {
    pub fn is_restored(&self) -> bool {
        self.restored_at.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoFolder {
    pub id: FolderId,
    pub name: String,
    pub sort_index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UiState {
    pub selected_date: NaiveDate,
    pub daily_view_mode: DailyViewMode,
    pub todo_view_mode: TodoViewMode,
    pub overview_range_days: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overview_end_date: Option<NaiveDate>,
}

pub const DEFAULT_OVERVIEW_RANGE_DAYS: u32 = 30;
pub const MAX_OVERVIEW_RANGE_DAYS: u32 = 366;

impl Default for UiState {
    fn default() -> Self {
        Self {
            selected_date: crate::ids::today(),
            daily_view_mode: DailyViewMode::default(),
            todo_view_mode: TodoViewMode::default(),
            overview_range_days: DEFAULT_OVERVIEW_RANGE_DAYS,
            overview_end_date: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub app_version: String,
    pub created_at: DateTime<Utc>,
}

impl Default for Meta {
    fn default() -> Self {
        Self {
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: crate::ids::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabProject {
    pub id: ProjectId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabTag {
    pub id: LabTagId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabDailyLog {
    pub date: NaiveDate,
    #[serde(default)]
    pub tag_ids: Vec<LabTagId>,
    #[serde(default)]
    pub note: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabEventLog {
    pub id: String,
    pub title: String,
    pub occurred_at: DateTime<Utc>,
    #[serde(default)]
    pub tag_ids: Vec<LabTagId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LabState {
    pub version: u32,
    pub projects: BTreeMap<ProjectId, LabProject>,
    pub project_order: Vec<ProjectId>,
    pub tags_by_project: BTreeMap<ProjectId, BTreeMap<LabTagId, LabTag>>,
    pub tag_order_by_project: BTreeMap<ProjectId, Vec<LabTagId>>,
    pub daily_logs_by_project: BTreeMap<ProjectId, BTreeMap<NaiveDate, LabDailyLog>>,
    pub event_logs_by_project: BTreeMap<ProjectId, Vec<LabEventLog>>,
}

impl Default for LabState {
    fn default() -> Self {
        Self {
            version: LAB_VERSION,
            projects: BTreeMap::new(),
            project_order: Vec::new(),
            tags_by_project: BTreeMap::new(),
            tag_order_by_project: BTreeMap::new(),
            daily_logs_by_project: BTreeMap::new(),
            event_logs_by_project: BTreeMap::new(),
        }
    }
}

pub type DayScores = BTreeMap<HabitId, Score>;

/// One immutable snapshot of everything the tracker persists.
///
/// Each collection sits behind its own `Arc`, so an action clones only the
/// branches it touches and untouched collections stay shared between
/// snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    #[serde(default)]
    pub meta: Meta,
    #[serde(default)]
    pub categories: Arc<BTreeMap<CategoryId, Category>>,
    #[serde(default)]
    pub habits: Arc<BTreeMap<HabitId, Habit>>,
    #[serde(default)]
    pub daily_scores: Arc<BTreeMap<NaiveDate, DayScores>>,
    #[serde(default)]
    pub day_locks: Arc<BTreeMap<NaiveDate, DateTime<Utc>>>,
    #[serde(default)]
    pub todos: Arc<BTreeMap<TodoId, TodoItem>>,
    #[serde(default)]
    pub todo_archive: Arc<BTreeMap<ArchiveId, TodoArchiveItem>>,
    #[serde(default)]
    pub todo_folders: Arc<BTreeMap<FolderId, TodoFolder>>,
    #[serde(default)]
    pub ui_state: UiState,
    #[serde(default)]
    pub lab: Arc<LabState>,
}

impl AppState {
    pub fn new(app_version: &str) -> Self {
        Self {
            meta: Meta {
                app_version: app_version.to_string(),
                created_at: crate::ids::now(),
            },
            ..Self::default()
        }
    }
}
