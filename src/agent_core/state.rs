//! Conversation state — the per-thread record the orchestrator owns while a
//! turn runs and persists wholesale when it ends.
//!
//! Every field has a serde default so that snapshots written before a field
//! existed still load.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::inference::types::Role;
use crate::schemes::{ApplicationRecord, SchemeMatch};

// ─── Profile Vocabulary ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }

    pub fn label_hindi(self) -> &'static str {
        match self {
            Gender::Male => "पुरुष",
            Gender::Female => "महिला",
        }
    }
}

/// Social category. Serialized as `SC`, `ST`, `OBC`, `GENERAL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    Sc,
    St,
    Obc,
    General,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Sc => "SC",
            Category::St => "ST",
            Category::Obc => "OBC",
            Category::General => "GENERAL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaritalStatus {
    Married,
    Unmarried,
    Widowed,
}

impl MaritalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MaritalStatus::Married => "married",
            MaritalStatus::Unmarried => "unmarried",
            MaritalStatus::Widowed => "widowed",
        }
    }
}

/// Names of the profile fields, as used in `missing_information`,
/// `extracted_info` keys and contradiction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    Age,
    Income,
    Gender,
    Occupation,
    Category,
    StateLocation,
    IsStudent,
    HasDisabilities,
    MaritalStatus,
}

/// Fields that must be known before eligibility is checked.
pub const REQUIRED_FIELDS: [ProfileField; 3] =
    [ProfileField::Age, ProfileField::Income, ProfileField::Gender];

impl ProfileField {
    pub fn as_str(self) -> &'static str {
        match self {
            ProfileField::Age => "age",
            ProfileField::Income => "income",
            ProfileField::Gender => "gender",
            ProfileField::Occupation => "occupation",
            ProfileField::Category => "category",
            ProfileField::StateLocation => "state_location",
            ProfileField::IsStudent => "is_student",
            ProfileField::HasDisabilities => "has_disabilities",
            ProfileField::MaritalStatus => "marital_status",
        }
    }

    /// Label used when asking the user for this field.
    pub fn display_name(self) -> &'static str {
        match self {
            ProfileField::Age => "उम्र",
            ProfileField::Income => "आय",
            ProfileField::Gender => "लिंग",
            ProfileField::Occupation => "व्यवसाय",
            ProfileField::Category => "श्रेणी",
            ProfileField::StateLocation => "राज्य",
            ProfileField::IsStudent => "छात्र स्थिति",
            ProfileField::HasDisabilities => "विकलांगता",
            ProfileField::MaritalStatus => "वैवाहिक स्थिति",
        }
    }
}

/// A typed value for one profile field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Age(u32),
    Income(f64),
    Gender(Gender),
    Occupation(String),
    Category(Category),
    StateLocation(String),
    IsStudent(bool),
    HasDisabilities(bool),
    MaritalStatus(MaritalStatus),
}

impl FieldValue {
    pub fn field(&self) -> ProfileField {
        match self {
            FieldValue::Age(_) => ProfileField::Age,
            FieldValue::Income(_) => ProfileField::Income,
            FieldValue::Gender(_) => ProfileField::Gender,
            FieldValue::Occupation(_) => ProfileField::Occupation,
            FieldValue::Category(_) => ProfileField::Category,
            FieldValue::StateLocation(_) => ProfileField::StateLocation,
            FieldValue::IsStudent(_) => ProfileField::IsStudent,
            FieldValue::HasDisabilities(_) => ProfileField::HasDisabilities,
            FieldValue::MaritalStatus(_) => ProfileField::MaritalStatus,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Age(v) => json!(v),
            FieldValue::Income(v) => json!(v),
            FieldValue::Gender(v) => json!(v.as_str()),
            FieldValue::Occupation(v) | FieldValue::StateLocation(v) => json!(v),
            FieldValue::Category(v) => json!(v.as_str()),
            FieldValue::IsStudent(v) | FieldValue::HasDisabilities(v) => json!(v),
            FieldValue::MaritalStatus(v) => json!(v.as_str()),
        }
    }
}

// ─── Profile ────────────────────────────────────────────────────────────────

/// What is known about the citizen. `None` means "not yet provided".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub age: Option<u32>,
    pub income: Option<f64>,
    pub gender: Option<Gender>,
    pub occupation: Option<String>,
    pub category: Option<Category>,
    pub state_location: Option<String>,
    pub is_student: Option<bool>,
    pub has_disabilities: Option<bool>,
    pub marital_status: Option<MaritalStatus>,
}

impl Profile {
    /// Current value of `field` as JSON, `None` when unset.
    pub fn get(&self, field: ProfileField) -> Option<Value> {
        let value = match field {
            ProfileField::Age => self.age.map(FieldValue::Age),
            ProfileField::Income => self.income.map(FieldValue::Income),
            ProfileField::Gender => self.gender.map(FieldValue::Gender),
            ProfileField::Occupation => self.occupation.clone().map(FieldValue::Occupation),
            ProfileField::Category => self.category.map(FieldValue::Category),
            ProfileField::StateLocation => {
                self.state_location.clone().map(FieldValue::StateLocation)
            }
            ProfileField::IsStudent => self.is_student.map(FieldValue::IsStudent),
            ProfileField::HasDisabilities => self.has_disabilities.map(FieldValue::HasDisabilities),
            ProfileField::MaritalStatus => self.marital_status.map(FieldValue::MaritalStatus),
        };
        value.map(|v| v.to_json())
    }

    pub fn is_present(&self, field: ProfileField) -> bool {
        self.get(field).is_some()
    }

    /// Overwrite one field, returning its previous value.
    fn apply(&mut self, value: FieldValue) -> Option<Value> {
        let previous = self.get(value.field());
        match value {
            FieldValue::Age(v) => self.age = Some(v),
            FieldValue::Income(v) => self.income = Some(v),
            FieldValue::Gender(v) => self.gender = Some(v),
            FieldValue::Occupation(v) => self.occupation = Some(v),
            FieldValue::Category(v) => self.category = Some(v),
            FieldValue::StateLocation(v) => self.state_location = Some(v),
            FieldValue::IsStudent(v) => self.is_student = Some(v),
            FieldValue::HasDisabilities(v) => self.has_disabilities = Some(v),
            FieldValue::MaritalStatus(v) => self.marital_status = Some(v),
        }
        previous
    }

    /// Required fields that are still unknown, in canonical order.
    pub fn missing_required(&self) -> Vec<ProfileField> {
        REQUIRED_FIELDS
            .into_iter()
            .filter(|f| !self.is_present(*f))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_required().is_empty()
    }
}

// ─── Control Types ──────────────────────────────────────────────────────────

/// Closed set of turn intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    FindSchemes,
    ProvideInfo,
    ApplyScheme,
    GetDetails,
    Clarify,
    Greeting,
}

impl Intent {
    pub const ALL: [Intent; 6] = [
        Intent::FindSchemes,
        Intent::ProvideInfo,
        Intent::ApplyScheme,
        Intent::GetDetails,
        Intent::Clarify,
        Intent::Greeting,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Intent::FindSchemes => "find_schemes",
            Intent::ProvideInfo => "provide_info",
            Intent::ApplyScheme => "apply_scheme",
            Intent::GetDetails => "get_details",
            Intent::Clarify => "clarify",
            Intent::Greeting => "greeting",
        }
    }

    /// Exact, case-insensitive match against the wire names.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|i| i.as_str().eq_ignore_ascii_case(raw))
    }
}

/// Pipeline position. The orchestrator matches on this exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    #[default]
    Planner,
    Executor,
    Evaluator,
    Responder,
    Terminated,
}

/// Expected control outcomes of a turn. Stored in state, never thrown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnError {
    AlreadyApplied {
        scheme_id: String,
        #[serde(default)]
        application_id: Option<String>,
    },
    NoSchemeSelected,
    ToolFailure {
        reason: String,
    },
}

impl TurnError {
    pub fn code(&self) -> &'static str {
        match self {
            TurnError::AlreadyApplied { .. } => "already_applied",
            TurnError::NoSchemeSelected => "no_scheme_selected",
            TurnError::ToolFailure { .. } => "tool_failure",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContradictionRecord {
    pub field: ProfileField,
    pub old_value: Value,
    pub new_value: Value,
    /// RFC 3339.
    pub timestamp: String,
}

// ─── ConversationState ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationState {
    pub messages: Vec<Message>,
    pub user_input: String,
    pub profile: Profile,
    pub current_intent: Option<Intent>,
    pub missing_information: Vec<ProfileField>,
    pub eligible_schemes: Vec<SchemeMatch>,
    pub selected_scheme_id: Option<String>,
    pub application_result: Option<ApplicationRecord>,
    /// Grows only.
    pub applied_schemes: Vec<String>,
    /// Grows only.
    pub contradictions: Vec<ContradictionRecord>,
    /// Fields set during the current turn.
    pub extracted_info: Map<String, Value>,
    pub next_step: Step,
    pub should_continue: bool,
    pub error: Option<TurnError>,
    pub needs_clarification: bool,
    pub turn_count: u64,
    pub confidence: f64,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            user_input: String::new(),
            profile: Profile::default(),
            current_intent: None,
            missing_information: Vec::new(),
            eligible_schemes: Vec::new(),
            selected_scheme_id: None,
            application_result: None,
            applied_schemes: Vec::new(),
            contradictions: Vec::new(),
            extracted_info: Map::new(),
            next_step: Step::Planner,
            should_continue: true,
            error: None,
            needs_clarification: false,
            turn_count: 0,
            confidence: 1.0,
        }
    }
}

impl ConversationState {
    /// Clear the per-turn fields and record the incoming utterance.
    pub fn begin_turn(&mut self, utterance: &str) {
        self.extracted_info.clear();
        self.error = None;
        self.application_result = None;
        self.needs_clarification = false;
        self.missing_information.clear();
        self.current_intent = None;
        self.should_continue = true;
        self.next_step = Step::Planner;
        self.user_input = utterance.to_string();
        self.messages.push(Message {
            role: Role::User,
            content: utterance.to_string(),
        });
    }

    /// Record that `scheme_id` was applied for. Set semantics.
    pub fn mark_applied(&mut self, scheme_id: &str) {
        if !self.applied_schemes.iter().any(|s| s == scheme_id) {
            self.applied_schemes.push(scheme_id.to_string());
        }
    }

    pub fn has_applied(&self, scheme_id: &str) -> bool {
        self.applied_schemes.iter().any(|s| s == scheme_id)
    }
}

// ─── Profile Setter ─────────────────────────────────────────────────────────

/// Contradiction-aware profile update.
///
/// Overwrites the field unconditionally and mirrors it into
/// `extracted_info`. When the field already held a different non-null value
/// a `ContradictionRecord` is appended first. Returns whether a
/// contradiction was recorded.
pub fn set_field(state: &mut ConversationState, value: FieldValue) -> bool {
    let field = value.field();
    let new_value = value.to_json();
    let previous = state.profile.apply(value);

    let contradicted = match previous {
        Some(old_value) if old_value != new_value => {
            tracing::warn!(
                field = field.as_str(),
                old = %old_value,
                new = %new_value,
                "profile contradiction recorded"
            );
            state.contradictions.push(ContradictionRecord {
                field,
                old_value,
                new_value: new_value.clone(),
                timestamp: chrono::Utc::now().to_rfc3339(),
            });
            true
        }
        _ => false,
    };

    state
        .extracted_info
        .insert(field.as_str().to_string(), new_value);
    contradicted
}

// ─── Tests ──────────────────────────────────────────────────────────────────
