//! Domain models for the worker import pipeline.
//!
//! - [`Worker`] - A worker record as produced by the record transformer
//! - [`Contact`], [`Employment`], [`Engagement`], [`Wellbeing`], [`Gamification`] - Nested sub-structures
//! - [`StoredWorker`] - A persisted worker with its entity id
//! - [`WorkerPatch`] - The columns of an update file, applied onto a stored worker
//! - [`IdentifierKind`] - Identifier types used to reconcile updates

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

use crate::validation::primitives::{normalize_code, normalize_email, normalize_phone};

// =============================================================================
// Enumerations
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    NonBinary,
    Other,
    PreferNotToSay,
}

impl Gender {
    pub fn from_code(code: &str) -> Option<Self> {
        match normalize_code(code).as_str() {
            "male" | "m" => Some(Self::Male),
            "female" | "f" => Some(Self::Female),
            "non_binary" | "nonbinary" => Some(Self::NonBinary),
            "other" => Some(Self::Other),
            "prefer_not_to_say" => Some(Self::PreferNotToSay),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContactMethod {
    Email,
    Sms,
    Phone,
    Whatsapp,
}

impl ContactMethod {
    pub fn from_code(code: &str) -> Option<Self> {
        match normalize_code(code).as_str() {
            "email" | "e_mail" => Some(Self::Email),
            "sms" | "text" => Some(Self::Sms),
            "phone" | "call" => Some(Self::Phone),
            "whatsapp" => Some(Self::Whatsapp),
            _ => None,
        }
    }
}

/// Consent state for communications. Unset means nobody has asked yet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConsentStatus {
    Granted,
    Denied,
    #[default]
    Pending,
}

impl ConsentStatus {
    pub fn from_code(code: &str) -> Option<Self> {
        match normalize_code(code).as_str() {
            "granted" => Some(Self::Granted),
            "denied" => Some(Self::Denied),
            "pending" => Some(Self::Pending),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentType {
    FullTime,
    PartTime,
    Contractor,
    Temporary,
    Intern,
}

impl EmploymentType {
    pub fn from_code(code: &str) -> Option<Self> {
        match normalize_code(code).as_str() {
            "full_time" => Some(Self::FullTime),
            "part_time" => Some(Self::PartTime),
            "contractor" => Some(Self::Contractor),
            "temporary" => Some(Self::Temporary),
            "intern" => Some(Self::Intern),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentStatus {
    #[default]
    Active,
    OnLeave,
    Suspended,
    Terminated,
}

impl EmploymentStatus {
    pub fn from_code(code: &str) -> Option<Self> {
        match normalize_code(code).as_str() {
            "active" => Some(Self::Active),
            "on_leave" => Some(Self::OnLeave),
            "suspended" => Some(Self::Suspended),
            "terminated" => Some(Self::Terminated),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StressLevel {
    Low,
    Medium,
    High,
}

impl StressLevel {
    pub fn from_code(code: &str) -> Option<Self> {
        match normalize_code(code).as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

// =============================================================================
// Sub-structures
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub preferred_method: Option<ContactMethod>,
    #[serde(default)]
    pub communication_consent: bool,
    #[serde(default)]
    pub email_opt_in: bool,
    #[serde(default)]
    pub sms_opt_in: bool,
    #[serde(default)]
    pub consent_status: ConsentStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Employment {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub job_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub employment_type: Option<EmploymentType>,
    #[serde(default)]
    pub status: EmploymentStatus,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub hire_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub manager_external_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Engagement {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_active_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_interaction_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_engagement_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Wellbeing {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub stress_level: Option<StressLevel>,
    #[serde(default)]
    pub needs_support: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Gamification {
    #[serde(default)]
    pub points: i64,
    #[serde(default = "default_level")]
    pub level: i64,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub badges: Vec<String>,
}

fn default_level() -> i64 {
    1
}

impl Default for Gamification {
    fn default() -> Self {
        Self {
            points: 0,
            level: default_level(),
            badges: Vec::new(),
        }
    }
}

// =============================================================================
// Worker
// =============================================================================

/// A worker record, always owned by one tenant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Worker {
    pub tenant_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<String>,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub deactivation_reason: Option<String>,
    #[serde(default)]
    pub contact: Contact,
    #[serde(default)]
    pub employment: Employment,
    #[serde(default)]
    pub engagement: Engagement,
    #[serde(default)]
    pub wellbeing: Wellbeing,
    #[serde(default)]
    pub gamification: Gamification,
}

impl Worker {
    /// Create a worker with minimal required fields.
    pub fn new(tenant_id: Uuid, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            tenant_id,
            first_name: first_name.into(),
            last_name: last_name.into(),
            external_id: None,
            date_of_birth: None,
            gender: None,
            tags: Vec::new(),
            is_active: true,
            deactivation_reason: None,
            contact: Contact::default(),
            employment: Employment::default(),
            engagement: Engagement::default(),
            wellbeing: Wellbeing::default(),
            gamification: Gamification::default(),
        }
    }

    pub fn with_external_id(mut self, id: impl Into<String>) -> Self {
        self.external_id = Some(id.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.contact.email = Some(email.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.contact.phone = Some(phone.into());
        self
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Human label used in outcome reports.
    pub fn label(&self) -> String {
        match self.external_id {
            Some(ref id) => format!("{} ({})", self.full_name(), id),
            None => self.full_name(),
        }
    }

    /// Normalized identifier of the given kind, if present.
    pub fn identifier(&self, kind: IdentifierKind) -> Option<String> {
        let raw = match kind {
            IdentifierKind::ExternalId => self.external_id.as_deref(),
            IdentifierKind::Email => self.contact.email.as_deref(),
            IdentifierKind::Phone => self.contact.phone.as_deref(),
        }?;
        let normalized = kind.normalize(raw);
        (!normalized.is_empty()).then_some(normalized)
    }
}

/// A persisted worker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredWorker {
    pub id: Uuid,
    #[serde(flatten)]
    pub worker: Worker,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredWorker {
    pub fn new(worker: Worker) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            worker,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn tenant_id(&self) -> Uuid {
        self.worker.tenant_id
    }
}

// =============================================================================
// Patches
// =============================================================================

/// Every column key a [`Worker`] field is mapped from.
pub const WORKER_COLUMNS: &[&str] = &[
    "first_name",
    "last_name",
    "external_id",
    "date_of_birth",
    "gender",
    "tags",
    "is_active",
    "deactivation_reason",
    "email",
    "phone",
    "preferred_contact_method",
    "communication_consent",
    "email_opt_in",
    "sms_opt_in",
    "consent_status",
    "job_title",
    "department",
    "location",
    "employment_type",
    "employment_status",
    "hire_date",
    "manager_id",
    "last_active_date",
    "last_interaction_date",
    "last_engagement_date",
    "engagement_score",
    "wellbeing_score",
    "stress_level",
    "needs_support",
    "points",
    "level",
    "badges",
];

/// An update built from one row: the mapped record plus the columns the
/// file actually carried.
///
/// Only those columns are written onto the stored worker. A column that is
/// present but blank clears the field; a column the file lacks leaves the
/// stored value alone.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerPatch {
    pub record: Worker,
    pub columns: BTreeSet<String>,
}

impl WorkerPatch {
    pub fn new(record: Worker, columns: BTreeSet<String>) -> Self {
        Self { record, columns }
    }

    /// A patch overwriting every mapped field.
    pub fn replace(record: Worker) -> Self {
        let columns = WORKER_COLUMNS.iter().map(|c| c.to_string()).collect();
        Self { record, columns }
    }

    pub fn tenant_id(&self) -> Uuid {
        self.record.tenant_id
    }

    pub fn label(&self) -> String {
        self.record.label()
    }

    /// Copy the patched fields onto `target`. The tenant never changes.
    pub fn apply_to(&self, target: &mut Worker) {
        let from = &self.record;
        for column in &self.columns {
            match column.as_str() {
                "first_name" => target.first_name = from.first_name.clone(),
                "last_name" => target.last_name = from.last_name.clone(),
                "external_id" => target.external_id = from.external_id.clone(),
                "date_of_birth" => target.date_of_birth = from.date_of_birth,
                "gender" => target.gender = from.gender,
                "tags" => target.tags = from.tags.clone(),
                "is_active" => target.is_active = from.is_active,
                "deactivation_reason" => {
                    target.deactivation_reason = from.deactivation_reason.clone()
                }
                "email" => target.contact.email = from.contact.email.clone(),
                "phone" => target.contact.phone = from.contact.phone.clone(),
                "preferred_contact_method" => {
                    target.contact.preferred_method = from.contact.preferred_method
                }
                "communication_consent" => {
                    target.contact.communication_consent = from.contact.communication_consent
                }
                "email_opt_in" => target.contact.email_opt_in = from.contact.email_opt_in,
                "sms_opt_in" => target.contact.sms_opt_in = from.contact.sms_opt_in,
                "consent_status" => target.contact.consent_status = from.contact.consent_status,
                "job_title" => target.employment.job_title = from.employment.job_title.clone(),
                "department" => target.employment.department = from.employment.department.clone(),
                "location" => target.employment.location = from.employment.location.clone(),
                "employment_type" => {
                    target.employment.employment_type = from.employment.employment_type
                }
                "employment_status" => target.employment.status = from.employment.status,
                "hire_date" => target.employment.hire_date = from.employment.hire_date,
                "manager_id" => {
                    target.employment.manager_external_id =
                        from.employment.manager_external_id.clone()
                }
                "last_active_date" => {
                    target.engagement.last_active_date = from.engagement.last_active_date
                }
                "last_interaction_date" => {
                    target.engagement.last_interaction_date = from.engagement.last_interaction_date
                }
                "last_engagement_date" => {
                    target.engagement.last_engagement_date = from.engagement.last_engagement_date
                }
                "engagement_score" => target.engagement.score = from.engagement.score,
                "wellbeing_score" => target.wellbeing.score = from.wellbeing.score,
                "stress_level" => target.wellbeing.stress_level = from.wellbeing.stress_level,
                "needs_support" => target.wellbeing.needs_support = from.wellbeing.needs_support,
                "points" => target.gamification.points = from.gamification.points,
                "level" => target.gamification.level = from.gamification.level,
                "badges" => target.gamification.badges = from.gamification.badges.clone(),
                _ => {}
            }
        }
    }
}

// =============================================================================
// Identifiers
// =============================================================================

/// Identifier types an incoming record can be matched on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum IdentifierKind {
    ExternalId,
    Email,
    Phone,
}

impl IdentifierKind {
    /// Comparable form of a raw identifier.
    pub fn normalize(&self, value: &str) -> String {
        match self {
            Self::ExternalId => value.trim().to_string(),
            Self::Email => normalize_email(value),
            Self::Phone => normalize_phone(value),
        }
    }
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ExternalId => "external id",
            Self::Email => "email",
            Self::Phone => "phone",
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
