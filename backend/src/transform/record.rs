//! Accepted rows → [`Worker`] domain records.
//!
//! Pure mapping over already validated values. Nothing here fails: a value
//! that does not convert is simply left unset.

use uuid::Uuid;

use crate::models::{
    Contact, ConsentStatus, ContactMethod, Employment, EmploymentStatus, EmploymentType,
    Engagement, Gamification, Gender, StressLevel, Wellbeing, Worker,
};
use crate::validation::ValidatedRow;

/// Map every accepted row, preserving order.
pub fn to_domain_records(rows: &[ValidatedRow], tenant_id: Uuid) -> Vec<Worker> {
    rows.iter().map(|row| to_domain_record(row, tenant_id)).collect()
}

pub fn to_domain_record(row: &ValidatedRow, tenant_id: Uuid) -> Worker {
    let gamification_defaults = Gamification::default();

    Worker {
        tenant_id,
        first_name: row.text("first_name").unwrap_or_default(),
        last_name: row.text("last_name").unwrap_or_default(),
        external_id: row.text("external_id"),
        date_of_birth: row.date("date_of_birth"),
        gender: row.text("gender").and_then(|c| Gender::from_code(&c)),
        tags: row.list("tags"),
        is_active: row.flag("is_active").unwrap_or(true),
        deactivation_reason: row.text("deactivation_reason"),
        contact: Contact {
            email: row.text("email"),
            phone: row.text("phone"),
            preferred_method: row.text("preferred_contact_method")
                .and_then(|c| ContactMethod::from_code(&c)),
            communication_consent: row.flag("communication_consent").unwrap_or(false),
            email_opt_in: row.flag("email_opt_in").unwrap_or(false),
            sms_opt_in: row.flag("sms_opt_in").unwrap_or(false),
            consent_status: row.text("consent_status")
                .and_then(|c| ConsentStatus::from_code(&c))
                .unwrap_or_default(),
        },
        employment: Employment {
            job_title: row.text("job_title"),
            department: row.text("department"),
            location: row.text("location"),
            employment_type: row.text("employment_type")
                .and_then(|c| EmploymentType::from_code(&c)),
            status: row.text("employment_status")
                .and_then(|c| EmploymentStatus::from_code(&c))
                .unwrap_or_default(),
            hire_date: row.date("hire_date"),
            manager_external_id: row.text("manager_id"),
        },
        engagement: Engagement {
            last_active_date: row.date("last_active_date"),
            last_interaction_date: row.date("last_interaction_date"),
            last_engagement_date: row.date("last_engagement_date"),
            score: row.number("engagement_score"),
        },
        wellbeing: Wellbeing {
            score: row.number("wellbeing_score"),
            stress_level: row.text("stress_level").and_then(|c| StressLevel::from_code(&c)),
            needs_support: row.flag("needs_support").unwrap_or(false),
        },
        gamification: Gamification {
            points: row.integer("points").unwrap_or(gamification_defaults.points),
            level: row.integer("level").unwrap_or(gamification_defaults.level),
            badges: row.list("badges"),
        },
    }
}
