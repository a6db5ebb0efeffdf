use crate::models::daily::DailyRecord;
use crate::models::project::Project;
use crate::models::snapshot::PeriodSnapshot;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{0} must be a non-negative number")]
    Negative(&'static str),

    #[error("{later} ({later_value}) cannot exceed {earlier} ({earlier_value})")]
    FunnelOrder {
        earlier: &'static str,
        earlier_value: i64,
        later: &'static str,
        later_value: i64,
    },
}

pub fn validate_daily(record: &DailyRecord) -> Result<(), ValidationError> {
    if record.member_id.trim().is_empty() {
        return Err(ValidationError::Missing("memberId"));
    }

    let funnel = record.funnel();
    for (field, value) in funnel {
        if value < 0 {
            return Err(ValidationError::Negative(field));
        }
    }
    if !record.amount.is_finite() || record.amount < 0.0 {
        return Err(ValidationError::Negative("amount"));
    }

    // Each stage is a subset of the one before it.
    for pair in funnel.windows(2) {
        let (earlier, earlier_value) = pair[0];
        let (later, later_value) = pair[1];
        if later_value > earlier_value {
            return Err(ValidationError::FunnelOrder {
                earlier,
                earlier_value,
                later,
                later_value,
            });
        }
    }

    Ok(())
}

pub fn validate_project(project: &Project) -> Result<(), ValidationError> {
    if project.company_name.trim().is_empty() {
        return Err(ValidationError::Missing("companyName"));
    }
    if project.name.trim().is_empty() {
        return Err(ValidationError::Missing("name"));
    }
    if project.assigned_to.trim().is_empty() {
        return Err(ValidationError::Missing("assignedTo"));
    }
    if !project.budget.is_finite() || project.budget < 0.0 {
        return Err(ValidationError::Negative("budget"));
    }
    Ok(())
}

pub fn validate_snapshot(snapshot: &PeriodSnapshot) -> Result<(), ValidationError> {
    if snapshot.period.trim().is_empty() {
        return Err(ValidationError::Missing("period"));
    }
    Ok(())
}
