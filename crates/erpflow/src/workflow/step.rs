use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::context::StepContext;
use crate::error::StepError;

/// Free-form key/value data steps hand forward to later steps and to the
/// aggregate result.
pub type DataMap = serde_json::Map<String, serde_json::Value>;

/// Symbolic tag for each step of the estimation workflow, in run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    OpenLoginPage,
    CompanyLogin,
    UserLogin,
    DismissTour,
    OpenEstimation,
    SelectContent,
    FillJobDetails,
    FillJobSize,
    FillMaterial,
    FillPrinting,
    FillFinishing,
    OpenProcessTab,
    AddRequiredProcesses,
    AddSupplementaryProcesses,
    CalculateCost,
    CaptureScreenshot,
}

impl StepAction {
    pub const ALL: [StepAction; 16] = [
        StepAction::OpenLoginPage,
        StepAction::CompanyLogin,
        StepAction::UserLogin,
        StepAction::DismissTour,
        StepAction::OpenEstimation,
        StepAction::SelectContent,
        StepAction::FillJobDetails,
        StepAction::FillJobSize,
        StepAction::FillMaterial,
        StepAction::FillPrinting,
        StepAction::FillFinishing,
        StepAction::OpenProcessTab,
        StepAction::AddRequiredProcesses,
        StepAction::AddSupplementaryProcesses,
        StepAction::CalculateCost,
        StepAction::CaptureScreenshot,
    ];

    /// 1-based position in the workflow.
    pub fn number(&self) -> u8 {
        Self::ALL
            .iter()
            .position(|a| a == self)
            .map_or(0, |i| i as u8 + 1)
    }

    pub fn description(&self) -> &'static str {
        match self {
            StepAction::OpenLoginPage => "Open ERP login page",
            StepAction::CompanyLogin => "Log in to company account",
            StepAction::UserLogin => "Log in as user and select financial year",
            StepAction::DismissTour => "Dismiss onboarding tour",
            StepAction::OpenEstimation => "Open new estimation screen",
            StepAction::SelectContent => "Select content type",
            StepAction::FillJobDetails => "Fill job details",
            StepAction::FillJobSize => "Fill job size",
            StepAction::FillMaterial => "Fill material",
            StepAction::FillPrinting => "Fill printing details",
            StepAction::FillFinishing => "Fill wastage and finishing",
            StepAction::OpenProcessTab => "Open process section",
            StepAction::AddRequiredProcesses => "Add required processes",
            StepAction::AddSupplementaryProcesses => "Add content-based and optional processes",
            StepAction::CalculateCost => "Calculate cost",
            StepAction::CaptureScreenshot => "Capture estimate screenshot",
        }
    }
}

impl fmt::Display for StepAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        f.write_str(&tag)
    }
}

/// Audit-trail record for one executed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStep {
    pub number: u8,
    pub description: String,
    pub action: StepAction,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl WorkflowStep {
    pub fn pending(action: StepAction) -> Self {
        Self {
            number: action.number(),
            description: action.description().to_string(),
            action,
            completed: false,
            error: None,
            completed_at: None,
        }
    }

    pub(crate) fn finish(&mut self, result: &StepResult) {
        self.completed = result.success;
        if result.success {
            self.completed_at = Some(Utc::now());
        } else {
            self.error = Some(result.message.clone());
        }
    }
}

/// A fresh, unexecuted copy of the 16-step workflow.
pub fn template() -> Vec<WorkflowStep> {
    StepAction::ALL.iter().copied().map(WorkflowStep::pending).collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<DataMap>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl StepResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            success: false,
            errors: vec![message.clone()],
            message,
            data: None,
        }
    }

    pub fn with_data(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.data
            .get_or_insert_with(DataMap::new)
            .insert(key.to_string(), value.into());
        self
    }

    pub fn with_errors(mut self, errors: impl IntoIterator<Item = String>) -> Self {
        self.errors.extend(errors);
        self
    }
}

impl From<StepError> for StepResult {
    fn from(err: StepError) -> Self {
        StepResult::failure(err.to_string())
    }
}

/// One unit of the workflow. Steps never retry each other; a failed
/// result ends the run.
#[async_trait]
pub trait Step: Send + Sync {
    fn action(&self) -> StepAction;

    async fn execute(&self, ctx: &StepContext<'_>) -> Result<StepResult, StepError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_numbers_are_unique_and_ordered() {
        let steps = template();
        assert_eq!(steps.len(), 16);
        for (i, step) in steps.iter().enumerate() {
            assert_eq!(step.number as usize, i + 1);
            assert!(!step.completed);
            assert!(step.completed_at.is_none());
        }
    }

    #[test]
    fn test_action_tag_display() {
        assert_eq!(StepAction::CompanyLogin.to_string(), "company_login");
        assert_eq!(StepAction::CaptureScreenshot.number(), 16);
    }

    #[test]
    fn test_finish_records_error_on_failure() {
        let mut step = WorkflowStep::pending(StepAction::CompanyLogin);
        step.finish(&StepResult::failure("Company credentials not provided"));
        assert!(!step.completed);
        assert_eq!(step.error.as_deref(), Some("Company credentials not provided"));

        let mut step = WorkflowStep::pending(StepAction::DismissTour);
        step.finish(&StepResult::success("ok"));
        assert!(step.completed);
        assert!(step.completed_at.is_some());
    }

    #[test]
    fn test_step_result_builders() {
        let result = StepResult::success("filled")
            .with_data("pageTitle", "Estimate")
            .with_errors(vec!["warning".to_string()]);
        assert!(result.success);
        assert_eq!(result.data.unwrap()["pageTitle"], "Estimate");
        assert_eq!(result.errors, vec!["warning".to_string()]);
    }
}
