use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::StepError;
use crate::resolver::Resolution;
use crate::workflow::context::StepContext;
use crate::workflow::step::{Step, StepAction, StepResult};

/// Filters the process grid down to `name` and clicks the row's add
/// control. The grid reloads asynchronously after each keystroke, so the
/// row gets its own, longer wait budget.
async fn add_process(ctx: &StepContext<'_>, name: &str) -> Result<(), StepError> {
    let resolver = ctx.resolver();
    let timings = ctx.timings();

    resolver
        .require("process table", ctx.candidates("process.table"))
        .await?;
    let filter = resolver
        .require("process filter", ctx.candidates("process.filter"))
        .await?;
    resolver.click(&filter.node).await?;
    ctx.page.fill(&filter.node, name).await?;
    ctx.page.press(&filter.node, "Enter").await?;
    ctx.pause(timings.field_settle()).await;

    let rows = ctx.candidates_for("process.row", name);
    match resolver
        .resolve_with_retry(&rows, timings.row_wait_retries, timings.row_wait_delay())
        .await?
    {
        Resolution::Found(_) => {}
        Resolution::Unusable(_, reason) => {
            return Err(StepError::ElementUnusable {
                field: format!("process row '{name}'"),
                reason: reason.describe().to_string(),
            })
        }
        Resolution::NotFound => {
            return Err(StepError::ElementNotFound {
                field: format!("process row '{name}'"),
                tried: rows.len(),
            })
        }
    }

    let add = resolver
        .require(
            &format!("add control for '{name}'"),
            &ctx.candidates_for("process.add", name),
        )
        .await?;
    resolver.click(&add.node).await?;
    ctx.pause(timings.field_settle()).await;
    Ok(())
}

pub struct OpenProcessTab;

#[async_trait]
impl Step for OpenProcessTab {
    fn action(&self) -> StepAction {
        StepAction::OpenProcessTab
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> Result<StepResult, StepError> {
        let resolver = ctx.resolver();
        let tab = resolver
            .require("process tab", ctx.candidates("process.tab"))
            .await?;
        resolver.click(&tab.node).await?;
        ctx.pause(ctx.timings().dropdown_wait()).await;

        let table = resolver
            .require("process table", ctx.candidates("process.table"))
            .await?;
        Ok(StepResult::success("Process section opened").with_data("processTable", table.selector))
    }
}

/// Adds every mandatory process. The first one that cannot be added fails
/// the step and names the process.
pub struct AddRequiredProcesses;

#[async_trait]
impl Step for AddRequiredProcesses {
    fn action(&self) -> StepAction {
        StepAction::AddRequiredProcesses
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> Result<StepResult, StepError> {
        let mandatory = ctx.payload.processes.mandatory();
        if mandatory.is_empty() {
            return Ok(StepResult::success("No required processes to add")
                .with_data("addedProcesses", Vec::<String>::new()));
        }

        let mut added = Vec::with_capacity(mandatory.len());
        for entry in mandatory {
            match add_process(ctx, &entry.name).await {
                Ok(()) => {
                    info!(process = %entry.name, "Required process added");
                    added.push(entry.name.clone());
                }
                Err(StepError::Driver(e)) if e.is_context_closed() => return Err(e.into()),
                Err(e) => {
                    let failure = StepError::RequiredProcess {
                        name: entry.name.clone(),
                        reason: e.to_string(),
                    };
                    warn!(process = %entry.name, error = %e, "Required process could not be added");
                    return Ok(StepResult::failure(failure.to_string())
                        .with_data("addedProcesses", added));
                }
            }
        }

        Ok(
            StepResult::success(format!("{} required process(es) added", added.len()))
                .with_data("addedProcesses", added),
        )
    }
}

/// Adds content-based and optional processes. Failures are reported as
/// warnings and never fail the step.
pub struct AddSupplementaryProcesses;

#[async_trait]
impl Step for AddSupplementaryProcesses {
    fn action(&self) -> StepAction {
        StepAction::AddSupplementaryProcesses
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> Result<StepResult, StepError> {
        let entries = ctx.payload.processes.supplementary();
        let total = entries.len();

        let mut added = Vec::new();
        let mut skipped = Vec::new();
        let mut warnings = Vec::new();

        for entry in entries {
            match add_process(ctx, &entry.name).await {
                Ok(()) => added.push(entry.name.clone()),
                Err(StepError::Driver(e)) if e.is_context_closed() => return Err(e.into()),
                Err(e) => {
                    warn!(process = %entry.name, error = %e, "Optional process skipped");
                    warnings.push(format!(
                        "Optional process '{}' could not be added: {}",
                        entry.name, e
                    ));
                    skipped.push(entry.name.clone());
                }
            }
        }

        Ok(StepResult::success(format!(
            "{} of {} optional process(es) added",
            added.len(),
            total
        ))
        .with_data("addedOptionalProcesses", added)
        .with_data("skippedProcesses", skipped)
        .with_errors(warnings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::MockPage;
    use crate::workflow::steps::testing::StepFixture;
    use serde_json::json;

    fn processes(value: serde_json::Value) -> StepFixture {
        StepFixture::new(json!({ "processes": value }))
    }

    #[tokio::test]
    async fn test_opens_process_tab() {
        let fixture = StepFixture::new(json!({}));
        let page = MockPage::permissive();

        let result = OpenProcessTab.execute(&fixture.ctx(&page)).await.unwrap();

        assert!(result.success);
        assert_eq!(page.clicks(), vec!["#tabProcess".to_string()]);
        assert_eq!(result.data.unwrap()["processTable"], "#ProcessGrid");
    }

    #[tokio::test]
    async fn test_missing_process_table_fails_tab_step() {
        let fixture = StepFixture::new(json!({}));
        let page = MockPage::permissive().hide_containing("ProcessGrid").hide_containing("grid");

        let err = OpenProcessTab.execute(&fixture.ctx(&page)).await.unwrap_err();
        assert!(err.to_string().contains("process table"));
    }

    #[tokio::test]
    async fn test_adds_required_processes_in_order() {
        let fixture = processes(json!({
            "required": [
                {"name": "Die Cutting", "order": 2},
                {"name": "Lamination", "order": 1}
            ],
            "contentBased": [{"name": "Perfect Binding", "required": true, "order": 3}]
        }));
        let page = MockPage::permissive();

        let result = AddRequiredProcesses.execute(&fixture.ctx(&page)).await.unwrap();

        assert!(result.success, "{}", result.message);
        assert_eq!(
            result.data.unwrap()["addedProcesses"],
            json!(["Lamination", "Die Cutting", "Perfect Binding"])
        );
        assert!(page
            .clicks()
            .contains(&"#ProcessGrid tr:has-text('Die Cutting') .btn-add".to_string()));
        assert_eq!(
            page.filled_value(".dx-datagrid-filter-row").as_deref(),
            Some("Perfect Binding")
        );
        assert_eq!(page.presses().len(), 3);
        assert!(page.presses().iter().all(|(_, key)| key == "Enter"));
    }

    #[tokio::test]
    async fn test_no_required_processes_is_success() {
        let fixture = processes(json!({"optional": [{"name": "UV Coating"}]}));
        let page = MockPage::permissive();

        let result = AddRequiredProcesses.execute(&fixture.ctx(&page)).await.unwrap();

        assert!(result.success);
        assert_eq!(result.message, "No required processes to add");
        assert!(page.fills().is_empty());
    }

    #[tokio::test]
    async fn test_missing_required_process_fails_naming_it() {
        let fixture = processes(json!({
            "required": [
                {"name": "Lamination", "order": 1},
                {"name": "Die Cutting", "order": 2},
                {"name": "Folding", "order": 3}
            ]
        }));
        let page = MockPage::permissive().hide_containing("Die Cutting");

        let result = AddRequiredProcesses.execute(&fixture.ctx(&page)).await.unwrap();

        assert!(!result.success);
        assert!(result
            .message
            .starts_with("Required process 'Die Cutting' could not be added"));
        assert_eq!(result.data.unwrap()["addedProcesses"], json!(["Lamination"]));
        assert!(!page.fills().iter().any(|(_, value)| value == "Folding"));
    }

    #[tokio::test]
    async fn test_optional_failures_are_warnings() {
        let fixture = processes(json!({
            "contentBased": [{"name": "Perfect Binding"}],
            "optional": [{"name": "UV Coating"}]
        }));
        let page = MockPage::permissive().hide_containing("UV Coating");

        let result = AddSupplementaryProcesses
            .execute(&fixture.ctx(&page))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.message, "1 of 2 optional process(es) added");
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("UV Coating"));
        let data = result.data.unwrap();
        assert_eq!(data["skippedProcesses"], json!(["UV Coating"]));
        assert_eq!(data["addedOptionalProcesses"], json!(["Perfect Binding"]));
    }

    #[tokio::test]
    async fn test_row_wait_uses_its_own_budget() {
        let fixture = processes(json!({"required": [{"name": "Die Cutting"}]}));
        // Four empty sweeps over both row candidates, more than the
        // general resolver budget would allow.
        let page = MockPage::permissive().appear_after("'Die Cutting'", 8);

        let result = AddRequiredProcesses.execute(&fixture.ctx(&page)).await.unwrap();
        assert!(result.success, "{}", result.message);
    }
}
