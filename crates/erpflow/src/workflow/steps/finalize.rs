use async_trait::async_trait;
use base64::Engine as _;
use tracing::{debug, info};

use crate::error::StepError;
use crate::workflow::context::StepContext;
use crate::workflow::orchestrator::SCREENSHOT_KEY;
use crate::workflow::step::{Step, StepAction, StepResult};

/// Triggers costing and reads back the summary panel when one is shown.
pub struct CalculateCost;

#[async_trait]
impl Step for CalculateCost {
    fn action(&self) -> StepAction {
        StepAction::CalculateCost
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> Result<StepResult, StepError> {
        let resolver = ctx.resolver();
        let button = resolver
            .require("calculate button", ctx.candidates("estimate.calculate"))
            .await?;
        resolver.click(&button.node).await?;
        ctx.pause(ctx.timings().step_settle()).await;

        let mut result = StepResult::success("Cost calculation triggered");
        if let Some(summary) = resolver
            .optional("cost summary", ctx.candidates("estimate.cost_summary"))
            .await?
        {
            match ctx.page.text(&summary.node).await {
                Ok(text) if !text.trim().is_empty() => {
                    result = result.with_data("costSummary", text.trim());
                }
                Ok(_) => {}
                Err(e) if e.is_context_closed() => return Err(e.into()),
                Err(e) => debug!(error = %e, "Cost summary unreadable"),
            }
        }
        Ok(result)
    }
}

/// Captures the finished estimate as a full-page image. The bytes travel
/// base64-encoded in the result data.
pub struct CaptureScreenshot;

#[async_trait]
impl Step for CaptureScreenshot {
    fn action(&self) -> StepAction {
        StepAction::CaptureScreenshot
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> Result<StepResult, StepError> {
        let bytes = ctx.page.screenshot(true).await?;
        if bytes.is_empty() {
            return Ok(StepResult::failure("Screenshot capture returned no data"));
        }

        info!(bytes = bytes.len(), "Estimate screenshot captured");
        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
        Ok(StepResult::success(format!("Screenshot captured ({} bytes)", bytes.len()))
            .with_data(SCREENSHOT_KEY, encoded)
            .with_data("screenshotBytes", bytes.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{MockNode, MockPage};
    use crate::workflow::steps::testing::StepFixture;
    use serde_json::json;

    #[tokio::test]
    async fn test_calculate_forces_through_overlay() {
        let fixture = StepFixture::new(json!({}));
        let page = MockPage::new()
            .with_node("#btnCalculate", MockNode::default())
            .with_node("#CostSummary", MockNode::with_text("  Total: 12,450.00  "))
            .intercept_clicks_on("#btnCalculate");

        let result = CalculateCost.execute(&fixture.ctx(&page)).await.unwrap();

        assert!(result.success);
        assert_eq!(page.forced_clicks(), vec!["#btnCalculate".to_string()]);
        assert_eq!(result.data.unwrap()["costSummary"], "Total: 12,450.00");
    }

    #[tokio::test]
    async fn test_calculate_without_summary_panel() {
        let fixture = StepFixture::new(json!({}));
        let page = MockPage::new().with_node("#btnCalculate", MockNode::default());

        let result = CalculateCost.execute(&fixture.ctx(&page)).await.unwrap();

        assert!(result.success);
        assert!(result.data.is_none());
    }

    #[tokio::test]
    async fn test_missing_calculate_button_fails() {
        let fixture = StepFixture::new(json!({}));
        let page = MockPage::new();

        let err = CalculateCost.execute(&fixture.ctx(&page)).await.unwrap_err();
        assert!(err.to_string().contains("calculate button"));
    }

    #[tokio::test]
    async fn test_screenshot_is_base64_in_data() {
        let fixture = StepFixture::new(json!({}));
        let page = MockPage::new().with_screenshot(b"png-bytes");

        let result = CaptureScreenshot.execute(&fixture.ctx(&page)).await.unwrap();

        assert!(result.success);
        let data = result.data.unwrap();
        assert_eq!(data[SCREENSHOT_KEY], "cG5nLWJ5dGVz");
        assert_eq!(data["screenshotBytes"], 9);
    }

    #[tokio::test]
    async fn test_empty_screenshot_fails() {
        let fixture = StepFixture::new(json!({}));
        let page = MockPage::new().with_screenshot(b"");

        let result = CaptureScreenshot.execute(&fixture.ctx(&page)).await.unwrap();
        assert!(!result.success);
    }
}
