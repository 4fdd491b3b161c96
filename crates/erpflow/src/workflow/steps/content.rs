use async_trait::async_trait;
use tracing::{info, warn};

use crate::driver::NodeHandle;
use crate::error::{DriverError, StepError};
use crate::resolver::Resolution;
use crate::workflow::context::StepContext;
use crate::workflow::step::{Step, StepAction, StepResult};

/// Picks the content type in the "add content" modal.
///
/// The modal is flaky: it sometimes renders empty and sometimes tears down
/// the browsing context while applying the selection. Empty renders are
/// retried. A context that closes once the item has been clicked counts as
/// an ambiguous success; closing any earlier fails the step.
pub struct SelectContent;

/// How an attempt ended after the content item was clicked.
enum Applied {
    Confirmed,
    /// The context went away while the selection was being applied.
    ContextClosed(DriverError),
}

impl SelectContent {
    async fn attempt(&self, ctx: &StepContext<'_>, content_type: &str) -> Result<Applied, StepError> {
        let resolver = ctx.resolver();

        let open = resolver
            .require("add content button", ctx.candidates("content.open"))
            .await?;
        resolver.click(&open.node).await?;
        ctx.pause(ctx.timings().field_settle()).await;

        let items = ctx.candidates_for("content.item", content_type);
        let item = match resolver.resolve(&items).await? {
            Resolution::Found(item) => item,
            Resolution::Unusable(_, reason) => {
                return Err(StepError::ElementUnusable {
                    field: format!("content type {content_type}"),
                    reason: reason.describe().to_string(),
                })
            }
            Resolution::NotFound => {
                return Err(StepError::ElementNotFound {
                    field: format!("content type {content_type}"),
                    tried: items.len(),
                })
            }
        };

        match self.apply(ctx, &item.node).await {
            Ok(()) => Ok(Applied::Confirmed),
            Err(e) if e.is_context_closed() => Ok(Applied::ContextClosed(e)),
            Err(e) => Err(e.into()),
        }
    }

    /// Clicks the item and the confirm button when one shows up.
    async fn apply(&self, ctx: &StepContext<'_>, item: &NodeHandle) -> Result<(), DriverError> {
        let resolver = ctx.resolver();
        resolver.click(item).await?;

        if let Some(confirm) = resolver
            .optional("content confirm button", ctx.candidates("content.confirm"))
            .await?
        {
            resolver.click(&confirm.node).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Step for SelectContent {
    fn action(&self) -> StepAction {
        StepAction::SelectContent
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> Result<StepResult, StepError> {
        let Some(content_type) = ctx.payload.job.content_type.as_deref() else {
            return Err(StepError::Validation {
                field: "content type".to_string(),
                reason: "not provided".to_string(),
            });
        };

        let attempts = ctx.timings().modal_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.attempt(ctx, content_type).await {
                Ok(Applied::Confirmed) => {
                    info!(content_type, attempt, "Content type selected");
                    return Ok(StepResult::success(format!(
                        "Content type '{}' selected",
                        content_type
                    ))
                    .with_data("contentType", content_type)
                    .with_data("contentAttempts", attempt));
                }
                Ok(Applied::ContextClosed(e)) => {
                    warn!(content_type, attempt, error = %e, "Context closed while applying content type");
                    return Ok(StepResult::success(format!(
                        "Content type '{}' assumed selected (context closed while applying)",
                        content_type
                    ))
                    .with_data("contentType", content_type)
                    .with_data("contentAttempts", attempt)
                    .with_data("ambiguousSuccess", true));
                }
                Err(StepError::Driver(e)) if e.is_context_closed() => {
                    warn!(content_type, attempt, error = %e, "Context closed before content type was chosen");
                    return Ok(StepResult::failure(format!(
                        "Browser context closed before content type '{}' was chosen: {}",
                        content_type, e
                    )));
                }
                Err(e) => {
                    warn!(content_type, attempt, attempts, error = %e, "Content selection attempt failed");
                    last_error = e.to_string();
                    if attempt < attempts {
                        ctx.pause(ctx.timings().modal_cooldown()).await;
                    }
                }
            }
        }

        Ok(StepResult::failure(format!(
            "Content selection failed after {} attempts: {}",
            attempts, last_error
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{MockNode, MockPage};
    use crate::workflow::steps::testing::StepFixture;
    use serde_json::json;

    fn fixture() -> StepFixture {
        StepFixture::new(json!({"job": {"contentType": "Book"}}))
    }

    #[tokio::test]
    async fn test_selects_content_first_try() {
        let fixture = fixture();
        let page = MockPage::permissive();

        let result = SelectContent.execute(&fixture.ctx(&page)).await.unwrap();

        assert!(result.success);
        let data = result.data.unwrap();
        assert_eq!(data["contentAttempts"], 1);
        assert!(page
            .clicks()
            .contains(&"#contentModal [title='Book']".to_string()));
    }

    #[tokio::test]
    async fn test_retries_until_modal_renders() {
        let fixture = fixture();
        // Each attempt sweeps the three item candidates up to three times.
        let page = MockPage::permissive().appear_after("'Book'", 20);

        let result = SelectContent.execute(&fixture.ctx(&page)).await.unwrap();

        assert!(result.success);
        assert_eq!(result.data.unwrap()["contentAttempts"], 3);
    }

    #[tokio::test]
    async fn test_fails_after_all_attempts() {
        let fixture = fixture();
        let page = MockPage::permissive().hide_containing("Book");

        let result = SelectContent.execute(&fixture.ctx(&page)).await.unwrap();

        assert!(!result.success);
        assert!(result.message.contains("after 3 attempts"));
        let opens = page
            .clicks()
            .iter()
            .filter(|c| c.as_str() == "#btnAddContent")
            .count();
        assert_eq!(opens, 3);
    }

    #[tokio::test]
    async fn test_closed_context_is_ambiguous_success() {
        let fixture = fixture();
        let page = MockPage::new()
            .with_node("#btnAddContent", MockNode::default())
            .with_node("#contentModal [title='Book']", MockNode::default())
            .close_context_on_click("#contentModal");

        let result = SelectContent.execute(&fixture.ctx(&page)).await.unwrap();

        assert!(result.success);
        assert_eq!(result.data.unwrap()["ambiguousSuccess"], true);
    }

    #[tokio::test]
    async fn test_context_closed_before_item_click_fails() {
        let fixture = fixture();
        let page = MockPage::new()
            .with_node("#btnAddContent", MockNode::default())
            .with_node("#contentModal [title='Book']", MockNode::default())
            .close_context_on_click("#btnAddContent");

        let result = SelectContent.execute(&fixture.ctx(&page)).await.unwrap();

        assert!(!result.success);
        assert!(result.message.contains("closed before content type 'Book'"));
        assert!(result.data.is_none());
        assert!(page.clicks().is_empty());
    }

    #[tokio::test]
    async fn test_missing_content_type() {
        let fixture = StepFixture::new(json!({}));
        let page = MockPage::permissive();

        let err = SelectContent.execute(&fixture.ctx(&page)).await.unwrap_err();
        assert!(err.to_string().contains("content type"));
    }
}
