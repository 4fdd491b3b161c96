use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::StepError;
use crate::workflow::context::StepContext;
use crate::workflow::step::{Step, StepAction, StepResult};

/// Removes onboarding-tour layers left behind after the tour is skipped.
/// Returns the number of nodes removed.
const REMOVE_OVERLAYS_SCRIPT: &str = r#"(() => {
  const selectors = [
    '.introjs-overlay', '.introjs-helperLayer', '.introjs-tooltipReferenceLayer',
    '.introjs-tooltip', '.shepherd-modal-overlay-container', '.shepherd-element',
    '.modal-backdrop'
  ];
  let removed = 0;
  for (const selector of selectors) {
    document.querySelectorAll(selector).forEach((node) => { node.remove(); removed++; });
  }
  document.body.classList.remove('modal-open', 'introjs-showElement');
  return removed;
})()"#;

/// Clears the onboarding tour. Every part is best effort and the step
/// always succeeds; later clicks force through anything left over.
pub struct DismissTour;

#[async_trait]
impl Step for DismissTour {
    fn action(&self) -> StepAction {
        StepAction::DismissTour
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> Result<StepResult, StepError> {
        let resolver = ctx.resolver();

        let dismissed = match resolver
            .optional("tour dismiss control", ctx.candidates("tour.dismiss"))
            .await
        {
            Ok(Some(control)) => match resolver.click(&control.node).await {
                Ok(()) => true,
                Err(e) => {
                    debug!(error = %e, "Tour dismiss click failed");
                    false
                }
            },
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "Tour dismiss lookup failed");
                false
            }
        };

        let removed = match ctx.page.evaluate(REMOVE_OVERLAYS_SCRIPT).await {
            Ok(value) => value.as_u64().unwrap_or(0),
            Err(e) => {
                debug!(error = %e, "Overlay removal script failed");
                0
            }
        };

        if let Ok(Some(background)) = resolver
            .optional("page background", ctx.candidates("tour.background"))
            .await
        {
            if let Err(e) = resolver.click(&background.node).await {
                debug!(error = %e, "Background click failed");
            }
        }

        ctx.pause(ctx.timings().field_settle()).await;

        Ok(StepResult::success(if dismissed {
            "Onboarding tour dismissed"
        } else {
            "No onboarding tour shown"
        })
        .with_data("tourDismissed", dismissed)
        .with_data("overlaysRemoved", removed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::MockPage;
    use crate::workflow::steps::testing::StepFixture;
    use serde_json::json;

    #[tokio::test]
    async fn test_dismisses_tour_and_clears_overlays() {
        let fixture = StepFixture::new(json!({}));
        let page = MockPage::permissive();

        let result = DismissTour.execute(&fixture.ctx(&page)).await.unwrap();

        assert!(result.success);
        assert_eq!(result.data.unwrap()["tourDismissed"], true);
        assert!(page.clicks().contains(&".introjs-skipbutton".to_string()));
        assert_eq!(page.scripts().len(), 1);
        assert!(page.clicks().contains(&"#main-content".to_string()));
    }

    #[tokio::test]
    async fn test_succeeds_without_tour() {
        let fixture = StepFixture::new(json!({}));
        let page = MockPage::new();

        let result = DismissTour.execute(&fixture.ctx(&page)).await.unwrap();

        assert!(result.success);
        assert_eq!(result.message, "No onboarding tour shown");
    }

    #[tokio::test]
    async fn test_succeeds_when_context_closes() {
        let fixture = StepFixture::new(json!({}));
        let page = MockPage::permissive().close_context_on_click("introjs");

        let result = DismissTour.execute(&fixture.ctx(&page)).await.unwrap();
        assert!(result.success);
    }
}
