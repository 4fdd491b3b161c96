use async_trait::async_trait;
use tracing::info;

use crate::error::{DriverError, StepError};
use crate::sanitize;
use crate::workflow::context::StepContext;
use crate::workflow::step::{Step, StepAction, StepResult};

/// Loads `url` with the extended navigation timeout. A timeout is reported
/// as the server being unreachable rather than as a generic failure.
async fn navigate(ctx: &StepContext<'_>, url: &str) -> Result<StepResult, StepError> {
    let timeout = ctx.timings().navigation_timeout();
    let shown = sanitize::redact_url(url);

    match ctx.page.goto(url, timeout).await {
        Ok(()) => {}
        Err(DriverError::NavigationTimeout { .. }) => {
            return Err(StepError::NavigationTimeout {
                url: shown,
                timeout_secs: timeout.as_secs(),
            });
        }
        Err(e) if e.is_context_closed() => return Err(e.into()),
        Err(e) => {
            return Err(StepError::Navigation {
                url: shown,
                reason: e.to_string(),
            });
        }
    }

    let title = ctx.page.title().await.unwrap_or_default();
    info!(url = %shown, title = %title, "Page loaded");

    Ok(StepResult::success(format!("Opened {}", shown))
        .with_data("pageTitle", title)
        .with_data("pageUrl", shown))
}

pub struct OpenLoginPage;

#[async_trait]
impl Step for OpenLoginPage {
    fn action(&self) -> StepAction {
        StepAction::OpenLoginPage
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> Result<StepResult, StepError> {
        navigate(ctx, &ctx.config.login_url()).await
    }
}

pub struct OpenEstimation;

#[async_trait]
impl Step for OpenEstimation {
    fn action(&self) -> StepAction {
        StepAction::OpenEstimation
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> Result<StepResult, StepError> {
        navigate(ctx, &ctx.config.estimation_url()).await
    }
}
