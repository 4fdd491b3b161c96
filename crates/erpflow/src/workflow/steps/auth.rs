use async_trait::async_trait;
use secrecy::ExposeSecret;
use tracing::{info, info_span, warn, Instrument};

use crate::error::StepError;
use crate::matcher::MatchKind;
use crate::payload::Credentials;
use crate::sanitize;
use crate::workflow::context::StepContext;
use crate::workflow::forms::choose_option;
use crate::workflow::step::{Step, StepAction, StepResult};

/// Selector keys for one login form.
struct LoginForm {
    section: &'static str,
    username: &'static str,
    password: &'static str,
    submit: &'static str,
}

const COMPANY_FORM: LoginForm = LoginForm {
    section: "Company",
    username: "login.company.username",
    password: "login.company.password",
    submit: "login.company.submit",
};

const USER_FORM: LoginForm = LoginForm {
    section: "User",
    username: "login.user.username",
    password: "login.user.password",
    submit: "login.user.submit",
};

/// Returns the username and password, or the missing field names.
fn require_credentials<'p>(
    form: &LoginForm,
    credentials: Option<&'p Credentials>,
) -> Result<(&'p str, &'p str), StepError> {
    let missing = match credentials {
        Some(creds) => creds.missing_fields(),
        None => vec!["username", "password"],
    };
    match credentials {
        Some(Credentials {
            username: Some(username),
            password: Some(password),
        }) if missing.is_empty() => Ok((username.trim(), password.expose_secret())),
        _ => Err(StepError::CredentialsMissing {
            section: form.section.to_string(),
            missing: missing.join(", "),
        }),
    }
}

/// Fills username and password. The form nodes are required; their
/// absence fails the step.
async fn fill_credentials(
    ctx: &StepContext<'_>,
    form: &LoginForm,
    username: &str,
    password: &str,
) -> Result<(), StepError> {
    let resolver = ctx.resolver();
    let section = form.section.to_lowercase();

    let user_field = resolver
        .require(&format!("{section} username"), ctx.candidates(form.username))
        .await?;
    let password_field = resolver
        .require(&format!("{section} password"), ctx.candidates(form.password))
        .await?;

    resolver.click(&user_field.node).await?;
    ctx.page.fill(&user_field.node, username).await?;
    ctx.pause(ctx.timings().field_settle()).await;
    ctx.page.fill(&password_field.node, password).await?;
    ctx.pause(ctx.timings().field_settle()).await;
    Ok(())
}

async fn submit(ctx: &StepContext<'_>, form: &LoginForm) -> Result<(), StepError> {
    let resolver = ctx.resolver();
    let button = resolver
        .require(
            &format!("{} login button", form.section.to_lowercase()),
            ctx.candidates(form.submit),
        )
        .await?;
    resolver.click(&button.node).await?;
    Ok(())
}

pub struct CompanyLogin;

#[async_trait]
impl Step for CompanyLogin {
    fn action(&self) -> StepAction {
        StepAction::CompanyLogin
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> Result<StepResult, StepError> {
        let (username, password) = require_credentials(&COMPANY_FORM, ctx.payload.company.as_ref())?;
        let login = sanitize::redact_login(username);

        async {
            fill_credentials(ctx, &COMPANY_FORM, username, password).await?;
            submit(ctx, &COMPANY_FORM).await?;
            info!("Company login submitted");
            Ok(StepResult::success(format!("Company login submitted for {}", login)))
        }
        .instrument(info_span!("company_login", login = %login))
        .await
    }
}

pub struct UserLogin;

#[async_trait]
impl Step for UserLogin {
    fn action(&self) -> StepAction {
        StepAction::UserLogin
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> Result<StepResult, StepError> {
        let (username, password) = require_credentials(&USER_FORM, ctx.payload.user.as_ref())?;
        let login = sanitize::redact_login(username);

        async {
            fill_credentials(ctx, &USER_FORM, username, password).await?;

            let resolver = ctx.resolver();
            let year_control = resolver
                .require("financial year selector", ctx.candidates("login.user.year"))
                .await?;

            let mut result = StepResult::success(format!("User login submitted for {}", login));
            match ctx.payload.financial_year.as_deref() {
                Some(year) => {
                    resolver.click(&year_control.node).await?;
                    ctx.pause(ctx.timings().dropdown_wait()).await;
                    match choose_option(ctx, year, MatchKind::Generic).await? {
                        Some((chosen, _)) => {
                            result = result.with_data("financialYear", chosen);
                        }
                        None => {
                            warn!(year, "Financial year list empty, keeping default");
                            result = result
                                .with_data("financialYear", "default")
                                .with_errors(vec![format!(
                                    "Financial year '{}' not offered; default year kept",
                                    year
                                )]);
                        }
                    }
                }
                None => {
                    result = result.with_data("financialYear", "default");
                }
            }

            submit(ctx, &USER_FORM).await?;
            info!("User login submitted");
            Ok(result)
        }
        .instrument(info_span!("user_login", login = %login))
        .await
    }
}
