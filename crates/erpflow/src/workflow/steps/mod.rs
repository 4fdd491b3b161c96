//! The estimation workflow, one type per step.

mod auth;
mod content;
mod finalize;
mod navigation;
mod overlay;
mod processes;
mod segments;

pub use auth::{CompanyLogin, UserLogin};
pub use content::SelectContent;
pub use finalize::{CalculateCost, CaptureScreenshot};
pub use navigation::{OpenEstimation, OpenLoginPage};
pub use overlay::DismissTour;
pub use processes::{AddRequiredProcesses, AddSupplementaryProcesses, OpenProcessTab};
pub use segments::{FillFinishing, FillJobDetails, FillJobSize, FillMaterial, FillPrinting};

use super::step::Step;

/// The 16 steps in run order.
pub fn standard() -> Vec<Box<dyn Step>> {
    vec![
        Box::new(OpenLoginPage),
        Box::new(CompanyLogin),
        Box::new(UserLogin),
        Box::new(DismissTour),
        Box::new(OpenEstimation),
        Box::new(SelectContent),
        Box::new(FillJobDetails),
        Box::new(FillJobSize),
        Box::new(FillMaterial),
        Box::new(FillPrinting),
        Box::new(FillFinishing),
        Box::new(OpenProcessTab),
        Box::new(AddRequiredProcesses),
        Box::new(AddSupplementaryProcesses),
        Box::new(CalculateCost),
        Box::new(CaptureScreenshot),
    ]
}


#[cfg(test)]
pub(crate) mod testing {
    use crate::config::{EngineConfig, SelectorCatalog, Timings};
    use crate::driver::MockPage;
    use crate::payload::JobPayload;
    use crate::workflow::context::StepContext;
    use crate::workflow::step::DataMap;

    /// Owns everything a `StepContext` borrows.
    pub struct StepFixture {
        pub config: EngineConfig,
        pub selectors: SelectorCatalog,
        pub payload: JobPayload,
        pub data: DataMap,
    }

    impl StepFixture {
        pub fn new(payload: serde_json::Value) -> Self {
            let config =
                EngineConfig::new("https://erp.example.com").with_timings(Timings::immediate());
            let selectors = config.selector_catalog();
            Self {
                config,
                selectors,
                payload: JobPayload::from_json(payload).unwrap(),
                data: DataMap::new(),
            }
        }

        pub fn ctx<'a>(&'a self, page: &'a MockPage) -> StepContext<'a> {
            StepContext {
                page,
                payload: &self.payload,
                config: &self.config,
                selectors: &self.selectors,
                data: &self.data,
            }
        }
    }
}
