use async_trait::async_trait;

use crate::error::StepError;
use crate::matcher::MatchKind;
use crate::payload::Margins;
use crate::workflow::context::StepContext;
use crate::workflow::forms::{fill_segment, FieldSpec};
use crate::workflow::step::{Step, StepAction, StepResult};

const CLIENT: FieldSpec = FieldSpec::search("job.client", "Client", MatchKind::Client).required();
const QUANTITY: FieldSpec = FieldSpec::numeric("job.quantity", "Quantity").required();
const JOB_NAME: FieldSpec = FieldSpec::text("job.name", "Job name");

const CLOSED_HEIGHT: FieldSpec =
    FieldSpec::numeric("size.closed_height", "Closed height").required();
const CLOSED_LENGTH: FieldSpec =
    FieldSpec::numeric("size.closed_length", "Closed length").required();
const OPEN_HEIGHT: FieldSpec = FieldSpec::numeric("size.open_height", "Open height");
const OPEN_LENGTH: FieldSpec = FieldSpec::numeric("size.open_length", "Open length");
const SPINE: FieldSpec = FieldSpec::numeric("size.spine", "Spine");

const QUALITY: FieldSpec =
    FieldSpec::search("material.quality", "Quality", MatchKind::Material).required();
const GSM: FieldSpec = FieldSpec::search("material.gsm", "GSM", MatchKind::BasisWeight).required();
const MILL: FieldSpec = FieldSpec::search("material.mill", "Mill", MatchKind::Mill);
const FINISH: FieldSpec = FieldSpec::search("material.finish", "Finish", MatchKind::Finish);

const FRONT_COLORS: FieldSpec =
    FieldSpec::numeric("printing.front_colors", "Front colours").required();
const BACK_COLORS: FieldSpec = FieldSpec::numeric("printing.back_colors", "Back colours");
const SPECIAL_COLORS: FieldSpec = FieldSpec::numeric("printing.special_colors", "Special colours");
const PRINTING_STYLE: FieldSpec =
    FieldSpec::search("printing.style", "Printing style", MatchKind::Generic);
const PLATE_TYPE: FieldSpec = FieldSpec::search("printing.plate_type", "Plate type", MatchKind::Generic);

const MAKE_READY: FieldSpec = FieldSpec::numeric("finishing.make_ready", "Make-ready sheets");
const WASTAGE_TYPE: FieldSpec =
    FieldSpec::search("finishing.wastage_type", "Wastage type", MatchKind::Generic);
const GRAIN: FieldSpec =
    FieldSpec::search("finishing.grain_direction", "Grain direction", MatchKind::Generic);
const COATING: FieldSpec = FieldSpec::search("finishing.coating", "Coating", MatchKind::Coating);

const TRIM: [FieldSpec; 4] = [
    FieldSpec::numeric("finishing.trim_top", "Trim top"),
    FieldSpec::numeric("finishing.trim_bottom", "Trim bottom"),
    FieldSpec::numeric("finishing.trim_left", "Trim left"),
    FieldSpec::numeric("finishing.trim_right", "Trim right"),
];

const STRIP: [FieldSpec; 4] = [
    FieldSpec::numeric("finishing.strip_top", "Strip top"),
    FieldSpec::numeric("finishing.strip_bottom", "Strip bottom"),
    FieldSpec::numeric("finishing.strip_left", "Strip left"),
    FieldSpec::numeric("finishing.strip_right", "Strip right"),
];

fn margin_fields<'p>(
    specs: &'static [FieldSpec; 4],
    margins: Option<&'p Margins>,
) -> impl Iterator<Item = (FieldSpec, Option<&'p str>)> + 'p {
    specs
        .iter()
        .enumerate()
        .map(move |(i, spec)| (*spec, margins.map(|m| m.0[i].as_str())))
}

pub struct FillJobDetails;

#[async_trait]
impl Step for FillJobDetails {
    fn action(&self) -> StepAction {
        StepAction::FillJobDetails
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> Result<StepResult, StepError> {
        let job = &ctx.payload.job;
        let fields = [
            (CLIENT, job.client.as_deref()),
            (QUANTITY, job.quantity.as_deref()),
            (JOB_NAME, job.job_name.as_deref()),
        ];
        fill_segment(ctx, "job_details", &fields).await
    }
}

pub struct FillJobSize;

#[async_trait]
impl Step for FillJobSize {
    fn action(&self) -> StepAction {
        StepAction::FillJobSize
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> Result<StepResult, StepError> {
        let size = &ctx.payload.size;
        let fields = [
            (CLOSED_HEIGHT, size.closed_height.as_deref()),
            (CLOSED_LENGTH, size.closed_length.as_deref()),
            (OPEN_HEIGHT, size.open_height.as_deref()),
            (OPEN_LENGTH, size.open_length.as_deref()),
            (SPINE, size.spine.as_deref()),
        ];
        fill_segment(ctx, "job_size", &fields).await
    }
}

pub struct FillMaterial;

#[async_trait]
impl Step for FillMaterial {
    fn action(&self) -> StepAction {
        StepAction::FillMaterial
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> Result<StepResult, StepError> {
        let material = &ctx.payload.material;
        let fields = [
            (QUALITY, material.quality.as_deref()),
            (GSM, material.gsm.as_deref()),
            (MILL, material.mill.as_deref()),
            (FINISH, material.finish.as_deref()),
        ];
        fill_segment(ctx, "material", &fields).await
    }
}

pub struct FillPrinting;

#[async_trait]
impl Step for FillPrinting {
    fn action(&self) -> StepAction {
        StepAction::FillPrinting
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> Result<StepResult, StepError> {
        let printing = &ctx.payload.printing;
        let fields = [
            (FRONT_COLORS, printing.front_colors.as_deref()),
            (BACK_COLORS, printing.back_colors.as_deref()),
            (SPECIAL_COLORS, printing.special_colors.as_deref()),
            (PRINTING_STYLE, printing.style.as_deref()),
            (PLATE_TYPE, printing.plate_type.as_deref()),
        ];
        fill_segment(ctx, "printing", &fields).await
    }
}

pub struct FillFinishing;

#[async_trait]
impl Step for FillFinishing {
    fn action(&self) -> StepAction {
        StepAction::FillFinishing
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> Result<StepResult, StepError> {
        let finishing = &ctx.payload.finishing;
        let mut fields = vec![
            (MAKE_READY, finishing.make_ready_count.as_deref()),
            (WASTAGE_TYPE, finishing.wastage_type.as_deref()),
            (GRAIN, finishing.grain_direction.as_deref()),
            (COATING, finishing.coating.as_deref()),
        ];
        fields.extend(margin_fields(&TRIM, finishing.trim_margins.as_ref()));
        fields.extend(margin_fields(&STRIP, finishing.strip_margins.as_ref()));
        fill_segment(ctx, "finishing", &fields).await
    }
}
