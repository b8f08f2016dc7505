//! Observe a procurement portal login page.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use evalrun_core::{EvalCategory, TaskResult};
use evalrun_driver::{GotoOptions, ObserveOptions, SessionOverrides};

use crate::contract::{run_with_session, EvalContext};
use crate::registry::TaskDefinition;
use crate::tasks::{observation_matches, ElementContent};

const EXPECTED_SELECTOR: &str = "div.rowLinks:nth-child(27) > div:nth-child(1) > a:nth-child(1)";

pub const DEFINITION: TaskDefinition = TaskDefinition {
    name: "ionwave_observe",
    prompt: "Observe the page for the text 'El Paso, Texas'",
    start_url: "https://elpasotexas.ionwave.net/Login.aspx",
    output_schema: None,
    tags: &[EvalCategory::Observe],
    run,
};

fn run(ctx: EvalContext) -> BoxFuture<'static, TaskResult> {
    run_with_session(ctx, SessionOverrides::default(), |session, ctx| async move {
        let page = session.page();
        page.goto(DEFINITION.start_url, GotoOptions::default()).await?;

        let observations = page
            .observe(ObserveOptions {
                only_visible: true,
                use_accessibility_tree: ctx.use_accessibility_tree,
                ..Default::default()
            })
            .await?;
        let observed = serde_json::to_value(&observations)?;

        if observations.is_empty() {
            return Ok(TaskResult::new(false).with_field("observations", observed));
        }

        let (expected, found) =
            observation_matches(page, &observations, EXPECTED_SELECTOR, ElementContent::Text)
                .await?;

        Ok(TaskResult::new(found)
            .with_field("expected", expected)
            .with_field("observations", observed))
    })
    .boxed()
}
