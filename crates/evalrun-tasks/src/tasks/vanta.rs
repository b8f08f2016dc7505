//! Observe the Vanta home page after dismissing the cookie banner.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use evalrun_core::{EvalCategory, TaskResult};
use evalrun_driver::{ActOptions, GotoOptions, ObserveOptions, SessionOverrides};

use crate::contract::{run_with_session, EvalContext};
use crate::registry::TaskDefinition;
use crate::tasks::{observation_matches, ElementContent};

const EXPECTED_SELECTOR: &str = "body > div.page-wrapper > div.nav_component > div.nav_element.w-nav > div.padding-global > div > div > nav > div.nav_cta-wrapper.is-new > a.nav_link.is-tablet-margin-0.w-nav-link";

pub const DEFINITION: TaskDefinition = TaskDefinition {
    name: "vanta",
    prompt: "close the cookies popup",
    start_url: "https://www.vanta.com/",
    output_schema: None,
    tags: &[EvalCategory::Observe],
    run,
};

fn run(ctx: EvalContext) -> BoxFuture<'static, TaskResult> {
    run_with_session(ctx, SessionOverrides::default(), |session, ctx| async move {
        let page = session.page();
        page.goto(DEFINITION.start_url, GotoOptions::default()).await?;
        page.act(ActOptions::new(DEFINITION.prompt)).await?;

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
            observation_matches(page, &observations, EXPECTED_SELECTOR, ElementContent::Html)
                .await?;

        Ok(TaskResult::new(found)
            .with_field("expected", expected)
            .with_field("observations", observed))
    })
    .boxed()
}
