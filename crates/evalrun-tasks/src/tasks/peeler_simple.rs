//! Add an item to the cart on a local test page.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use evalrun_core::{EvalCategory, TaskResult};
use evalrun_driver::{ActOptions, Environment, GotoOptions, SessionOverrides};

use crate::contract::{run_with_session, EvalContext, TaskError};
use crate::registry::TaskDefinition;

/// Page served from the working directory.
const ASSET_PATH: &str = "evals/assets/peeler.html";
const SUCCESS_SELECTOR: &str = r#"text="Congratulations, you have 1 A in your cart""#;

pub const DEFINITION: TaskDefinition = TaskDefinition {
    name: "peeler_simple",
    prompt: "add the peeler to cart",
    start_url: "file://evals/assets/peeler.html",
    output_schema: None,
    tags: &[EvalCategory::Act],
    run,
};

fn run(ctx: EvalContext) -> BoxFuture<'static, TaskResult> {
    run_with_session(ctx, SessionOverrides::default(), |session, _ctx| async move {
        if session.env() == Environment::Browserbase {
            return Err(TaskError::Unsupported(
                "the hosted sandbox blocks file:// requests".to_string(),
            ));
        }

        let asset = std::env::current_dir()?.join(ASSET_PATH);
        let page = session.page();
        page.goto(&format!("file://{}", asset.display()), GotoOptions::default())
            .await?;
        page.act(ActOptions::new(DEFINITION.prompt)).await?;

        let is_visible = page.is_visible(SUCCESS_SELECTOR).await?;
        Ok(TaskResult::new(is_visible))
    })
    .boxed()
}
