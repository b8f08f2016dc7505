//! Run a search from the Google home page.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use evalrun_core::{EvalCategory, TaskResult};
use evalrun_driver::{ActOptions, GotoOptions, SessionOverrides};

use crate::contract::{run_with_session, EvalContext};
use crate::registry::TaskDefinition;

const START_URL: &str = "https://www.google.com";
const EXPECTED_URL_PREFIX: &str = "https://www.google.com/search?q=OpenAI";

pub const DEFINITION: TaskDefinition = TaskDefinition {
    name: "simple_google_search",
    prompt: r#"Search for "OpenAI""#,
    start_url: START_URL,
    output_schema: None,
    tags: &[EvalCategory::Act],
    run,
};

fn run(ctx: EvalContext) -> BoxFuture<'static, TaskResult> {
    run_with_session(ctx, SessionOverrides::default(), |session, _ctx| async move {
        let page = session.page();
        page.goto(START_URL, GotoOptions::default()).await?;
        page.act(ActOptions::new(DEFINITION.prompt)).await?;

        let current_url = page.url().await?;
        Ok(TaskResult::new(current_url.starts_with(EXPECTED_URL_PREFIX))
            .with_field("currentUrl", current_url))
    })
    .boxed()
}
