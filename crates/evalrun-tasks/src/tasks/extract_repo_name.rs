//! Extract a repository name without a schema.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use evalrun_core::{AuxiliaryValue, EvalCategory, LogLine, TaskResult};
use evalrun_driver::{ExtractOptions, GotoOptions, SessionOverrides};

use crate::contract::{run_with_session, EvalContext, TaskError};
use crate::registry::TaskDefinition;

pub const DEFINITION: TaskDefinition = TaskDefinition {
    name: "extract_repo_name",
    prompt: "extract the title of the Github repository. Do not include the owner of the repository.",
    start_url: "https://github.com/facebook/react",
    output_schema: None,
    tags: &[EvalCategory::Extract],
    run,
};

fn run(ctx: EvalContext) -> BoxFuture<'static, TaskResult> {
    run_with_session(ctx, SessionOverrides::default(), |session, ctx| async move {
        let page = session.page();
        page.goto(DEFINITION.start_url, GotoOptions::default()).await?;

        let output = page
            .extract(
                ExtractOptions::new(DEFINITION.prompt)
                    .with_model(ctx.model_name)
                    .with_text_extract(ctx.use_text_extract),
            )
            .await?;

        let extraction = output
            .get("extraction")
            .and_then(|v| v.as_str())
            .ok_or_else(|| TaskError::UnexpectedOutput(format!("no extraction in {}", output)))?
            .to_string();

        ctx.logger.log(
            LogLine::info("Extracted repo title")
                .with_aux("repo_name", AuxiliaryValue::string(&extraction)),
        );

        Ok(TaskResult::new(extraction == "react").with_field("extraction", extraction))
    })
    .boxed()
}
