//! An impossible instruction must be reported as not completed.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::json;

use evalrun_core::{EvalCategory, TaskResult};
use evalrun_driver::{ActOptions, GotoOptions, SessionOverrides};

use crate::contract::{run_with_session, EvalContext};
use crate::registry::TaskDefinition;

const ACTION: &str = "click on the first banana";

pub const DEFINITION: TaskDefinition = TaskDefinition {
    name: "nonsense_action",
    prompt: ACTION,
    start_url: "https://www.homedepot.com/",
    output_schema: None,
    tags: &[EvalCategory::Act],
    run,
};

fn run(ctx: EvalContext) -> BoxFuture<'static, TaskResult> {
    run_with_session(ctx, SessionOverrides::default(), |session, _ctx| async move {
        let page = session.page();
        page.goto(DEFINITION.start_url, GotoOptions::default()).await?;

        let result = page.act(ActOptions::new(ACTION)).await?;
        let expected = json!({
            "success": false,
            "message": "Action was not able to be completed.",
            "action": ACTION,
        });

        Ok(TaskResult::new(result == expected).with_field("result", result))
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{scripted_context, Script};
    use evalrun_core::AvailableModel;

    #[tokio::test]
    async fn test_refusal_is_success() {
        let (ctx, _launcher) = scripted_context(
            Script {
                act_output: Some(json!({
                    "success": false,
                    "message": "Action was not able to be completed.",
                    "action": ACTION,
                })),
                ..Default::default()
            },
            AvailableModel::Gpt4o,
        );
        assert!(run(ctx).await.success);
    }

    #[tokio::test]
    async fn test_claimed_completion_is_failure() {
        let (ctx, _launcher) = scripted_context(Script::default(), AvailableModel::Gpt4o);
        let result = run(ctx).await;
        assert!(!result.success);
        assert_eq!(result.payload["result"]["success"], json!(true));
    }
}
