//! Follow an in-article link on Wikipedia.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use evalrun_core::{EvalCategory, TaskResult};
use evalrun_driver::{ActOptions, GotoOptions, SessionOverrides};

use crate::contract::{run_with_session, EvalContext};
use crate::registry::TaskDefinition;

const START_URL: &str = "https://en.wikipedia.org/wiki/Baseball";
const EXPECTED_URL: &str = "https://en.wikipedia.org/wiki/Hit_and_run_(baseball)";

pub const DEFINITION: TaskDefinition = TaskDefinition {
    name: "wikipedia",
    prompt: r#"click the "hit and run" link in this article"#,
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
        Ok(TaskResult::new(current_url == EXPECTED_URL)
            .with_field("expected", EXPECTED_URL)
            .with_field("actual", current_url))
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{external_context, scripted_context, Script};
    use evalrun_core::AvailableModel;
    use serde_json::json;

    #[tokio::test]
    async fn test_lands_on_linked_article() {
        let (ctx, launcher) = scripted_context(
            Script {
                url_after_act: Some(EXPECTED_URL.to_string()),
                ..Default::default()
            },
            AvailableModel::Gpt4o,
        );

        let result = run(ctx).await;
        assert!(result.success);
        assert_eq!(result.payload["actual"], json!(EXPECTED_URL));
        assert_eq!(launcher.last_session().visited(), vec![START_URL.to_string()]);
        assert_eq!(launcher.closed_sessions(), 1);
    }

    #[tokio::test]
    async fn test_runs_on_handed_in_session() {
        let (ctx, session) = external_context(
            Script {
                url_after_act: Some(EXPECTED_URL.to_string()),
                ..Default::default()
            },
            AvailableModel::Gpt4oMini,
        );

        let result = run(ctx).await;
        assert!(result.success);
        assert_eq!(result.session_url.as_deref(), Some("https://session.example/external"));
        assert_eq!(session.visited(), vec![START_URL.to_string()]);
        assert_eq!(session.close_count(), 1);
    }

    #[tokio::test]
    async fn test_wrong_page_fails() {
        let (ctx, _launcher) = scripted_context(Script::default(), AvailableModel::Gpt4o);
        let result = run(ctx).await;
        assert!(!result.success);
        assert!(result.error.is_none());
    }
}
