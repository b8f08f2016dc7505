//! Extract a repository's star count and check it against the page.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::{json, Value};

use evalrun_core::{EvalCategory, TaskResult};
use evalrun_driver::{ExtractOptions, GotoOptions, SessionOverrides};

use crate::contract::{run_with_session, EvalContext, TaskError};
use crate::registry::TaskDefinition;

const STAR_COUNTER_SELECTOR: &str = "#repo-stars-counter-star";
const TOLERANCE: f64 = 1000.0;

pub const DEFINITION: TaskDefinition = TaskDefinition {
    name: "extract_github_stars",
    prompt: "Extract the number of stars for the project",
    start_url: "https://github.com/facebook/react",
    output_schema: Some(output_schema),
    tags: &[EvalCategory::Extract, EvalCategory::TextExtract],
    run,
};

fn output_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "stars": {
                "type": "number",
                "description": "the number of stars for the project"
            }
        },
        "required": ["stars"]
    })
}

/// Parse a rendered counter such as `"231k"` or `"1,204"`.
pub(crate) fn parse_star_count(rendered: &str) -> Option<f64> {
    let cleaned = rendered.trim().replace(',', "").to_lowercase();
    match cleaned.strip_suffix('k') {
        Some(thousands) => thousands.trim().parse::<f64>().ok().map(|n| n * 1000.0),
        None => cleaned.parse::<f64>().ok(),
    }
}

fn run(ctx: EvalContext) -> BoxFuture<'static, TaskResult> {
    run_with_session(ctx, SessionOverrides::default(), |session, ctx| async move {
        let page = session.page();
        page.goto(DEFINITION.start_url, GotoOptions::default()).await?;

        let output = page
            .extract(
                ExtractOptions::new(DEFINITION.prompt)
                    .with_schema(output_schema())
                    .with_model(ctx.model_name)
                    .with_text_extract(ctx.use_text_extract),
            )
            .await?;
        let stars = output
            .get("stars")
            .and_then(Value::as_f64)
            .ok_or_else(|| TaskError::UnexpectedOutput(format!("no numeric stars in {}", output)))?;

        let rendered = page.inner_html(STAR_COUNTER_SELECTOR).await?;
        let expected = parse_star_count(&rendered).ok_or_else(|| {
            TaskError::UnexpectedOutput(format!("unreadable star counter {:?}", rendered))
        })?;

        Ok(TaskResult::new((stars - expected).abs() <= TOLERANCE).with_field("stars", stars))
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{scripted_context, Script};
    use evalrun_core::AvailableModel;
    use std::collections::HashMap;

    #[test]
    fn test_parse_star_count() {
        assert_eq!(parse_star_count("231k"), Some(231_000.0));
        assert_eq!(parse_star_count(" 1.5K "), Some(1_500.0));
        assert_eq!(parse_star_count("1,204"), Some(1_204.0));
        assert_eq!(parse_star_count("lots"), None);
    }

    #[tokio::test]
    async fn test_within_tolerance() {
        let mut inner_html = HashMap::new();
        inner_html.insert(STAR_COUNTER_SELECTOR.to_string(), "231k".to_string());

        let (ctx, launcher) = scripted_context(
            Script {
                extract_output: Some(json!({"stars": 230_500})),
                inner_html,
                ..Default::default()
            },
            AvailableModel::Gpt4o,
        );

        let result = run(ctx).await;
        assert!(result.success);
        assert_eq!(result.payload["stars"], json!(230_500.0));
        assert_eq!(launcher.last_session().extracted()[0].schema, Some(output_schema()));
    }

    #[tokio::test]
    async fn test_outside_tolerance() {
        let mut inner_html = HashMap::new();
        inner_html.insert(STAR_COUNTER_SELECTOR.to_string(), "231k".to_string());

        let (ctx, _launcher) = scripted_context(
            Script {
                extract_output: Some(json!({"stars": 120_000})),
                inner_html,
                ..Default::default()
            },
            AvailableModel::Gpt4o,
        );

        let result = run(ctx).await;
        assert!(!result.success);
        assert!(result.error.is_none());
    }
}
