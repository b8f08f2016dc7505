//! Extract a long list of press releases and spot-check both ends.

use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde::Deserialize;
use serde_json::{json, Value};

use evalrun_core::{compare, AuxiliaryValue, EvalCategory, LogLine, TaskResult};
use evalrun_driver::{ExtractOptions, GotoOptions, SessionOverrides, WaitUntil};

use crate::contract::{run_with_session, EvalContext};
use crate::registry::TaskDefinition;

/// Extractions with this many items or fewer fail.
const MIN_ITEMS: usize = 28;
const SIMILARITY_THRESHOLD: f64 = 0.9;
const DOM_SETTLE_TIMEOUT_MS: u64 = 3000;

pub const DEFINITION: TaskDefinition = TaskDefinition {
    name: "extract_press_releases",
    prompt: "extract the title and corresponding publish date of EACH AND EVERY press releases on this page. DO NOT MISS ANY PRESS RELEASES.",
    start_url: "https://dummy-press-releases.surge.sh/news",
    output_schema: Some(output_schema),
    tags: &[EvalCategory::Extract, EvalCategory::TextExtract],
    run,
};

fn output_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "items": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "title": {
                            "type": "string",
                            "description": "The title of the press release"
                        },
                        "publish_date": {
                            "type": "string",
                            "description": "The date the press release was published"
                        }
                    },
                    "required": ["title", "publish_date"]
                }
            }
        },
        "required": ["items"]
    })
}

#[derive(Debug, Deserialize)]
struct PressReleases {
    items: Vec<PressRelease>,
}

#[derive(Debug, Deserialize)]
struct PressRelease {
    title: String,
    publish_date: String,
}

impl PressRelease {
    fn matches(&self, title: &str, publish_date: &str) -> bool {
        compare(&self.title, title, SIMILARITY_THRESHOLD).meets_threshold
            && compare(&self.publish_date, publish_date, SIMILARITY_THRESHOLD).meets_threshold
    }
}

fn run(ctx: EvalContext) -> BoxFuture<'static, TaskResult> {
    let overrides = SessionOverrides::default().with_dom_settle_timeout_ms(DOM_SETTLE_TIMEOUT_MS);

    run_with_session(ctx, overrides, |session, ctx| async move {
        let page = session.page();
        page.goto(
            DEFINITION.start_url,
            GotoOptions::wait_until(WaitUntil::NetworkIdle),
        )
        .await?;
        page.wait(Duration::from_secs(5)).await?;

        let raw = page
            .extract(
                ExtractOptions::new(DEFINITION.prompt)
                    .with_schema(output_schema())
                    .with_model(ctx.model_name)
                    .with_text_extract(ctx.use_text_extract),
            )
            .await?;
        let PressReleases { items } = serde_json::from_value(raw)?;

        if items.len() <= MIN_ITEMS {
            ctx.logger.error(
                LogLine::error("Not enough items extracted")
                    .with_aux("expected", AuxiliaryValue::string(format!("> {}", MIN_ITEMS)))
                    .with_aux("actual", AuxiliaryValue::integer(items.len() as i64)),
            );
            return Ok(TaskResult::failure("Not enough items extracted"));
        }

        let found_first = items.iter().any(|item| {
            item.matches("UAW Region 9A Endorses Brad Lander for Mayor", "Dec 4, 2024")
        });
        let found_last = items.iter().any(|item| {
            item.matches(
                "Fox Sued by New York City Pension Funds Over Election Falsehoods",
                "Nov 12, 2023",
            )
        });

        Ok(TaskResult::new(found_first && found_last).with_field("itemCount", items.len()))
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{scripted_context, Script};
    use evalrun_core::AvailableModel;

    fn releases(count: usize) -> Value {
        let mut items = vec![
            json!({"title": "UAW Region 9A endorses Brad Lander for mayor!", "publish_date": "Dec 4, 2024"}),
            json!({"title": "Fox Sued by New York City Pension Funds Over Election Falsehoods", "publish_date": "Nov 12 2023"}),
        ];
        for i in items.len()..count {
            items.push(json!({"title": format!("Release {}", i), "publish_date": "Jan 1, 2024"}));
        }
        json!({ "items": items })
    }

    #[tokio::test]
    async fn test_fuzzy_matches_first_and_last() {
        let (ctx, launcher) = scripted_context(
            Script {
                extract_output: Some(releases(30)),
                ..Default::default()
            },
            AvailableModel::Gpt4o,
        );

        let result = run(ctx).await;
        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.payload["itemCount"], json!(30));

        let configs = launcher.configs();
        assert_eq!(configs[0].dom_settle_timeout_ms, Some(DOM_SETTLE_TIMEOUT_MS));
    }

    #[tokio::test]
    async fn test_too_few_items() {
        let (ctx, _launcher) = scripted_context(
            Script {
                extract_output: Some(releases(5)),
                ..Default::default()
            },
            AvailableModel::Gpt4o,
        );

        let result = run(ctx).await;
        assert!(!result.success);
        assert_eq!(result.error, Some(json!("Not enough items extracted")));
        assert!(result.logs.iter().any(|l| l.is_error()));
    }

    #[tokio::test]
    async fn test_exactly_min_items_fails() {
        let (ctx, _launcher) = scripted_context(
            Script {
                extract_output: Some(releases(MIN_ITEMS)),
                ..Default::default()
            },
            AvailableModel::Gpt4o,
        );

        let result = run(ctx).await;
        assert!(!result.success);
        assert_eq!(result.error, Some(json!("Not enough items extracted")));
        let line = result.logs.iter().find(|l| l.is_error()).unwrap();
        assert_eq!(line.auxiliary["expected"].value, "> 28");
        assert_eq!(line.auxiliary["actual"].value, "28");
    }

    #[tokio::test]
    async fn test_malformed_items_fail_task() {
        let (ctx, _launcher) = scripted_context(
            Script {
                extract_output: Some(json!({"items": "none"})),
                ..Default::default()
            },
            AvailableModel::Gpt4o,
        );

        let result = run(ctx).await;
        assert!(!result.success);
        assert_eq!(result.error.unwrap()["name"], "SerializationError");
    }
}
