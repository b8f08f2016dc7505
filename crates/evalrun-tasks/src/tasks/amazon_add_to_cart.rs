//! Add a product to the cart and reach the checkout sign-in.

use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use evalrun_core::{EvalCategory, TaskResult};
use evalrun_driver::{ActOptions, GotoOptions, SessionOverrides};

use crate::contract::{run_with_session, EvalContext};
use crate::registry::TaskDefinition;

const PRODUCT_URL: &str =
    "https://www.amazon.com/Laptop-MacBook-Surface-Water-Resistant-Accessories/dp/B0D5M4H5CD";
const EXPECTED_URL_PREFIX: &str = "https://www.amazon.com/ap/signin";

pub const DEFINITION: TaskDefinition = TaskDefinition {
    name: "amazon_add_to_cart",
    prompt: "Add a MacBook to the cart",
    start_url: PRODUCT_URL,
    output_schema: None,
    tags: &[EvalCategory::Combination],
    run,
};

fn run(ctx: EvalContext) -> BoxFuture<'static, TaskResult> {
    run_with_session(ctx, SessionOverrides::default(), |session, _ctx| async move {
        let page = session.page();
        page.goto(PRODUCT_URL, GotoOptions::default()).await?;
        page.wait(Duration::from_secs(5)).await?;

        page.act(ActOptions::new("click the 'Add to Cart' button")).await?;
        page.wait(Duration::from_secs(2)).await?;

        page.act(ActOptions::new("click the 'Proceed to checkout' button"))
            .await?;
        page.wait(Duration::from_secs(2)).await?;

        let current_url = page.url().await?;
        Ok(TaskResult::new(current_url.starts_with(EXPECTED_URL_PREFIX))
            .with_field("currentUrl", current_url))
    })
    .boxed()
}
