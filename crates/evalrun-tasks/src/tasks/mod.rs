//! Task definitions.

pub mod amazon_add_to_cart;
pub mod extract_github_stars;
pub mod extract_press_releases;
pub mod extract_repo_name;
pub mod ionwave_observe;
pub mod nonsense_action;
pub mod peeler_simple;
pub mod simple_google_search;
pub mod vanta;
pub mod wikipedia;

use tracing::warn;

use evalrun_driver::{BrowserSession, DriverError, ObserveResult};

/// How an observed element is compared with the expected one.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ElementContent {
    Html,
    Text,
}

impl ElementContent {
    async fn read(&self, page: &dyn BrowserSession, selector: &str) -> Result<String, DriverError> {
        match self {
            Self::Html => page.inner_html(selector).await,
            Self::Text => page.inner_text(selector).await,
        }
    }
}

/// Whether any observation points at an element whose content equals the
/// content at `expected_selector`.
///
/// Observations whose selector cannot be read are skipped.
pub(crate) async fn observation_matches(
    page: &dyn BrowserSession,
    observations: &[ObserveResult],
    expected_selector: &str,
    content: ElementContent,
) -> Result<(String, bool), DriverError> {
    let expected = content.read(page, expected_selector).await?;

    for observation in observations {
        match content.read(page, &observation.selector).await {
            Ok(actual) if actual == expected => return Ok((expected, true)),
            Ok(_) => {}
            Err(e) => {
                warn!(selector = %observation.selector, error = %e, "Failed to check observation");
            }
        }
    }

    Ok((expected, false))
}
