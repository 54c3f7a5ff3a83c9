use serde::Serialize;
use storefront_catalog::ClientTrait;

/// The message shown to users when the category list can't be loaded.
pub const CATEGORIES_ERROR_MESSAGE: &str = "Failed to load categories";

/// The categories offered for filtering.
///
/// Loaded once per view and never refreshed by facet changes.
/// Failing to load it leaves product queries unaffected.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub enum CategoryDirectory {
    #[default]
    Loading,
    Ready(Vec<String>),
    Failed(String),
}

impl CategoryDirectory {
    pub async fn load(client: &impl ClientTrait) -> Self {
        match client.fetch_categories().await {
            Ok(categories) => {
                tracing::debug!(count = categories.len(), "loaded categories");
                CategoryDirectory::Ready(categories)
            },
            Err(err) => {
                tracing::debug!(error = %err, "failed to load categories");
                CategoryDirectory::Failed(CATEGORIES_ERROR_MESSAGE.to_string())
            },
        }
    }

    /// The loaded slugs, empty while loading or after a failure.
    pub fn categories(&self) -> &[String] {
        match self {
            CategoryDirectory::Ready(categories) => categories,
            _ => &[],
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            CategoryDirectory::Failed(message) => Some(message.as_str()),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, CategoryDirectory::Loading)
    }
}
