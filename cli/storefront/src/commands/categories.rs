use anyhow::{Result, bail};
use bpaf::Bpaf;
use storefront_catalog::Client;
use storefront_sdk::categories::CategoryDirectory;
use tracing::instrument;

use crate::utils::render::DisplayCategories;

// List the product categories
#[derive(Debug, Bpaf, Clone)]
pub struct Categories {
    /// Print the category slugs as a JSON list
    #[bpaf(long)]
    pub json: bool,
}

impl Categories {
    #[instrument(name = "categories", skip_all)]
    pub async fn handle(self, client: Client) -> Result<()> {
        let directory = CategoryDirectory::load(&client).await;
        println!("{}", render_categories(&directory, self.json)?);
        Ok(())
    }
}

fn render_categories(directory: &CategoryDirectory, json: bool) -> Result<String> {
    if let Some(error) = directory.error() {
        bail!("{error}");
    }
    if json {
        return Ok(serde_json::to_string_pretty(directory.categories())?);
    }
    Ok(DisplayCategories(directory.categories()).to_string())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use storefront_catalog::{CategoryEntry, MockClient};
    use storefront_sdk::categories::CATEGORIES_ERROR_MESSAGE;

    use super::*;

    #[tokio::test]
    async fn renders_json_slugs() {
        let mut client = MockClient::default();
        client.push_categories_response(vec![
            CategoryEntry::Slug("laptops".to_string()),
            CategoryEntry::Slug("skin-care".to_string()),
        ]);

        let directory = CategoryDirectory::load(&client).await;
        let rendered = render_categories(&directory, true).unwrap();

        let slugs: Vec<String> = serde_json::from_str(&rendered).unwrap();
        assert_eq!(slugs, ["laptops", "skin-care"]);
    }

    #[tokio::test]
    async fn failure_is_an_error() {
        let mut client = MockClient::default();
        client.push_error_response(502);

        let directory = CategoryDirectory::load(&client).await;
        let err = render_categories(&directory, false).unwrap_err();
        assert_eq!(err.to_string(), CATEGORIES_ERROR_MESSAGE);
    }
}
