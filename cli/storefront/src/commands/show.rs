use anyhow::{Context, Result, bail};
use bpaf::Bpaf;
use storefront_catalog::{CatalogClientError, Client, ClientTrait, Product, ProductId};
use tracing::instrument;

use crate::utils::render::{DisplayProduct, stdout_is_pretty};

// Show details about a single product
#[derive(Debug, Bpaf, Clone)]
pub struct Show {
    /// Print the product as JSON
    #[bpaf(long)]
    pub json: bool,

    /// The id of the product, as shown by `storefront list`
    #[bpaf(positional("ID"))]
    pub id: ProductId,
}

impl Show {
    #[instrument(name = "show", skip_all, fields(id = %self.id))]
    pub async fn handle(self, client: Client) -> Result<()> {
        let product = fetch_product(&client, self.id).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&product)?);
        } else {
            println!("{}", DisplayProduct {
                product: &product,
                pretty: stdout_is_pretty(),
            });
        }
        Ok(())
    }
}

async fn fetch_product(client: &impl ClientTrait, id: ProductId) -> Result<Product> {
    match client.fetch_by_id(id).await {
        Ok(product) => Ok(product),
        Err(CatalogClientError::NotFound(_)) => bail!("no product with id {id}"),
        Err(err) => Err(err).with_context(|| format!("failed to load product {id}")),
    }
}
