/// Join an error and all of its sources into a single line.
pub fn display_chain(mut err: &dyn std::error::Error) -> String {
    let mut fmt = err.to_string();
    while let Some(source) = err.source() {
        fmt = format!("{fmt}: {source}");
        err = source;
    }

    fmt
}

#[cfg(test)]
mod tests {
    use storefront_catalog::{CatalogClientError, ProductId};
    use storefront_sdk::query::{FetchError, FetchStrategy};

    use super::*;

    #[test]
    fn chain_includes_sources() {
        let err = FetchError {
            strategy: FetchStrategy::Search("lamp".to_string()),
            source: CatalogClientError::NotFound(ProductId::new(4)),
        };
        assert_eq!(
            display_chain(&err),
            "failed to fetch search 'lamp': product 4 not found"
        );
    }
}
