//! Text rendering of listing, detail and category views.

use std::fmt::Display;
use std::io::IsTerminal;

use crossterm::style::Stylize;
use indoc::formatdoc;
use storefront_catalog::Product;
use storefront_sdk::session::{CatalogView, ListingSummary, display_category};

/// Number of images the detail view lists.
const DETAIL_IMAGES: usize = 4;

/// Whether stdout is a terminal that should get bold text and color.
pub fn stdout_is_pretty() -> bool {
    std::io::stdout().is_terminal()
}

/// A listing page, or the error replacing it.
///
/// ```text
/// Showing 1-12 of 24 products in "smartphones"
/// Price range: $0 - $500
///
///    1  iPhone 9   $549.00  ★ 4.7  smartphones
///   ...
///
/// Page 1 of 2 • 12 per page
/// Share: ?category=smartphones&maxPrice=500
/// ```
pub struct DisplayListing<'a> {
    pub view: &'a CatalogView<'a>,
    pub summary: &'a ListingSummary,
    pub share_query: &'a str,
    /// How to retry after a failure, shown below the error.
    pub retry_hint: &'a str,
    pub pretty: bool,
}

impl Display for DisplayListing<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(error) = self.view.error {
            let heading = "Something went wrong";
            if self.pretty {
                writeln!(f, "{}", heading.red().bold())?;
            } else {
                writeln!(f, "{heading}")?;
            }
            writeln!(f, "{error}")?;
            return write!(f, "{}", self.retry_hint);
        }

        if self.view.loading {
            return write!(f, "Loading products...");
        }

        let status = self.summary.status_line();
        if self.pretty {
            writeln!(f, "{}", status.bold())?;
        } else {
            writeln!(f, "{status}")?;
        }
        if let Some(price) = self.summary.price_line() {
            writeln!(f, "{price}")?;
        }

        if !self.view.products.is_empty() {
            writeln!(f)?;
            let id_width = self
                .view
                .products
                .iter()
                .map(|product| product.id.to_string().len())
                .max()
                .unwrap_or_default();
            let title_width = self
                .view
                .products
                .iter()
                .map(|product| product.title.chars().count())
                .max()
                .unwrap_or_default();
            for product in self.view.products {
                writeln!(
                    f,
                    "{id:>id_width$}  {title:<title_width$}  {price:>9}  ★ {rating:.1}  {category}",
                    id = product.id,
                    title = product.title,
                    price = format!("${:.2}", product.price),
                    rating = product.rating,
                    category = display_category(&product.category),
                )?;
            }
        }

        if self.summary.total_pages() > 1 {
            writeln!(f)?;
            writeln!(f, "{}", self.summary.page_line())?;
        }

        if !self.share_query.is_empty() {
            write!(f, "Share: ?{}", self.share_query)?;
        }
        Ok(())
    }
}

/// The detail view of a single product.
pub struct DisplayProduct<'a> {
    pub product: &'a Product,
    pub pretty: bool,
}

impl Display for DisplayProduct<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let product = self.product;

        if self.pretty {
            writeln!(f, "{}", product.title.as_str().bold())?;
        } else {
            writeln!(f, "{}", product.title)?;
        }

        let category = display_category(&product.category);
        if product.brand.is_empty() {
            writeln!(f, "{category}")?;
        } else {
            writeln!(f, "{category} • {}", product.brand)?;
        }

        let price = if product.has_discount() {
            format!(
                "${:.2} (was ${:.2}, -{}%)",
                product.discounted_price(),
                product.price,
                product.discount_percentage
            )
        } else {
            format!("${:.2}", product.price)
        };
        let stock = if product.in_stock() {
            format!("{} in stock", product.stock)
        } else {
            "Out of stock".to_string()
        };
        write!(f, "{}", formatdoc! {"
            Rating: {rating:.1}
            Price:  {price}
            Stock:  {stock}",
            rating = product.rating,
        })?;

        if !product.description.is_empty() {
            write!(f, "\n\n{}", product.description)?;
        }

        if !product.images.is_empty() {
            write!(f, "\n\nImages:")?;
            for image in product.images.iter().take(DETAIL_IMAGES) {
                write!(f, "\n  {image}")?;
            }
        }
        Ok(())
    }
}

/// Category slugs, one per line, with their display names.
pub struct DisplayCategories<'a>(pub &'a [String]);

impl Display for DisplayCategories<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let width = self.0.iter().map(|slug| slug.len()).max().unwrap_or_default();
        let mut categories = self.0.iter().peekable();
        while let Some(slug) = categories.next() {
            write!(f, "{slug:<width$}  {}", display_category(slug))?;
            if categories.peek().is_some() {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::num::{NonZeroU32, NonZeroUsize};

    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use storefront_catalog::test_helpers::product;
    use storefront_sdk::filter::FilterState;

    use super::*;

    fn summary(filter: FilterState, shown: usize, total: usize) -> ListingSummary {
        ListingSummary {
            filter,
            shown,
            total,
            page_size: NonZeroUsize::new(2).unwrap(),
        }
    }

    fn view<'a>(products: &'a [Product], total: usize, error: Option<&'a str>) -> CatalogView<'a> {
        CatalogView {
            products,
            categories: &[],
            total_products: total,
            loading: false,
            error,
            categories_error: None,
        }
    }

    #[test]
    fn listing_with_pages_and_filters() {
        let products = [
            product(1, "iPhone 9", 549.0, "smartphones"),
            product(12, "Samsung Universe 9", 1249.0, "smartphones"),
        ];
        let filter = FilterState {
            category: "smartphones".to_string(),
            max_price: 1500.0,
            ..Default::default()
        };
        let summary = summary(filter, 2, 5);
        let view = view(&products, 5, None);

        let rendered = DisplayListing {
            view: &view,
            summary: &summary,
            share_query: "category=smartphones&maxPrice=1500",
            retry_hint: "",
            pretty: false,
        }
        .to_string();

        assert_eq!(rendered, indoc! {r#"
            Showing 1-2 of 5 products in "smartphones"
            Price range: $0 - $1500

             1  iPhone 9              $549.00  ★ 4.7  smartphones
            12  Samsung Universe 9   $1249.00  ★ 4.7  smartphones

            Page 1 of 3 • 2 per page
            Share: ?category=smartphones&maxPrice=1500"#
        });
    }

    #[test]
    fn empty_listing_on_single_page() {
        let filter = FilterState {
            search_query: "iPhone".to_string(),
            max_price: 500.0,
            ..Default::default()
        };
        let summary = summary(filter, 0, 0);
        let view = view(&[], 0, None);

        let rendered = DisplayListing {
            view: &view,
            summary: &summary,
            share_query: "q=iPhone&maxPrice=500",
            retry_hint: "",
            pretty: false,
        }
        .to_string();

        assert_eq!(rendered, indoc! {r#"
            No products found for "iPhone"
            Price range: $0 - $500
            Share: ?q=iPhone&maxPrice=500"#
        });
    }

    #[test]
    fn failure_replaces_the_listing() {
        let products = [product(1, "iPhone 9", 549.0, "smartphones")];
        let summary = summary(
            FilterState {
                page: NonZeroU32::new(2).unwrap(),
                ..Default::default()
            },
            1,
            3,
        );
        let view = view(
            &products,
            3,
            Some("Failed to load products. Please try again."),
        );

        let rendered = DisplayListing {
            view: &view,
            summary: &summary,
            share_query: "page=2",
            retry_hint: "Type 'retry' to try again.",
            pretty: false,
        }
        .to_string();

        assert_eq!(rendered, indoc! {"
            Something went wrong
            Failed to load products. Please try again.
            Type 'retry' to try again."
        });
    }

    #[test]
    fn product_detail_with_discount() {
        let mut iphone = product(1, "iPhone 9", 549.0, "smartphones");
        iphone.images = (1..=6)
            .map(|n| format!("https://cdn.dummyjson.com/products/1/{n}.jpg"))
            .collect();

        let rendered = DisplayProduct {
            product: &iphone,
            pretty: false,
        }
        .to_string();

        assert_eq!(rendered, indoc! {"
            iPhone 9
            smartphones • Apple
            Rating: 4.7
            Price:  $477.85 (was $549.00, -12.96%)
            Stock:  94 in stock

            An apple mobile which is nothing like apple

            Images:
              https://cdn.dummyjson.com/products/1/1.jpg
              https://cdn.dummyjson.com/products/1/2.jpg
              https://cdn.dummyjson.com/products/1/3.jpg
              https://cdn.dummyjson.com/products/1/4.jpg"
        });
    }

    #[test]
    fn product_detail_out_of_stock_without_brand() {
        let mut apple = product(16, "Apple", 1.99, "groceries");
        apple.brand = String::new();
        apple.stock = 0;
        apple.discount_percentage = 0.0;
        apple.description = String::new();
        apple.images = Vec::new();

        let rendered = DisplayProduct {
            product: &apple,
            pretty: false,
        }
        .to_string();

        assert_eq!(rendered, indoc! {"
            Apple
            groceries
            Rating: 4.7
            Price:  $1.99
            Stock:  Out of stock"
        });
    }

    #[test]
    fn categories_with_display_names() {
        let categories = ["beauty".to_string(), "home-decoration".to_string()];
        assert_eq!(
            DisplayCategories(&categories).to_string(),
            indoc! {"
                beauty           beauty
                home-decoration  home decoration"
            }
        );
    }
}
