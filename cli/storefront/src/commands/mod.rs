mod browse;
mod categories;
mod list;
mod show;

use anyhow::Result;
use bpaf::Bpaf;
use indoc::indoc;
use storefront_sdk::url_state::UrlState;
use tracing::debug;

use crate::config::Config;
use crate::utils::init::init_catalog_client;

static STOREFRONT_DESCRIPTION: &str = indoc! {"
    Browse, search and filter the product catalog from the terminal.\n\n

    Listings are described by the same query parameters the storefront uses in its URLs,
    so any listing can be shared as a query string."
};

fn vec_len<T>(x: Vec<T>) -> usize {
    Vec::len(&x)
}

#[derive(Bpaf, Clone, Copy, Debug)]
pub enum Verbosity {
    Verbose(
        /// Increase logging verbosity
        ///
        /// Invoke multiple times for increasing detail.
        #[bpaf(short('v'), long("verbose"), req_flag(()), many, map(vec_len))]
        usize,
    ),

    /// Silence logs except for errors
    #[bpaf(short, long)]
    Quiet,
}

impl Default for Verbosity {
    fn default() -> Self {
        Verbosity::Verbose(0)
    }
}

#[derive(Bpaf)]
#[bpaf(options, version, descr(STOREFRONT_DESCRIPTION))]
pub struct StorefrontCli(#[bpaf(external(storefront_args))] pub StorefrontArgs);

/// Main storefront args parser
///
/// To parse the storefront CLI, use [`StorefrontCli`] instead using [`storefront_cli()`].
#[derive(Debug, Bpaf)]
#[bpaf(ignore_rustdoc)]
pub struct StorefrontArgs {
    /// Verbose mode
    ///
    /// Invoke multiple times for increasing detail.
    #[bpaf(external, fallback(Default::default()))]
    pub verbosity: Verbosity,

    #[bpaf(external(commands))]
    command: Commands,
}

impl StorefrontArgs {
    pub async fn handle(self, config: Config) -> Result<()> {
        let client = init_catalog_client(&config)?;
        debug!(?client, "initialized catalog client");

        match self.command {
            Commands::List(args) => args.handle(config, client).await,
            Commands::Show(args) => args.handle(client).await,
            Commands::Categories(args) => args.handle(client).await,
            Commands::Browse(args) => args.handle(config, client).await,
        }
    }
}

#[derive(Bpaf, Clone, Debug)]
enum Commands {
    /// List one page of products
    #[bpaf(command)]
    List(#[bpaf(external(list::list))] list::List),

    /// Show details about a single product
    #[bpaf(command)]
    Show(#[bpaf(external(show::show))] show::Show),

    /// List the product categories
    #[bpaf(command)]
    Categories(#[bpaf(external(categories::categories))] categories::Categories),

    /// Browse the catalog interactively, reading commands from stdin
    #[bpaf(command)]
    Browse(#[bpaf(external(browse::browse))] browse::Browse),
}

/// Initial URL state given by `--query`.
fn initial_url(query: Option<&str>) -> UrlState {
    query.map(UrlState::from_query).unwrap_or_default()
}
