use std::num::NonZeroU32;

use anyhow::{Context, Result, anyhow, bail, ensure};
use bpaf::Bpaf;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use indoc::indoc;
use storefront_catalog::Client;
use storefront_sdk::categories::CategoryDirectory;
use storefront_sdk::controller::{Cycle, CycleOutcome, QueryStatus};
use storefront_sdk::filter::{DEFAULT_MAX_PRICE, DEFAULT_MIN_PRICE};
use storefront_sdk::session::{CatalogSession, FacetChange};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, instrument};

use super::initial_url;
use crate::config::Config;
use crate::utils::message;
use crate::utils::render::{DisplayCategories, DisplayListing, stdout_is_pretty};

const RETRY_HINT: &str = "Type 'retry' to try again.";

const HELP: &str = indoc! {"
    Commands:
      search [TERM]              search for TERM, or clear the search
      filter [SLUG|-] [MIN] [MAX]
                                 filter by category ('-' for all) and price range
      page N                     go to page N
      next, prev                 go to the next or previous page
      categories                 list the category slugs
      retry                      load the current listing again
      show                       print the current listing again
      help                       print this help
      quit                       leave the browser"
};

// Browse the catalog interactively, reading commands from stdin
#[derive(Debug, Bpaf, Clone)]
pub struct Browse {
    /// Start from a shared listing query, e.g. 'category=laptops&page=2'
    #[bpaf(long, argument("QUERY"))]
    pub query: Option<String>,
}

/// A line of input to the browser.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum BrowseCommand {
    Search(String),
    Filter {
        category: String,
        min_price: f64,
        max_price: f64,
    },
    Page(NonZeroU32),
    Next,
    Prev,
    Categories,
    Retry,
    Show,
    Help,
    Quit,
}

fn parse_price(raw: &str) -> Result<f64> {
    let price: f64 = raw
        .parse()
        .with_context(|| format!("'{raw}' is not a price"))?;
    ensure!(
        price.is_finite() && price >= 0.0,
        "'{raw}' is not a price"
    );
    Ok(price)
}

impl BrowseCommand {
    /// Parse a line of input. Blank lines are `None`.
    pub(crate) fn parse(line: &str) -> Result<Option<BrowseCommand>> {
        let line = line.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map(|(word, rest)| (word, rest.trim()))
            .unwrap_or((line, ""));

        let command = match word {
            "" => return Ok(None),
            "search" | "s" => BrowseCommand::Search(rest.to_string()),
            "filter" | "f" => {
                let args = rest.split_whitespace().collect::<Vec<_>>();
                ensure!(args.len() <= 3, "usage: filter [SLUG|-] [MIN] [MAX]");
                let category = match args.first() {
                    None | Some(&"-") => String::new(),
                    Some(slug) => slug.to_string(),
                };
                let min_price = args
                    .get(1)
                    .map(|raw| parse_price(raw))
                    .transpose()?
                    .unwrap_or(DEFAULT_MIN_PRICE);
                let max_price = args
                    .get(2)
                    .map(|raw| parse_price(raw))
                    .transpose()?
                    .unwrap_or(DEFAULT_MAX_PRICE);
                ensure!(
                    min_price <= max_price,
                    "minimum price {min_price} is above maximum price {max_price}"
                );
                BrowseCommand::Filter {
                    category,
                    min_price,
                    max_price,
                }
            },
            "page" | "p" => {
                let page = rest
                    .parse::<NonZeroU32>()
                    .map_err(|_| anyhow!("usage: page N, with N at least 1"))?;
                BrowseCommand::Page(page)
            },
            "next" | "n" if rest.is_empty() => BrowseCommand::Next,
            "prev" if rest.is_empty() => BrowseCommand::Prev,
            "categories" if rest.is_empty() => BrowseCommand::Categories,
            "retry" | "r" if rest.is_empty() => BrowseCommand::Retry,
            "show" if rest.is_empty() => BrowseCommand::Show,
            "help" | "?" => BrowseCommand::Help,
            "quit" | "exit" | "q" if rest.is_empty() => BrowseCommand::Quit,
            _ => bail!("unknown command '{line}', type 'help' for a list of commands"),
        };
        Ok(Some(command))
    }
}

/// What the browser loop does after a command.
#[derive(Debug)]
enum Action {
    Run(Cycle),
    Nothing,
    Quit,
}

impl Browse {
    #[instrument(name = "browse", skip_all)]
    pub async fn handle(self, config: Config, client: Client) -> Result<()> {
        let pretty = stdout_is_pretty();
        let url = initial_url(self.query.as_deref());
        let mut session = CatalogSession::new(client, url, config.page_size);

        session.activate().await;
        if let Some(error) = session.view().categories_error {
            message::warning(error);
        }
        println!("{}", render(&session, pretty));
        message::plain("Type 'help' for a list of commands.");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut pending = FuturesUnordered::new();

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line.context("failed to read from stdin")? else {
                        break;
                    };
                    let command = match BrowseCommand::parse(&line) {
                        Ok(Some(command)) => command,
                        Ok(None) => continue,
                        Err(err) => {
                            message::error(err);
                            continue;
                        },
                    };
                    match apply(&mut session, command, pretty) {
                        Action::Run(cycle) => {
                            message::plain("Loading products...");
                            pending.push(run_cycle(cycle, session.client().clone()));
                        },
                        Action::Nothing => {},
                        Action::Quit => break,
                    }
                },
                Some(outcome) = pending.next(), if !pending.is_empty() => {
                    publish(&mut session, outcome, pretty);
                },
            }
        }

        // let the latest cycle settle before leaving
        while let Some(outcome) = pending.next().await {
            publish(&mut session, outcome, pretty);
        }
        Ok(())
    }
}

async fn run_cycle(cycle: Cycle, client: Client) -> CycleOutcome {
    cycle.run(&client).await
}

fn publish(session: &mut CatalogSession<Client>, outcome: CycleOutcome, pretty: bool) {
    let generation = outcome.generation;
    if session.complete(outcome) {
        println!("{}", render(session, pretty));
    } else {
        debug!(generation, "superseded listing discarded");
    }
}

fn render(session: &CatalogSession<Client>, pretty: bool) -> String {
    let view = session.view();
    let summary = session.summary();
    let share_query = session.share_query();
    DisplayListing {
        view: &view,
        summary: &summary,
        share_query: &share_query,
        retry_hint: RETRY_HINT,
        pretty,
    }
    .to_string()
}

/// Turn `command` into a facet change or act on it directly.
fn apply(session: &mut CatalogSession<Client>, command: BrowseCommand, pretty: bool) -> Action {
    let change = match command {
        BrowseCommand::Search(term) => FacetChange::Search(term),
        BrowseCommand::Filter {
            category,
            min_price,
            max_price,
        } => {
            let unknown = !category.is_empty()
                && matches!(
                    session.directory(),
                    CategoryDirectory::Ready(categories) if !categories.contains(&category)
                );
            if unknown {
                message::error(format!(
                    "'{category}' is not a known category, type 'categories' to list them"
                ));
                return Action::Nothing;
            }
            FacetChange::Filter {
                category,
                min_price,
                max_price,
            }
        },
        BrowseCommand::Page(page) => FacetChange::Page(page),
        BrowseCommand::Next => {
            let summary = session.summary();
            // the page count is only known for a published listing
            let bounded = matches!(session.controller().status(), QueryStatus::Ready);
            match summary.filter.page.checked_add(1) {
                Some(next) if !bounded || (next.get() as usize) <= summary.total_pages() => {
                    FacetChange::Page(next)
                },
                _ => {
                    message::plain("Already on the last page.");
                    return Action::Nothing;
                },
            }
        },
        BrowseCommand::Prev => {
            let page = session.filter().page;
            match NonZeroU32::new(page.get() - 1) {
                Some(prev) => FacetChange::Page(prev),
                None => {
                    message::plain("Already on the first page.");
                    return Action::Nothing;
                },
            }
        },
        BrowseCommand::Categories => {
            match session.directory().error() {
                Some(error) => message::error(error),
                None => println!("{}", DisplayCategories(session.directory().categories())),
            }
            return Action::Nothing;
        },
        BrowseCommand::Retry => {
            return match session.retry_cycle() {
                Some(cycle) => Action::Run(cycle),
                None => Action::Nothing,
            };
        },
        BrowseCommand::Show => {
            println!("{}", render(session, pretty));
            return Action::Nothing;
        },
        BrowseCommand::Help => {
            message::plain(HELP);
            return Action::Nothing;
        },
        BrowseCommand::Quit => return Action::Quit,
    };

    match session.dispatch(change) {
        Some(cycle) => Action::Run(cycle),
        None => {
            message::plain("Listing unchanged.");
            Action::Nothing
        },
    }
}
