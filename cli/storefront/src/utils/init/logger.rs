use std::sync::OnceLock;

use log::error;
use tracing_subscriber::prelude::*;
use tracing_subscriber::reload::Handle;
use tracing_subscriber::{EnvFilter, Registry};

use crate::commands::Verbosity;

static LOGGER_HANDLE: OnceLock<Handle<EnvFilter, Registry>> = OnceLock::new();

/// The filter directives for `verbosity`, unless `RUST_LOG` is set.
pub(crate) fn log_filter(verbosity: Verbosity) -> &'static str {
    match verbosity {
        // Show only errors
        Verbosity::Quiet => "off,storefront=error,storefront_sdk=error,storefront_catalog=error",
        // Only show warnings
        Verbosity::Verbose(0) => "off,storefront=warn,storefront_sdk=warn,storefront_catalog=warn",
        // Show our own info logs
        Verbosity::Verbose(1) => "off,storefront=info,storefront_sdk=info,storefront_catalog=info",
        // Also show debug from our libraries
        Verbosity::Verbose(2) => {
            "off,storefront=debug,storefront_sdk=debug,storefront_catalog=debug"
        },
        // Also show trace from our libraries
        Verbosity::Verbose(3) => {
            "off,storefront=trace,storefront_sdk=trace,storefront_catalog=trace"
        },
        // Also show debug from dependencies, e.g. the http client
        Verbosity::Verbose(4) => {
            "debug,storefront=trace,storefront_sdk=trace,storefront_catalog=trace"
        },
        Verbosity::Verbose(_) => "trace",
    }
}

/// Install the stderr logger, or update its filter if already installed.
///
/// Updating the filter is cheap,
/// so this is called again once the verbosity flags are known.
pub(crate) fn init_logger(verbosity: Option<Verbosity>) {
    let verbosity = verbosity.unwrap_or_default();

    let filter_handle = LOGGER_HANDLE.get_or_init(|| {
        // Start out with everything enabled,
        // the actual level is applied right below by modifying the filter.
        let filter = EnvFilter::new("trace");
        let (filter, reload_handle) = tracing_subscriber::reload::Layer::new(filter);
        let log_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(filter);
        tracing_subscriber::registry().with(log_layer).init();
        reload_handle
    });

    update_filters(filter_handle, log_filter(verbosity));
}

fn update_filters(filter_handle: &Handle<EnvFilter, Registry>, log_filter: &str) {
    let result = filter_handle.modify(|layer| {
        match EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(log_filter)) {
            Ok(new_filter) => *layer = new_filter,
            Err(err) => {
                error!("Updating logger filter failed: {}", err);
            },
        };
    });
    if let Err(err) = result {
        error!("Updating logger filter failed: {}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_verbosity_has_a_valid_filter() {
        let levels = [Verbosity::Quiet]
            .into_iter()
            .chain((0..7).map(Verbosity::Verbose));
        for verbosity in levels {
            let filter = log_filter(verbosity);
            assert!(EnvFilter::try_new(filter).is_ok(), "{filter}");
        }
    }

    #[test]
    fn default_shows_warnings_of_own_crates() {
        assert_eq!(
            log_filter(Verbosity::default()),
            "off,storefront=warn,storefront_sdk=warn,storefront_catalog=warn"
        );
    }
}
