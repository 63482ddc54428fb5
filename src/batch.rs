//! Batch parsing of pasted text
//!
//! Runs the extractor, then the scheme dispatcher on every candidate. A bad
//! link never stops the batch; it is logged and, when requested, recorded
//! next to the link text.

use crate::descriptor::ProxyDescriptor;
use crate::error::ParseError;
use crate::extract::extract_links;
use crate::parse_link;
use tracing::{debug, warn};

/// Options for [`parse_many`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Record failed links in [`ParseOutcome::errors`]
    pub collect_errors: bool,
}

/// A link that failed to parse
#[derive(Debug, Clone, PartialEq)]
pub struct LinkError {
    /// The candidate link text
    pub url: String,
    /// Why it was rejected
    pub error: ParseError,
}

/// Result of a batch parse
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseOutcome {
    /// Every extracted candidate, in input order
    pub urls: Vec<String>,
    /// Successfully parsed descriptors, in input order
    pub proxies: Vec<ProxyDescriptor>,
    /// Failed candidates; empty unless `collect_errors` was set
    pub errors: Vec<LinkError>,
}

impl ParseOutcome {
    /// Message of the first recorded failure.
    pub fn first_error(&self) -> Option<String> {
        self.errors.first().map(|e| e.error.to_string())
    }
}

/// Extracts every candidate link from `raw` and parses it.
///
/// # Example
///
/// ```rust
/// use clash_link_serde::{ParseOptions, parse_many};
///
/// let outcome = parse_many(
///     "vless://id@a.example:443#A\nfoo://bar",
///     ParseOptions { collect_errors: true },
/// );
/// assert_eq!(outcome.urls.len(), 2);
/// assert_eq!(outcome.proxies.len(), 1);
/// assert_eq!(outcome.errors[0].url, "foo://bar");
/// ```
pub fn parse_many(raw: &str, options: ParseOptions) -> ParseOutcome {
    let urls = extract_links(raw);
    debug!("Parsing {} candidate links", urls.len());

    let mut proxies = Vec::with_capacity(urls.len());
    let mut errors = Vec::new();
    for url in &urls {
        match parse_link(url) {
            Ok(proxy) => proxies.push(proxy),
            Err(error) => {
                warn!("Failed to parse link: {}", error);
                if options.collect_errors {
                    errors.push(LinkError {
                        url: url.clone(),
                        error,
                    });
                }
            }
        }
    }

    debug!(
        "Batch parsing complete: {} total, {} successful, {} failed",
        urls.len(),
        proxies.len(),
        urls.len() - proxies.len()
    );
    ParseOutcome {
        urls,
        proxies,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INPUT: &str = "vless://id@a.example:443#A\nss://YWVzLTI1Ni1nY206cHc@{bad}:1\ntrojan://pw@b.example:443#B";

    #[test]
    fn failures_do_not_stop_the_batch() {
        let outcome = parse_many(INPUT, ParseOptions { collect_errors: true });
        assert_eq!(outcome.urls.len(), 3);
        let names: Vec<_> = outcome.proxies.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].url.starts_with("ss://"));
        assert!(outcome.first_error().is_some());
    }

    #[test]
    fn errors_are_dropped_unless_requested() {
        let outcome = parse_many(INPUT, ParseOptions::default());
        assert_eq!(outcome.proxies.len(), 2);
        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.first_error(), None);
    }

    #[test]
    fn empty_input() {
        let outcome = parse_many("", ParseOptions { collect_errors: true });
        assert_eq!(outcome, ParseOutcome::default());
    }
}
