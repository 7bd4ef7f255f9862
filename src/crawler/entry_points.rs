//! MediaWiki endpoint discovery
//!
//! A MediaWiki front page advertises its API through the `EditURI` link in
//! the page head and links to `index.php` from its page actions and search
//! form. Both are read here from the HTML already fetched for classification.

use crate::config::EntryPoints;
use scraper::{Html, Selector};
use url::Url;

/// Finds api.php and index.php for a MediaWiki site
///
/// A `site` URL that already names one of the scripts is taken as is. The
/// other endpoint is looked up in `html`, and when nothing advertises it,
/// derived from the one that was found.
///
/// # Example
///
/// ```
/// use wikidump::crawler::discover_mediawiki_entry_points;
///
/// let html = r#"<html><head>
///     <link rel="EditURI" type="application/rsd+xml" href="//wiki.example.org/w/api.php?action=rsd"/>
/// </head><body></body></html>"#;
///
/// let points = discover_mediawiki_entry_points(html, "https://wiki.example.org/wiki/Main_Page");
/// assert_eq!(points.api.as_deref(), Some("https://wiki.example.org/w/api.php"));
/// assert_eq!(points.browse.as_deref(), Some("https://wiki.example.org/w/index.php"));
/// ```
pub fn discover_mediawiki_entry_points(html: &str, site: &str) -> EntryPoints {
    let base = match Url::parse(site) {
        Ok(base) => base,
        Err(e) => {
            tracing::warn!("Cannot resolve endpoints against {}: {}", site, e);
            return EntryPoints::default();
        }
    };

    let document = Html::parse_document(html);

    let api = script_url(&base, "api.php").or_else(|| find_api(&document, &base));
    let browse = script_url(&base, "index.php").or_else(|| find_index(&document, &base));

    let points = EntryPoints {
        api: api.clone().or_else(|| browse.as_deref().and_then(|i| sibling(i, "api.php"))),
        browse: browse.or_else(|| api.as_deref().and_then(|a| sibling(a, "index.php"))),
    };

    tracing::debug!("Discovered MediaWiki entry points: {:?}", points);
    points
}

/// Returns `url` without query and fragment if its path ends in `script`
fn script_url(url: &Url, script: &str) -> Option<String> {
    if url.path().ends_with(script) {
        Some(strip_query(url))
    } else {
        None
    }
}

fn find_api(document: &Html, base: &Url) -> Option<String> {
    let selector = Selector::parse(r#"link[rel="EditURI"][href]"#).ok()?;
    document
        .select(&selector)
        .filter_map(|link| link.value().attr("href"))
        .filter_map(|href| base.join(href.trim()).ok())
        .find_map(|url| script_url(&url, "api.php"))
}

fn find_index(document: &Html, base: &Url) -> Option<String> {
    let candidates = [
        "form#searchform[action]",
        "li#ca-history a[href]",
        "li#ca-viewsource a[href]",
        "li#ca-edit a[href]",
    ];

    candidates.iter().find_map(|css| {
        let selector = Selector::parse(css).ok()?;
        document
            .select(&selector)
            .filter_map(|element| {
                element
                    .value()
                    .attr("action")
                    .or_else(|| element.value().attr("href"))
            })
            .filter_map(|target| base.join(target.trim()).ok())
            .find_map(|url| script_url(&url, "index.php"))
    })
}

/// Replaces the script name at the end of `url` with `script`
fn sibling(url: &str, script: &str) -> Option<String> {
    let mut parsed = Url::parse(url).ok()?;
    let path = parsed.path().to_string();
    let dir = &path[..path.rfind('/')? + 1];
    parsed.set_path(&format!("{}{}", dir, script));
    Some(strip_query(&parsed))
}

fn strip_query(url: &Url) -> String {
    let mut clean = url.clone();
    clean.set_query(None);
    clean.set_fragment(None);
    clean.to_string()
}
