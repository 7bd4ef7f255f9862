//! Front-page fingerprinting
//!
//! Engines are recognized by content signatures found in the HTML of a wiki's
//! front page. Signatures are checked in a fixed priority order and the first
//! match wins: several engines share markup fragments (forks, farm products
//! built on other engines), so the more specific signature is listed first.

use crate::engine::Engine;
use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;

/// Ordered signature table. Order is significant.
const SIGNATURES: &[(Engine, &str)] = &[
    (
        Engine::DokuWiki,
        r#"(<meta name="generator" content="DokuWiki)|dokuwiki__site"#,
    ),
    (
        Engine::MediaWiki,
        r#"(alt="Powered by MediaWiki"|<meta name="generator" content="MediaWiki)"#,
    ),
    (
        Engine::MoinMoin,
        r#"(>MoinMoin Powered</a>|<option value="LocalSiteMap">)"#,
    ),
    (
        Engine::TWiki,
        r#"(twikiCurrentTopicLink|twikiCurrentWebHomeLink|twikiLink)"#,
    ),
    (Engine::PmWiki, r#"(<!--PageHeaderFmt-->)"#),
    (
        Engine::PhpWiki,
        r#"(<meta name="generator" content="PhpWiki|<meta name="PHPWIKI_VERSION)"#,
    ),
    (
        Engine::TikiWiki,
        r#"(<meta name="generator" content="Tiki Wiki|Powered by <a href="http://(www\.)?tiki\.org"| id="tiki-(top|main)")"#,
    ),
    (
        Engine::Foswiki,
        r#"(foswikiNoJs|<meta name="foswiki\.|foswikiTable|foswikiContentFooter)"#,
    ),
    (
        Engine::MojoMojo,
        r#"(<meta http-equiv="powered by" content="MojoMojo)"#,
    ),
    (
        Engine::XWiki,
        r#"(id="xwiki(content|nav_footer|platformversion|docinfo|maincontainer|data)|/resources/js/xwiki/xwiki|XWiki\.webapppath)"#,
    ),
    (
        Engine::Confluence,
        r#"(<meta id="confluence-(base-url|context-path)")"#,
    ),
    (
        Engine::BananaDance,
        r#"(<meta name="generator" content="Banana Dance)"#,
    ),
    (
        Engine::Wagn,
        r#"(Wheeled by <a class="external-link" href="http://www\.wagn\.org">|<body id="wagn">)"#,
    ),
    (
        Engine::MindTouch,
        r#"(<meta name="generator" content="MindTouch)"#,
    ),
    (
        Engine::JspWiki,
        r#"(<div class="wikiversion">\s*(<p>)?JSPWiki|xmlns:jspwiki="http://www\.jspwiki\.org")"#,
    ),
    (
        Engine::Kwiki,
        r#"(Powered by:?\s*(<br ?/>)?\s*<a href="http://kwiki\.org">|\bKwikiNavigation\b)"#,
    ),
    (
        Engine::AnWiki,
        r#"(Powered by <a href="http://www\.anwiki\.com")"#,
    ),
    (
        Engine::Aneuch,
        r#"(<meta name="generator" content="Aneuch|is powered by <em>Aneuch</em>|<!-- start of Aneuch markup -->)"#,
    ),
    (
        Engine::Bitweaver,
        r#"(<meta name="generator" content="bitweaver)"#,
    ),
    (
        Engine::Zwiki,
        r#"(powered by <a href="[^"]*\bzwiki.org(/[^"]*)?">)"#,
    ),
    // WakkaWiki forks
    (
        Engine::WikkaWiki,
        r#"(<meta name="generator" content="WikkaWiki|<a class="ext" href="(http://wikka\.jsnx\.com/|http://wikkawiki\.org/)">)"#,
    ),
    (
        Engine::CoMaWiki,
        r#"(<meta name="generator" content="CoMa Wiki)"#,
    ),
    (
        Engine::WikiNi,
        r#"(Fonctionne avec <a href="http://www\.wikini\.net)"#,
    ),
    (
        Engine::CitiWiki,
        r#"(Powered by <a href="[^"]*CitiWiki">CitiWiki</a>)"#,
    ),
    (
        Engine::WackoWiki,
        r#"(Powered by <a href="http://wackowiki\.com/|title="WackoWiki")"#,
    ),
    // May miss heavily themed installations
    (
        Engine::WakkaWiki,
        r#"(Powered by <a href="http://www\.wakkawiki\.com)"#,
    ),
    // Custom engines run by wiki farms
    (
        Engine::Wikispaces,
        r#"(var wikispaces_page|<div class="WikispacesContent)"#,
    ),
    (
        Engine::Wikidot,
        r#"(Powered by <a href="http://www\.wikidot\.com">|wikidot-privacy-button-hovertip|javascript:WIKIDOT\.page)"#,
    ),
    (
        Engine::Wetpaint,
        r#"(IS_WETPAINT_USER|wetpaintLoad|WPC-bodyContentContainer)"#,
    ),
    (
        Engine::PbWorks,
        r#"(<div id="footer-pbwiki">|ws-nav-search|PBinfo *= *\{)"#,
    ),
];

static RULES: LazyLock<Vec<(Engine, Regex)>> = LazyLock::new(|| {
    SIGNATURES
        .iter()
        .map(|(engine, pattern)| {
            let regex = RegexBuilder::new(pattern)
                .case_insensitive(true)
                .multi_line(true)
                .build()
                .expect("hardcoded signature pattern is valid");
            (*engine, regex)
        })
        .collect()
});

/// Classifies a wiki from the HTML of its front page
///
/// Rules are evaluated in priority order and the engine of the first matching
/// rule is returned. Returns [`Engine::Unknown`] when nothing matches.
///
/// # Examples
///
/// ```
/// use wikidump::engine::{classify, Engine};
///
/// let html = r#"<meta name="generator" content="MediaWiki 1.35">"#;
/// assert_eq!(classify(html), Engine::MediaWiki);
/// assert_eq!(classify("<html></html>"), Engine::Unknown);
/// ```
pub fn classify(html: &str) -> Engine {
    RULES
        .iter()
        .find(|(_, regex)| regex.is_match(html))
        .map(|(engine, _)| *engine)
        .unwrap_or(Engine::Unknown)
}

/// Returns every engine whose signature matches, in priority order
///
/// Only the first entry is authoritative; the rest are useful when
/// diagnosing why a site was classified the way it was.
pub fn matching_engines(html: &str) -> Vec<Engine> {
    RULES
        .iter()
        .filter(|(_, regex)| regex.is_match(html))
        .map(|(engine, _)| *engine)
        .collect()
}

/// Returns the signature table in evaluation order
pub fn signatures() -> impl Iterator<Item = (Engine, &'static str)> {
    SIGNATURES.iter().copied()
}
