//! Wiki engine identification
//!
//! This module defines the closed set of wiki engines the tool knows about and
//! the fingerprinting logic that maps a front page to one of them.

mod classifier;

pub use classifier::{classify, matching_engines, signatures};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Backend software powering a wiki
///
/// `Unknown` is the sentinel for sites that match no signature. It is a
/// valid classification result but no dump can be made for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    DokuWiki,
    MediaWiki,
    MoinMoin,
    TWiki,
    PmWiki,
    PhpWiki,
    TikiWiki,
    Foswiki,
    MojoMojo,
    XWiki,
    Confluence,
    BananaDance,
    Wagn,
    /// Formerly DekiWiki
    MindTouch,
    JspWiki,
    Kwiki,
    AnWiki,
    Aneuch,
    Bitweaver,
    Zwiki,
    /// Formerly WikkaWakkaWiki
    WikkaWiki,
    CoMaWiki,
    WikiNi,
    CitiWiki,
    WackoWiki,
    WakkaWiki,
    Wikispaces,
    Wikidot,
    Wetpaint,
    /// Formerly PBwiki
    PbWorks,
    Unknown,
}

impl Engine {
    /// Returns the lowercase identifier used in session state and CLI output
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DokuWiki => "dokuwiki",
            Self::MediaWiki => "mediawiki",
            Self::MoinMoin => "moinmoin",
            Self::TWiki => "twiki",
            Self::PmWiki => "pmwiki",
            Self::PhpWiki => "phpwiki",
            Self::TikiWiki => "tikiwiki",
            Self::Foswiki => "foswiki",
            Self::MojoMojo => "mojomojo",
            Self::XWiki => "xwiki",
            Self::Confluence => "confluence",
            Self::BananaDance => "bananadance",
            Self::Wagn => "wagn",
            Self::MindTouch => "mindtouch",
            Self::JspWiki => "jspwiki",
            Self::Kwiki => "kwiki",
            Self::AnWiki => "anwiki",
            Self::Aneuch => "aneuch",
            Self::Bitweaver => "bitweaver",
            Self::Zwiki => "zwiki",
            Self::WikkaWiki => "wikkawiki",
            Self::CoMaWiki => "comawiki",
            Self::WikiNi => "wikini",
            Self::CitiWiki => "citiwiki",
            Self::WackoWiki => "wackowiki",
            Self::WakkaWiki => "wakkawiki",
            Self::Wikispaces => "wikispaces",
            Self::Wikidot => "wikidot",
            Self::Wetpaint => "wetpaint",
            Self::PbWorks => "pbworks",
            Self::Unknown => "unknown",
        }
    }

    /// Returns true unless this is the `Unknown` sentinel
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Returns every engine, including `Unknown`
    pub fn all() -> Vec<Self> {
        vec![
            Self::DokuWiki,
            Self::MediaWiki,
            Self::MoinMoin,
            Self::TWiki,
            Self::PmWiki,
            Self::PhpWiki,
            Self::TikiWiki,
            Self::Foswiki,
            Self::MojoMojo,
            Self::XWiki,
            Self::Confluence,
            Self::BananaDance,
            Self::Wagn,
            Self::MindTouch,
            Self::JspWiki,
            Self::Kwiki,
            Self::AnWiki,
            Self::Aneuch,
            Self::Bitweaver,
            Self::Zwiki,
            Self::WikkaWiki,
            Self::CoMaWiki,
            Self::WikiNi,
            Self::CitiWiki,
            Self::WackoWiki,
            Self::WakkaWiki,
            Self::Wikispaces,
            Self::Wikidot,
            Self::Wetpaint,
            Self::PbWorks,
            Self::Unknown,
        ]
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Engine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_ascii_lowercase();
        Self::all()
            .into_iter()
            .find(|engine| engine.as_str() == lowered)
            .ok_or_else(|| format!("unrecognized wiki engine '{}'", s))
    }
}
