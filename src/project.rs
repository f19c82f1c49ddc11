use std::fmt;

use crate::error::{MagikError, Result};

/// Global actions (locks, global blocks) are always performed on meta.
pub const META_API: &str = "https://meta.wikimedia.org/w/api.php";

/// Absolute URL of one project's `api.php`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint(String);

impl Endpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn meta() -> Self {
        Self(META_API.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Turn a database-style project code into its API endpoint.
///
/// `enwiki` splits on the single `wik` into language `en` and family `wiki`,
/// which becomes `wikipedia` (or `wikimedia` for meta). `wikt` becomes
/// `wiktionary`; other families (`wikibooks`, `wikisource`, ...) are kept.
pub fn resolve(code: &str) -> Result<Endpoint> {
    let (lang, site) = split_code(code)
        .ok_or_else(|| MagikError::UnresolvableProject(code.to_string()))?;

    let site = match site {
        "wiki" if lang == "meta" => "wikimedia",
        "wiki" => "wikipedia",
        "wikt" => "wiktionary",
        other => other,
    };

    Ok(Endpoint(format!("https://{lang}.{site}.org/w/api.php")))
}

fn split_code(code: &str) -> Option<(&str, &str)> {
    match code {
        "commons" => return Some(("commons", "wikimedia")),
        "meta" => return Some(("meta", "wikimedia")),
        _ => {}
    }

    if code.matches("wik").count() != 1 {
        return None;
    }
    let idx = code.find("wik")?;
    let (lang, site) = code.split_at(idx);

    let valid_lang = !lang.is_empty()
        && lang.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    let valid_site = site.chars().all(|c| c.is_ascii_alphanumeric());
    (valid_lang && valid_site).then_some((lang, site))
}
