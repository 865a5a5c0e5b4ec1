//! Forum settings and the base URL they are derived from.

use std::fmt;

use url::Url;

use crate::error::InstallError;

pub const FORUM_TITLE: &str = "forum_title";
pub const MAIL_FROM: &str = "mail_from";
pub const WELCOME_TITLE: &str = "welcome_title";

const WELCOME_PREFIX: &str = "Welcome to ";
const MAIL_FROM_LOCAL_PART: &str = "noreply@";

/// Settings written on every installation unless overridden.
pub const DEFAULT_SETTINGS: &[(&str, &str)] = &[
    ("allow_post_editing", "reply"),
    ("allow_renaming", "10"),
    ("allow_sign_up", "1"),
    ("custom_less", ""),
    ("default_locale", "en"),
    ("default_route", "/all"),
    ("extensions_enabled", "[]"),
    (FORUM_TITLE, "A new forum"),
    ("forum_description", ""),
    ("mail_driver", "mail"),
    (MAIL_FROM, "noreply@localhost"),
    ("theme_colored_header", "0"),
    ("theme_dark_mode", "0"),
    ("theme_primary_color", "#4D698E"),
    ("theme_secondary_color", "#4D698E"),
    ("welcome_message", "This is beta software and you should not use it in production."),
    (WELCOME_TITLE, "Welcome to the forum"),
];

/// Absolute base URL of the forum, without a trailing slash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrl {
    raw: String,
    host: String,
}

impl BaseUrl {
    pub fn parse(input: &str) -> Result<Self, InstallError> {
        let raw = input.trim().trim_end_matches('/').to_string();
        let host = Url::parse(&raw)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .filter(|host| !host.is_empty())
            .ok_or_else(|| {
                InstallError::validation("The base URL must be an absolute URL with a hostname.")
            })?;
        Ok(Self { raw, host })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Sender address for outgoing mail: `noreply@` plus the host without a
    /// leading `www.` (case-insensitive).
    pub fn mail_from(&self) -> String {
        let host = match self.host.get(..4) {
            Some(prefix) if prefix.eq_ignore_ascii_case("www.") => &self.host[4..],
            _ => self.host.as_str(),
        };
        format!("{}{}", MAIL_FROM_LOCAL_PART, host)
    }
}

impl fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Welcome banner title for a forum.
pub fn welcome_title(forum_title: &str) -> String {
    format!("{}{}", WELCOME_PREFIX, forum_title)
}

/// Ordered string settings.
///
/// Insertion order is kept; setting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    entries: Vec<(String, String)>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// The installer defaults, in their canonical order.
    pub fn defaults() -> Self {
        DEFAULT_SETTINGS.iter().copied().collect()
    }

    /// Settings derived from the submitted forum title and the base URL.
    pub fn derived(forum_title: &str, base_url: &BaseUrl) -> Self {
        let mut settings = Self::new();
        settings.set(FORUM_TITLE, forum_title);
        settings.set(MAIL_FROM, base_url.mail_from());
        settings.set(WELCOME_TITLE, welcome_title(forum_title));
        settings
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns a copy of `self` with every entry of `overrides` applied on top.
    pub fn merged(&self, overrides: &Settings) -> Settings {
        let mut merged = self.clone();
        for (key, value) in overrides.iter() {
            merged.set(key, value);
        }
        merged
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Settings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut settings = Settings::new();
        for (key, value) in iter {
            settings.set(key, value);
        }
        settings
    }
}
