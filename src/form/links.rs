//! Telegram and social-profile link checks.
//!
//! Social links are parsed with `url` and matched against per-platform path
//! rule tables. The scheme is optional and a leading `www.` is ignored.

use regex::Regex;
use url::Url;

/// Social platforms accepted for the profile-link question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Facebook,
    Instagram,
}

impl Platform {
    fn from_host(host: &str) -> Option<Self> {
        match host {
            "facebook.com" | "m.facebook.com" | "fb.com" | "fb.me" => Some(Self::Facebook),
            "instagram.com" | "instagr.am" => Some(Self::Instagram),
            _ => None,
        }
    }
}

/// A path shape accepted for one platform. The first rule whose path matches
/// decides, so its query requirement cannot be bypassed by a later rule.
#[derive(Debug, Clone)]
struct PathRule {
    platform: Platform,
    regex: Regex,
    /// At least one of these query keys must carry a value.
    required_query: &'static [&'static str],
}

/// Compiled link rules.
#[derive(Debug, Clone)]
pub struct LinkRules {
    telegram: Regex,
    social_paths: Vec<PathRule>,
}

impl LinkRules {
    pub fn default_rules() -> Self {
        let rule = |platform, pattern: &str, required_query| PathRule {
            platform,
            regex: Regex::new(pattern).unwrap(),
            required_query,
        };

        let social_paths = vec![
            // Facebook; the .php endpoints come before the bare-name rule
            rule(Platform::Facebook, r"^/profile\.php$", &["id", "fbid"]),
            rule(Platform::Facebook, r"^/photo\.php$", &["fbid"]),
            rule(Platform::Facebook, r"^/video\.php$", &["v"]),
            rule(Platform::Facebook, r"^/[a-zA-Z0-9._-]+/?$", &[]),
            rule(Platform::Facebook, r"^/pages/[^/]+/\d+/?$", &[]),
            rule(Platform::Facebook, r"^/[a-zA-Z0-9._-]+/posts/\d+/?$", &[]),
            rule(Platform::Facebook, r"^/groups/\d+/?$", &[]),
            rule(Platform::Facebook, r"^/events/\d+/?$", &[]),
            // Instagram
            rule(Platform::Instagram, r"^/[a-zA-Z0-9._]+/?$", &[]),
            rule(Platform::Instagram, r"^/p/[a-zA-Z0-9_-]+/?$", &[]),
            rule(Platform::Instagram, r"^/reel/[a-zA-Z0-9_-]+/?$", &[]),
            rule(Platform::Instagram, r"^/tv/[a-zA-Z0-9_-]+/?$", &[]),
            rule(Platform::Instagram, r"^/stories/[a-zA-Z0-9._]+/\d+/?$", &[]),
            rule(Platform::Instagram, r"^/explore/tags/[a-zA-Z0-9_]+/?$", &[]),
        ];

        Self {
            telegram: Regex::new(r"^(https?://t\.me/[a-zA-Z0-9_]+|@[a-zA-Z0-9_]+)$").unwrap(),
            social_paths,
        }
    }

    /// `https://t.me/<handle>` or a bare `@<handle>`.
    pub fn is_telegram_link(&self, input: &str) -> bool {
        self.telegram.is_match(input.trim())
    }

    /// The platform a profile link belongs to, or `None` if the link is not a
    /// recognised Facebook or Instagram URL.
    pub fn social_platform(&self, input: &str) -> Option<Platform> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        let lower = input.to_ascii_lowercase();
        let normalized = if lower.starts_with("http://") || lower.starts_with("https://") {
            input.to_string()
        } else {
            format!("https://{input}")
        };

        let url = Url::parse(&normalized).ok()?;
        let host = url.host_str()?.to_ascii_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host);
        let platform = Platform::from_host(host)?;

        let path = url.path();
        self.social_paths
            .iter()
            .filter(|r| r.platform == platform)
            .find(|r| r.regex.is_match(path))
            .filter(|r| has_required_query(&url, r.required_query))
            .map(|_| platform)
    }

    pub fn is_social_link(&self, input: &str) -> bool {
        self.social_platform(input).is_some()
    }
}

impl Default for LinkRules {
    fn default() -> Self {
        Self::default_rules()
    }
}

fn has_required_query(url: &Url, keys: &[&str]) -> bool {
    keys.is_empty()
        || url
            .query_pairs()
            .any(|(k, v)| keys.contains(&k.as_ref()) && !v.is_empty())
}
