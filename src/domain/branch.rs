//! Git branch names derived from stories
//!
//! Branches follow the `<mention-name>/sc-<id>/<type>-<title-slug>` shape the
//! tracker's git integration recognises; the short variant drops the type.

use std::sync::OnceLock;

use regex::Regex;

use super::story::Story;

const SLUG_MAX_LEN: usize = 30;

/// Slugifies a story title: lowercase ASCII alphanumerics separated by `-`,
/// at most 30 characters, without a trailing dash
pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    let slug: String = lowered
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '-' })
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .take(SLUG_MAX_LEN)
        .collect();

    slug.strip_suffix('-').map(str::to_string).unwrap_or(slug)
}

/// Prefix used by `--git-branch`: `<mention>/sc-<id>/<type>-`
pub fn full_prefix(mention_name: &str, story: &Story) -> String {
    format!("{}/sc-{}/{}-", mention_name, story.id, story.story_type)
}

/// Prefix used by `--git-branch-short`: `<mention>/sc-<id>/`
pub fn short_prefix(mention_name: &str, story: &Story) -> String {
    format!("{}/sc-{}/", mention_name, story.id)
}

/// Prefix used when no mention name is configured: `<type>-<id>-`
pub fn legacy_prefix(story: &Story) -> String {
    format!("{}-{}-", story.story_type, story.id)
}

/// Branch name for `story` under `prefix`
pub fn story_branch(story: &Story, prefix: &str) -> String {
    format!("{}{}", prefix, slugify(&story.name))
}

/// Extracts the story id from a branch such as `alice/sc-123/bug-fix`
/// (or the older `alice/ch123/...`)
pub fn story_id_from_branch(branch: &str) -> Option<u64> {
    static BRANCH_ID: OnceLock<Regex> = OnceLock::new();
    let re = BRANCH_ID.get_or_init(|| {
        Regex::new(r"/(?:ch|sc-)([0-9]+)").expect("story branch pattern is valid")
    });

    re.captures(branch)?.get(1)?.as_str().parse().ok()
}
