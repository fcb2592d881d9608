//! Web app links for stories, epics, iterations and projects

use std::fmt::Display;

/// Default web app root
pub const DEFAULT_APP_URL: &str = "https://app.shortcut.com";

/// Builds `<base>/<workspace slug>/<kind>/<id>` links
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppLinks {
    base: String,
    slug: String,
}

impl AppLinks {
    pub fn new(base: impl Into<String>, slug: impl Into<String>) -> Self {
        let base: String = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
            slug: slug.into(),
        }
    }

    pub fn story(&self, id: u64) -> String {
        self.build("story", id)
    }

    pub fn epic(&self, id: u64) -> String {
        self.build("epic", id)
    }

    pub fn iteration(&self, id: u64) -> String {
        self.build("iteration", id)
    }

    pub fn project(&self, id: u64) -> String {
        self.build("project", id)
    }

    fn build(&self, kind: &str, id: impl Display) -> String {
        format!("{}/{}/{}/{}", self.base, self.slug, kind, id)
    }
}

impl Default for AppLinks {
    fn default() -> Self {
        Self::new(DEFAULT_APP_URL, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_entity_links() {
        let links = AppLinks::new(DEFAULT_APP_URL, "acme");
        assert_eq!(links.story(100), "https://app.shortcut.com/acme/story/100");
        assert_eq!(links.epic(7), "https://app.shortcut.com/acme/epic/7");
        assert_eq!(links.iteration(3), "https://app.shortcut.com/acme/iteration/3");
        assert_eq!(links.project(1), "https://app.shortcut.com/acme/project/1");
    }

    #[test]
    fn trailing_slash_on_base_is_ignored() {
        let links = AppLinks::new("http://localhost:8080/", "dev");
        assert_eq!(links.story(1), "http://localhost:8080/dev/story/1");
    }
}
