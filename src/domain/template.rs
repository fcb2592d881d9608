//! Single-pass `%token` templates
//!
//! The template is scanned once from left to right. At each `%` the longest
//! known token that follows is replaced by its value; text produced by a
//! replacement is never scanned again, so values containing `%` are safe and
//! overlapping names (`%e` / `%epic`) cannot interfere. Unknown `%` sequences
//! are copied through unchanged.

/// A set of token names recognised in templates
#[derive(Debug, Clone)]
pub struct TokenSet {
    // Longest first, so `%epic` wins over `%e`
    tokens: Vec<&'static str>,
}

impl TokenSet {
    pub fn new(tokens: &[&'static str]) -> Self {
        let mut tokens = tokens.to_vec();
        tokens.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
        tokens.dedup();
        Self { tokens }
    }

    /// Renders `template`, asking `resolve` for the value of each token used
    pub fn render<F>(&self, template: &str, mut resolve: F) -> String
    where
        F: FnMut(&'static str) -> String,
    {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(pos) = rest.find('%') {
            out.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];

            match self.tokens.iter().find(|t| after.starts_with(**t)) {
                Some(&token) => {
                    out.push_str(&resolve(token));
                    rest = &after[token.len()..];
                }
                None => {
                    out.push('%');
                    rest = after;
                }
            }
        }

        out.push_str(rest);
        out
    }
}
