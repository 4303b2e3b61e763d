use regex::Regex;

/// Ordered rewrite rules turning declared repository URLs into cloneable
/// `https://` URLs. The first matching rule wins; no match means the URL is
/// not something we know how to clone.
pub struct UrlRules {
    rules: Vec<(Regex, &'static str)>,
    github_homepage: Regex,
    fragment: Regex,
}

impl UrlRules {
    pub fn new() -> Result<Self, regex::Error> {
        let table = [
            (r"^git\+https://", "https://"),
            (r"^git://github", "https://github"),
            (r"^git\+ssh://git@github", "https://github"),
            (r"^https://", "https://"),
        ];

        let rules = table
            .into_iter()
            .map(|(pattern, replacement)| Ok((Regex::new(pattern)?, replacement)))
            .collect::<Result<Vec<_>, regex::Error>>()?;

        Ok(Self {
            rules,
            github_homepage: Regex::new(r"^https://github\.com/")?,
            fragment: Regex::new(r"#.*$")?,
        })
    }

    /// Normalize a declared `repository.url`.
    pub fn normalize(&self, raw: &str) -> Option<String> {
        let raw = raw.trim();
        self.rules
            .iter()
            .find(|(re, _)| re.is_match(raw))
            .map(|(re, replacement)| re.replacen(raw, 1, *replacement).into_owned())
    }

    /// Accept a homepage only when it points at GitHub, minus any `#fragment`.
    pub fn github_homepage(&self, homepage: &str) -> Option<String> {
        let homepage = homepage.trim();
        if !self.github_homepage.is_match(homepage) {
            return None;
        }
        Some(self.fragment.replace(homepage, "").into_owned())
    }
}
