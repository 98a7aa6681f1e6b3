//! Static resource classification.

/// The configured static-path prefixes.
///
/// A path is static when it equals a prefix or starts with one. Static
/// requests bypass hooks, routing and the request-scoped context entirely.
#[derive(Debug, Clone, Default)]
pub struct StaticPrefixes {
    prefixes: Vec<String>,
}

impl StaticPrefixes {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut prefixes: Vec<String> = prefixes.into_iter()
            .map(Into::into)
            .filter(|p| !p.is_empty())
            .collect();
        prefixes.dedup();
        Self { prefixes }
    }

    pub fn is_static(&self, path: &str) -> bool {
        self.prefixes.iter().any(|p| path == p || path.starts_with(p.as_str()))
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_or_prefixed_paths_are_static() {
        let statics = StaticPrefixes::new(["/favicon.ico", "/static/"]);
        assert!(statics.is_static("/favicon.ico"));
        assert!(statics.is_static("/static/app.js"));
        assert!(statics.is_static("/static/"));
        assert!(!statics.is_static("/static"));
        assert!(!statics.is_static("/users"));
    }

    #[test]
    fn empty_prefix_is_ignored() {
        let statics = StaticPrefixes::new(["", "/assets"]);
        assert!(!statics.is_static("/users"));
        assert!(statics.is_static("/assets/logo.png"));
        assert_eq!(statics.prefixes().len(), 1);
    }
}
