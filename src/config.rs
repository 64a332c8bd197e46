use serde::Deserialize;

/// Engine-wide defaults, deserializable from whatever configuration layer
/// the embedding application uses. Every field has a serde default so a
/// partial (or empty) document yields a usable configuration.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    /// Size cap on total injected world-info content per turn, in characters.
    #[serde(default = "default_activation_budget")]
    pub activation_budget: usize,

    /// Number of most-recent transcript messages scanned for keywords unless
    /// an entry overrides it.
    #[serde(default = "default_scan_depth")]
    pub scan_depth: usize,

    /// Hard cap on recursive scanning rounds after the primary pass.
    #[serde(default = "default_recursion_limit")]
    pub recursion_limit: u32,

    /// Global default for case-sensitive key matching.
    #[serde(default)]
    pub case_sensitive: bool,

    /// Global default for whole-word key matching.
    #[serde(default = "default_match_whole_words")]
    pub match_whole_words: bool,

    /// Scan character-attached books before global books instead of after.
    #[serde(default)]
    pub character_books_first: bool,
}

fn default_activation_budget() -> usize {
    2048
}

fn default_scan_depth() -> usize {
    2
}

fn default_recursion_limit() -> u32 {
    2
}

fn default_match_whole_words() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            activation_budget: default_activation_budget(),
            scan_depth: default_scan_depth(),
            recursion_limit: default_recursion_limit(),
            case_sensitive: false,
            match_whole_words: default_match_whole_words(),
            character_books_first: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_yields_defaults() {
        let config: Config = serde_json::from_str("{}").expect("empty config should parse");
        assert_eq!(config, Config::default());
        assert_eq!(config.activation_budget, 2048);
        assert_eq!(config.scan_depth, 2);
        assert_eq!(config.recursion_limit, 2);
        assert!(!config.case_sensitive);
        assert!(config.match_whole_words);
        assert!(!config.character_books_first);
    }

    #[test]
    fn test_partial_document_overrides_only_named_fields() {
        let config: Config =
            serde_json::from_str(r#"{"scan_depth": 10, "case_sensitive": true}"#)
                .expect("partial config should parse");
        assert_eq!(config.scan_depth, 10);
        assert!(config.case_sensitive);
        assert_eq!(config.activation_budget, 2048);
        assert!(config.match_whole_words);
    }
}
