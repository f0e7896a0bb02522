//! URL query string helpers

use serde_json::Value;
use url::Url;

/// Append query pairs, keeping every existing pair untouched
pub fn add_query_pairs<I, K, V>(url: &mut Url, pairs: I)
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut pairs = pairs.into_iter().peekable();
    // query_pairs_mut() on a query-less URL leaves a dangling '?'
    if pairs.peek().is_none() {
        return;
    }
    url.query_pairs_mut().extend_pairs(pairs);
}

/// Decoded query pairs in order of appearance
pub fn query_components(url: &Url) -> Vec<(String, String)> {
    url.query_pairs()
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect()
}

pub fn has_query_key(url: &Url, key: &str) -> bool {
    url.query_pairs().any(|(name, _)| name == key)
}

/// Render a parameter value the way it appears in a query or form body
pub fn parameter_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_add_query_pairs_keeps_existing() {
        let mut url = Url::parse("https://example.com/path?A=1").unwrap();
        add_query_pairs(&mut url, [("B", "2")]);

        let pairs = query_components(&url);
        assert!(pairs.contains(&("A".to_string(), "1".to_string())));
        assert!(pairs.contains(&("B".to_string(), "2".to_string())));
    }

    #[test]
    fn test_add_nothing_leaves_url_alone() {
        let mut url = Url::parse("https://example.com/path").unwrap();
        add_query_pairs(&mut url, Vec::<(String, String)>::new());
        assert_eq!(url.as_str(), "https://example.com/path");
    }

    #[test]
    fn test_parameter_value_rendering() {
        assert_eq!(parameter_value(&json!("text")), "text");
        assert_eq!(parameter_value(&json!(2)), "2");
        assert_eq!(parameter_value(&json!(true)), "true");
        assert_eq!(parameter_value(&Value::Null), "");
    }

    #[test]
    fn test_has_query_key() {
        let url = Url::parse("https://example.com/?journey=abc").unwrap();
        assert!(has_query_key(&url, "journey"));
        assert!(!has_query_key(&url, "other"));
    }
}
