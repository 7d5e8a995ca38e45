use std::collections::HashMap;

/// Parse query parameters from a URI string
///
/// Handles URL decoding and returns a HashMap of parameter key-value pairs.
/// Multiple values for the same key are not supported (only the last is kept).
///
/// # Example
/// ```
/// use yatube::core::query_params::parse_query_params;
///
/// let params = parse_query_params("/path?user=john&page=2");
/// assert_eq!(params.get("user"), Some(&"john".to_string()));
/// assert_eq!(params.get("page"), Some(&"2".to_string()));
/// ```
pub fn parse_query_params(uri: &str) -> HashMap<String, String> {
    match uri.find('?') {
        Some(query_start) => parse_pairs(&uri[query_start + 1..]),
        None => HashMap::new(),
    }
}

/// Parse an `application/x-www-form-urlencoded` request body.
pub fn parse_form_body(body: &[u8]) -> HashMap<String, String> {
    parse_pairs(&String::from_utf8_lossy(body))
}

fn parse_pairs(query: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();

    for param in query.split('&').filter(|p| !p.is_empty()) {
        if let Some(eq_idx) = param.find('=') {
            let key = decode(&param[..eq_idx]);
            let value = decode(&param[eq_idx + 1..]);
            params.insert(key, value);
        } else {
            // Flag parameter without value
            params.insert(decode(param), String::new());
        }
    }

    params
}

fn decode(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| spaced.clone())
}

/// Get a string parameter from parsed query params with optional default
pub fn get_string(params: &HashMap<String, String>, key: &str, default: Option<&str>) -> Option<String> {
    params.get(key)
        .cloned()
        .or_else(|| default.map(|d| d.to_string()))
}

/// Get an integer parameter with validation and default
pub fn get_int(params: &HashMap<String, String>, key: &str, default: usize) -> usize {
    params.get(key)
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(default)
        .max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_decodes_query() {
        let params = parse_query_params("/?page=3&next=%2Fcreate%2F&flag");
        assert_eq!(params.get("page").map(String::as_str), Some("3"));
        assert_eq!(params.get("next").map(String::as_str), Some("/create/"));
        assert_eq!(params.get("flag").map(String::as_str), Some(""));
    }

    #[test]
    fn form_body_turns_plus_into_space() {
        let params = parse_form_body(b"text=hello+world%21&group=");
        assert_eq!(params.get("text").map(String::as_str), Some("hello world!"));
        assert_eq!(params.get("group").map(String::as_str), Some(""));
    }

    #[test]
    fn page_number_falls_back_to_one() {
        let params = parse_query_params("/?page=abc");
        assert_eq!(get_int(&params, "page", 1), 1);
        let params = parse_query_params("/?page=0");
        assert_eq!(get_int(&params, "page", 1), 1);
        let params = parse_query_params("/?page=4");
        assert_eq!(get_int(&params, "page", 1), 4);
    }

    #[test]
    fn string_default_applies_when_missing() {
        let params = parse_query_params("/");
        assert_eq!(get_string(&params, "next", Some("/")), Some("/".to_string()));
        assert_eq!(get_string(&params, "next", None), None);
    }
}
