//! Built-in error pages.

use crate::error::DomainError;

const PAGE_HEAD: &str = "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>";
const PAGE_STYLE: &str = "</title><style>\
body{font-family:monospace;margin:2em;color:#333}\
h1{font-size:1.4em}pre{background:#f6f6f6;padding:1em;overflow:auto}\
</style></head><body>";
const PAGE_END: &str = "</body></html>";

/// Body of a 404 for `path`.
pub fn not_found(path: &str) -> String {
    format!(
        "{PAGE_HEAD}404 Not Found{PAGE_STYLE}<h1>404 Not Found</h1>\
         <p>No route matches <code>{}</code>.</p>{PAGE_END}",
        escape(path),
    )
}

/// Diagnostic body of a 500 for a domain failure: type, message and the
/// captured backtrace.
pub fn domain_error(err: &DomainError) -> String {
    format!(
        "{PAGE_HEAD}500 Internal Server Error{PAGE_STYLE}<h1>{} : {}</h1>\r\n\
         <pre>stack backtrace:\n{}</pre>{PAGE_END}",
        escape(err.type_name()),
        escape(err.message()),
        escape(&err.backtrace().to_string()),
    )
}

/// Body of an unclassified failure.
pub fn failure(status: http::StatusCode) -> String {
    format!("Failure: {status}\r\n")
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_the_path() {
        assert!(not_found("/does-not-exist").contains("/does-not-exist"));
        assert!(not_found("/<script>").contains("/&lt;script&gt;"));
    }

    #[test]
    fn failure_uses_canonical_reason() {
        assert_eq!(
            failure(http::StatusCode::INTERNAL_SERVER_ERROR),
            "Failure: 500 Internal Server Error\r\n",
        );
    }

    #[test]
    fn domain_page_shows_message_and_trace() {
        let page = domain_error(&DomainError::new("cart is empty"));
        assert!(page.contains("cart is empty"));
        assert!(page.contains("stack backtrace:"));
        assert!(page.contains("DomainError"));
    }
}
