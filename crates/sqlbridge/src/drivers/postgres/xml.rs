//! XPath extraction over XML stored in PostgreSQL columns.
//!
//! Logical paths use `/` between steps and `|` between alternatives. Each is
//! rewritten into an absolute XPath that selects text nodes, unless the last
//! step is an attribute. With a namespace, every element step is prefixed with
//! the `n` alias bound to that namespace.

use crate::dialect::{XmlDataFormat, XmlFragments, XmlOptions};

/// Alias under which the default element namespace is registered.
const NAMESPACE_ALIAS: &str = "n";

/// Characters stripped from the array-as-text result of `XPATH(...)::TEXT`.
const TRIM_CHARS: &str = "{\"}";

/// Build one SQL fragment per path.
pub(crate) fn build_fragments(column: &str, paths: &[&str], options: &XmlOptions) -> XmlFragments {
    let xml = decode_expression(column, options.data_format);
    let mut fragments: Vec<String> = paths
        .iter()
        .map(|path| build_fragment(&xml, path, options))
        .collect();

    if fragments.len() == 1 {
        XmlFragments::Single(fragments.remove(0))
    } else {
        XmlFragments::Many(fragments)
    }
}

fn build_fragment(xml: &str, path: &str, options: &XmlOptions) -> String {
    let xpath = build_xpath(path, options.namespace.is_some());
    let call = match &options.namespace {
        Some(ns) => format!(
            "XPATH('{}', {}, '{{{{{},{}}}}}')::TEXT",
            escape_literal(&xpath),
            xml,
            NAMESPACE_ALIAS,
            escape_literal(ns)
        ),
        None => format!("XPATH('{}', {})::TEXT", escape_literal(&xpath), xml),
    };

    if options.trim {
        format!("BTRIM({}, '{}')", call, TRIM_CHARS)
    } else {
        call
    }
}

/// Expression turning the stored column into an XML value.
pub(crate) fn decode_expression(column: &str, format: XmlDataFormat) -> String {
    match format {
        XmlDataFormat::Base64Latin1 => {
            format!("CONVERT_FROM(DECODE({}, 'base64'), 'LATIN1')::XML", column)
        }
        XmlDataFormat::Latin1 => format!("CONVERT_FROM({}::BYTEA, 'LATIN1')::XML", column),
        XmlDataFormat::Base64 => {
            format!("CONVERT_FROM(DECODE({}, 'base64'), 'UTF8')::XML", column)
        }
        XmlDataFormat::Text => format!("{}::XML", column),
        XmlDataFormat::Xml => column.to_string(),
    }
}

/// Rewrite a logical path into XPath.
pub(crate) fn build_xpath(path: &str, namespaced: bool) -> String {
    path.split('|')
        .map(|alternative| build_alternative(alternative.trim(), namespaced))
        .collect::<Vec<_>>()
        .join("|")
}

fn build_alternative(path: &str, namespaced: bool) -> String {
    let steps: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    let ends_in_attribute = steps.last().is_some_and(|s| s.starts_with('@'));

    let mut xpath = String::new();
    for step in &steps {
        xpath.push('/');
        if namespaced && is_element_step(step) {
            xpath.push_str(NAMESPACE_ALIAS);
            xpath.push(':');
        }
        xpath.push_str(step);
    }

    if !ends_in_attribute {
        xpath.push_str("/text()");
    }
    xpath
}

/// Element name steps get the namespace prefix; attributes, node tests,
/// wildcards and the empty step of `//` do not.
fn is_element_step(step: &str) -> bool {
    !(step.is_empty()
        || step.starts_with('@')
        || step.contains('(')
        || step.contains(':')
        || matches!(step, "*" | "." | ".."))
}

fn escape_literal(s: &str) -> String {
    s.replace('\'', "''")
}
