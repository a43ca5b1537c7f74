//! URI assembly from scheme, host, port, path template, path variables and
//! query parameters.
//!
//! # Design
//! Path templates use `{name}` placeholders that are filled positionally: the
//! Nth placeholder receives the Nth variable and the name itself is ignored.
//! Variables are percent-encoded as a single path segment, so a `/` inside a
//! variable never introduces a new segment. Literal path text keeps its `/`
//! separators but has `#`, `?`, `%`, spaces, braces and controls encoded, so
//! it can never open a query or fragment. A `{` without a closing `}` is
//! literal text. Query parameters are encoded by `url`.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS, NON_ALPHANUMERIC};
use url::Url;

use crate::error::{Error, Result};
use crate::http::MultiMap;

const PATH_SEGMENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

const PATH_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'\\')
    .add(b'^')
    .add(b'|');

/// Characters that would change the meaning of the authority if they were
/// accepted inside a host.
const AUTHORITY_DELIMITERS: &[char] = &['/', '?', '#', '@', ':', '[', ']'];

/// Borrowed view of everything needed to assemble a URI.
#[derive(Debug, Clone, Copy)]
pub struct UriParts<'a> {
    pub scheme: &'a str,
    pub host: Option<&'a str>,
    pub port: Option<u16>,
    pub path: Option<&'a str>,
    pub path_variables: &'a [String],
    pub query: &'a MultiMap,
}

/// Assemble and encode a URI.
///
/// Fails with `Error::MalformedUri` when the host is missing or invalid, when
/// the number of path placeholders differs from the number of variables, or
/// when the result does not parse as an absolute URI.
pub fn assemble(parts: &UriParts<'_>) -> Result<Url> {
    let host = match parts.host {
        Some(host) if !host.is_empty() => host,
        _ => return Err(Error::MalformedUri("host is not set".to_string())),
    };
    // IPv6 literals arrive bracketed and are the only place ':' is allowed.
    let bare_host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    if bare_host.contains(|c: char| c.is_whitespace() || (c != ':' && AUTHORITY_DELIMITERS.contains(&c)))
        || (bare_host.len() == host.len() && host.contains(':'))
    {
        return Err(Error::MalformedUri(format!("invalid host {host:?}")));
    }

    let path = expand_path(parts.path.unwrap_or(""), parts.path_variables)?;

    let mut raw = format!("{}://{host}", parts.scheme);
    if let Some(port) = parts.port {
        raw.push_str(&format!(":{port}"));
    }
    if !path.is_empty() && !path.starts_with('/') {
        raw.push('/');
    }
    raw.push_str(&path);

    let mut url = Url::parse(&raw).map_err(|e| Error::MalformedUri(format!("{raw}: {e}")))?;
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(Error::MalformedUri(format!("{raw}: no authority")));
    }

    if !parts.query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (name, value) in parts.query.iter() {
            pairs.append_pair(name, value);
        }
    }
    Ok(url)
}

/// Number of `{...}` placeholders in a path template.
pub fn count_placeholders(template: &str) -> usize {
    placeholder_spans(template).len()
}

/// Substitute `variables` into the placeholders of `template` in order.
pub fn expand_path(template: &str, variables: &[String]) -> Result<String> {
    let spans = placeholder_spans(template);
    if spans.len() != variables.len() {
        return Err(Error::MalformedUri(format!(
            "path {template:?} has {} placeholder(s) but {} variable(s) were given",
            spans.len(),
            variables.len()
        )));
    }

    let mut expanded = String::with_capacity(template.len());
    let mut last = 0;
    for ((start, end), variable) in spans.into_iter().zip(variables) {
        expanded.extend(utf8_percent_encode(&template[last..start], PATH_ENCODE_SET));
        expanded.extend(utf8_percent_encode(variable, PATH_SEGMENT_ENCODE_SET));
        last = end;
    }
    expanded.extend(utf8_percent_encode(&template[last..], PATH_ENCODE_SET));
    Ok(expanded)
}

/// Byte ranges `[start, end)` of each placeholder, braces included. An
/// unclosed `{` ends the scan and stays literal.
fn placeholder_spans(template: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut offset = 0;
    while let Some(open) = template[offset..].find('{') {
        let start = offset + open;
        let Some(close) = template[start..].find('}') else {
            break;
        };
        let end = start + close + 1;
        spans.push((start, end));
        offset = end;
    }
    spans
}
