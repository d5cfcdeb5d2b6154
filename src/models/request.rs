//! Request model
//!
//! Turns a `(method, target)` pair into an [`Endpoint`] plus decoded query
//! parameters.

use std::collections::HashMap;

// == Endpoint ==
/// The closed set of routes the server answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Create,
    Read,
    Delete,
    Compute,
    Root,
    Unknown,
}

impl Endpoint {
    /// Resolves the endpoint by prefix of `path`, ignoring the query string.
    ///
    /// `/read/`, `/readers` and `/read?key=a` all resolve to `Read`; `/` and
    /// the empty path are `Root`.
    pub fn resolve(path: &str) -> Self {
        let path = path.split_once('?').map_or(path, |(p, _)| p);

        match path {
            "" | "/" => Endpoint::Root,
            p if p.starts_with("/create") => Endpoint::Create,
            p if p.starts_with("/read") => Endpoint::Read,
            p if p.starts_with("/delete") => Endpoint::Delete,
            p if p.starts_with("/compute") => Endpoint::Compute,
            _ => Endpoint::Unknown,
        }
    }
}

// == Request ==
/// One decoded request. Lives only for the duration of a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub endpoint: Endpoint,
    pub params: HashMap<String, String>,
}

impl Request {
    /// Builds a request from a method and a request target such as
    /// `/create?key=a&value=b`.
    pub fn new(method: impl Into<String>, target: impl Into<String>) -> Self {
        let path = target.into();
        let endpoint = Endpoint::resolve(&path);
        let params = parse_query_string(&path);
        Self {
            method: method.into(),
            path,
            endpoint,
            params,
        }
    }

    /// Parses an HTTP request line (`GET /read?key=a HTTP/1.1`).
    ///
    /// Returns `None` when the method or target is missing.
    pub fn from_request_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let method = parts.next()?;
        let target = parts.next()?;
        Some(Self::new(method, target))
    }

    /// Returns a query parameter, treating an empty value as absent.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

// == Query String ==
/// Decodes the `k1=v1&k2=v2` suffix of `path`.
///
/// Pairs without `=` are skipped; a repeated key keeps its last value.
pub fn parse_query_string(path: &str) -> HashMap<String, String> {
    let Some((_, query)) = path.split_once('?') else {
        return HashMap::new();
    };

    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (percent_decode(k), percent_decode(v)))
        .collect()
}

/// Decodes `%XX` escapes and `+` as space.
///
/// A `%` not followed by two hex digits is kept as-is. Invalid UTF-8 after
/// decoding is replaced with U+FFFD.
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' => match (hex_value(bytes.get(i + 1)), hex_value(bytes.get(i + 2))) {
                (Some(hi), Some(lo)) => {
                    out.push(hi << 4 | lo);
                    i += 3;
                    continue;
                }
                _ => out.push(b'%'),
            },
            b'+' => out.push(b' '),
            b => out.push(b),
        }
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(byte: Option<&u8>) -> Option<u8> {
    match byte? {
        b @ b'0'..=b'9' => Some(b - b'0'),
        b @ b'a'..=b'f' => Some(b - b'a' + 10),
        b @ b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
