//! File-system-free screening of requested image names.

use crate::resolver::Rejection;
use percent_encoding::percent_decode_str;
use std::path::{Component, Path};

/// Rejects inputs that can never be a legitimate relative file name.
pub fn screen(requested: &str) -> Result<(), Rejection> {
    if requested.is_empty() {
        return Err(Rejection::EmptyInput);
    }
    if requested.contains('\0') {
        return Err(Rejection::NullByteRejected);
    }
    if has_absolute_prefix(requested) {
        return Err(Rejection::AbsolutePathRejected);
    }
    Ok(())
}

/// Leading separator, drive letter (`C:`), or URI scheme (`file:`).
pub fn has_absolute_prefix(s: &str) -> bool {
    if s.starts_with('/') || s.starts_with('\\') {
        return true;
    }
    if has_scheme(s) {
        return true;
    }
    Path::new(s)
        .components()
        .next()
        .map(|c| matches!(c, Component::RootDir | Component::Prefix(_)))
        .unwrap_or(false)
}

// RFC 3986 scheme: ALPHA *( ALPHA / DIGIT / "+" / "-" / "." ) ":"
// A single letter covers drive letters.
fn has_scheme(s: &str) -> bool {
    let Some(colon) = s.find(':') else { return false };
    let scheme = &s[..colon];
    let mut chars = scheme.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Decodes a form-style query value exactly once: `+` is a space, then
/// percent escapes are applied. `%252e` becomes the literal `%2e` and
/// `%2B` the literal `+`.
pub fn decode_once(raw: &str) -> Result<String, Rejection> {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|_| Rejection::InvalidEncoding)
}

/// Screens `raw`, decodes it once and screens the decoded form again.
pub fn normalize_request(raw: &str) -> Result<String, Rejection> {
    screen(raw)?;
    let decoded = decode_once(raw)?;
    screen(&decoded)?;
    Ok(decoded)
}

/// Walks `relative` component by component and fails as soon as a `..`
/// would climb above the base. Symlinks are not considered here; the
/// canonical check in the resolver still decides.
pub fn lexical_within(relative: &str) -> Result<(), Rejection> {
    let mut depth = 0usize;
    for comp in Path::new(relative).components() {
        match comp {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return Err(Rejection::TraversalRejected);
                }
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(Rejection::AbsolutePathRejected);
            }
        }
    }
    if depth == 0 {
        // "." or "a/.." names a directory
        return Err(Rejection::NotRegularFile);
    }
    Ok(())
}
