// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2026 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! String manipulation functionality.
//!
//! Dialog titles and messages are embedded into brace-delimited request
//! payloads, so `{`, `}` and the escape character itself must be escaped
//! before embedding.

/// Escapes a string for embedding into a brace-delimited payload.
///
/// Backslashes are duplicated and `{` / `}` are prefixed with a backslash.
///
/// # Examples
///
/// ```
/// use chime_core::string::escape_payload;
///
/// assert_eq!(escape_payload(r"a\b"), r"a\\b");
/// assert_eq!(escape_payload("{hi}"), r"\{hi\}");
/// ```
#[must_use]
pub fn escape_payload(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '{' | '}') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Unescapes a string escaped with [`escape_payload`].
///
/// A backslash followed by any character yields that character; a trailing
/// backslash is kept as-is. Applying this to a string with no backslashes is
/// the identity.
#[must_use]
pub fn unescape_payload(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next) => out.push(next),
                None => out.push(c),
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("", "")]
    #[case("plain text", "plain text")]
    #[case(r"a\b", r"a\\b")]
    #[case("{hi}", r"\{hi\}")]
    #[case(r"\{", r"\\\{")]
    fn test_escape_payload(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(escape_payload(input), expected);
    }

    #[rstest]
    #[case("", "")]
    #[case("plain text", "plain text")]
    #[case(r"a\\b", r"a\b")]
    #[case(r"\{hi\}", "{hi}")]
    fn test_unescape_payload(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(unescape_payload(input), expected);
    }

    #[rstest]
    fn test_unescape_without_backslashes_is_identity() {
        let input = "wake up later";
        assert_eq!(unescape_payload(input), input);
    }

    ////////////////////////////////////////////////////////////////////////////////
    // Property-based testing
    ////////////////////////////////////////////////////////////////////////////////

    use proptest::prelude::*;

    proptest! {
        #[rstest]
        fn prop_escape_roundtrip(input in ".*") {
            prop_assert_eq!(unescape_payload(&escape_payload(&input)), input);
        }

        #[rstest]
        fn prop_escaped_has_no_bare_braces(input in ".*") {
            let escaped = escape_payload(&input);
            let mut chars = escaped.chars();
            while let Some(c) = chars.next() {
                if c == '\\' {
                    chars.next();
                } else {
                    let is_bare_brace = matches!(c, '{' | '}');
                    prop_assert!(!is_bare_brace, "found bare brace");
                }
            }
        }
    }
}
