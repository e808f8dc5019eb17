// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! XML response framing for the query/admin wire protocol (spec.md §6,
//! §4.9): every response is one `<archer-result>…</archer-result>` or
//! `<archer-error>…</archer-error>` fragment, followed by the `.\n` ready
//! prompt.

use crate::dump::xml_escape;
use crate::error::ArcherError;
use crate::query::SearchResult;

pub const READY_PROMPT: &str = ".\n";

pub fn ok(body: impl AsRef<str>) -> String {
    format!("<archer-result>{}</archer-result>\n", body.as_ref())
}

pub fn error(err: &ArcherError) -> String {
    format!("<archer-error>{}</archer-error>\n", xml_escape(&err.to_string()))
}

/// Renders a slice of a hit list (already sliced to the requested
/// `hits <first> <last>` window) as a `<hitlist>` fragment.
pub fn hitlist(results: &[SearchResult], names: &[String]) -> String {
    let mut body = format!("<hitlist><count>{}</count>", results.len());
    for (result, name) in results.iter().zip(names) {
        body.push_str("<hit>");
        body.push_str(&format!("<id>{}</id>", result.di));
        body.push_str(&format!("<name>{}</name>", xml_escape(name)));
        body.push_str(&format!("<score>{}</score>", result.score));
        for occ in &result.word_occurrences {
            body.push_str(&format!("<term>{}</term>", xml_escape(&occ.term)));
        }
        body.push_str("</hit>");
    }
    body.push_str("</hitlist>");
    body
}

pub fn doclist(names: impl Iterator<Item = String>) -> String {
    let mut body = String::from("<doclist>");
    for name in names {
        body.push_str(&format!("<document>{}</document>", xml_escape(&name)));
    }
    body.push_str("</doclist>");
    body
}

pub fn fieldlist(names: impl Iterator<Item = String>) -> String {
    let mut body = String::from("<fieldlist>");
    for name in names {
        body.push_str(&format!("<field>{}</field>", xml_escape(&name)));
    }
    body.push_str("</fieldlist>");
    body
}

pub fn dump(text: impl AsRef<str>) -> String {
    format!("<dump>{}</dump>", text.as_ref())
}

pub fn rank(position: Option<usize>) -> String {
    match position {
        Some(p) => format!("<rank>{p}</rank>"),
        None => "<rank>not found</rank>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_escapes_the_message() {
        let rendered = error(&ArcherError::protocol("bad <cmd>"));
        assert!(rendered.starts_with("<archer-error>"));
        assert!(rendered.contains("&lt;cmd&gt;"));
    }

    #[test]
    fn empty_hitlist_still_has_count() {
        assert_eq!(hitlist(&[], &[]), "<hitlist><count>0</count></hitlist>");
    }
}
