//! Canonical forms for chart titles and artist credits.
//!
//! Artist credits are stored as comma separated lists so the resolver and the
//! linker can look up each credited artist on its own.

use std::sync::OnceLock;

use regex::Regex;

fn non_ascii() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\x00-\x7F]+").expect("valid regex"))
}

fn unicode_space() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\p{White_Space}").expect("valid regex"))
}

fn parenthetical() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(.*?\)").expect("valid regex"))
}

fn whitespace_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"))
}

fn credit_conjunction() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+(?:&|With|Featuring|X|x)\s+").expect("valid regex"))
}

pub fn collapse_whitespace(s: &str) -> String {
    whitespace_run().replace_all(s.trim(), " ").into_owned()
}

/// Strips non-ASCII characters and parenthetical annotations, collapses
/// whitespace and drops a trailing `-` separator. Unicode spaces count as
/// word breaks.
pub fn clean_track_title(title: &str) -> String {
    let title = unicode_space().replace_all(title, " ");
    let title = non_ascii().replace_all(&title, "");
    let title = parenthetical().replace_all(&title, "");
    let title = collapse_whitespace(&title);
    title.trim_end_matches('-').trim().to_string()
}

/// Billboard credits: "A & B Featuring C" becomes "A, B, C".
pub fn normalize_billboard_artists(raw: &str) -> String {
    let joined = credit_conjunction().replace_all(raw.trim(), ", ");
    split_artists(&joined).join(", ")
}

/// Netease credits: "A/B" becomes "A, B"; non-ASCII names drop out.
pub fn normalize_netease_artists(raw: &str) -> String {
    let joined = raw.replace('/', ", ");
    let ascii_only = non_ascii().replace_all(&joined, "");
    split_artists(&ascii_only).join(", ")
}

pub fn split_artists(artists: &str) -> Vec<String> {
    artists
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
