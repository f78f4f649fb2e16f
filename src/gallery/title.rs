//! Gallery name parsing.
//!
//! Collection folders and archives are conventionally named either
//! `[Artist] Title` (optionally with language tokens in further bracket
//! groups) or `Artist - Title`. Parsing never fails: an unrecognized name
//! degrades to being used as the title verbatim.

use std::sync::OnceLock;

use regex::Regex;

use crate::archive::strip_archive_suffix;

/// Languages recognized inside bracket groups.
const KNOWN_LANGUAGES: &[&str] = &["English", "Japanese", "Chinese", "Korean"];

/// Result of parsing a gallery name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTitle {
    pub title: String,
    pub artist: String,
    pub language: String,
}

fn bracket_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[([^\]]+)\]").unwrap())
}

/// Parse a raw gallery name into title, artist and language.
pub fn parse_title(raw: &str) -> ParsedTitle {
    let name = strip_archive_suffix(raw.trim());

    let groups: Vec<&str> = bracket_re()
        .captures_iter(&name)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .collect();

    if !groups.is_empty() {
        // `[Artist] Title [English] ...`: first group is the artist, any
        // later group naming a known language sets the language.
        let artist = groups[0].trim().to_string();
        let mut language = String::new();
        for group in groups.iter().skip(1) {
            let candidate = capitalize(group.trim());
            if KNOWN_LANGUAGES.contains(&candidate.as_str()) {
                language = candidate;
            }
        }

        let title = bracket_re().replace_all(&name, "").trim().to_string();
        if title.is_empty() {
            // Bracket-only name; fall back to the raw name as title.
            return ParsedTitle {
                title: name.to_string(),
                artist,
                language,
            };
        }
        return ParsedTitle {
            title,
            artist,
            language,
        };
    }

    // `Artist - Title` form.
    if let Some((artist, title)) = name.split_once(" - ") {
        let artist = artist.trim();
        let title = title.trim();
        if !artist.is_empty() && !title.is_empty() {
            return ParsedTitle {
                title: title.to_string(),
                artist: artist.to_string(),
                language: String::new(),
            };
        }
    }

    ParsedTitle {
        title: name.to_string(),
        ..Default::default()
    }
}

/// Uppercase the first character, lowercase the rest. Idempotent.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}
