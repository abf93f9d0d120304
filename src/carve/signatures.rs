//! Signature templates and the streaming matcher.
//!
//! A template is an ordered list of byte rules, each either a literal value or
//! a wildcard that accepts anything. The matcher consumes the stream one byte
//! at a time and never backtracks: a byte that breaks a partial match resets
//! the cursor and is not retried against the first template position.

use std::fmt;

/// Byte that marks a wildcard position in raw pattern bytes (`*`)
pub const WILDCARD: u8 = 0x2A;

/// Camera raw video start: `00 00 00 08 "wide" ??? F8 "mdat"`
pub const BRAW_START: &[u8] = b"\x00\x00\x00\x08wide***\xf8mdat";

/// RIFF/WAVE header: `"RIFF" ???? "WAVEfmt "`
pub const WAVE_START: &[u8] = b"RIFF****WAVEfmt ";

/// One position of a template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateByte {
    /// Must equal this value
    Literal(u8),
    /// Accepts any value
    Any,
}

impl TemplateByte {
    /// Whether `byte` is accepted at this position
    #[inline]
    pub fn accepts(self, byte: u8) -> bool {
        match self {
            TemplateByte::Literal(v) => v == byte,
            TemplateByte::Any => true,
        }
    }
}

/// A signature to look for in the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    rules: Vec<TemplateByte>,
}

/// Errors from [`Template::parse`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("template is empty")]
    Empty,
    #[error("bad escape at position {0}")]
    BadEscape(usize),
}

impl Template {
    /// Build from explicit rules
    pub fn new(rules: Vec<TemplateByte>) -> Result<Self, TemplateError> {
        if rules.is_empty() {
            return Err(TemplateError::Empty);
        }
        Ok(Self { rules })
    }

    /// Build from raw pattern bytes where every `*` is a wildcard
    pub fn from_pattern(pattern: &[u8]) -> Result<Self, TemplateError> {
        Self::new(rules_from_pattern(pattern))
    }

    /// Parse an escaped pattern string such as `\x00\x00\x00\x08wide***\xf8mdat`.
    ///
    /// `*` is a wildcard, `\xHH` is a literal byte (so `\x2a` is a literal
    /// asterisk), `\\` is a literal backslash and every other character
    /// contributes its UTF-8 bytes literally.
    pub fn parse(text: &str) -> Result<Self, TemplateError> {
        let bytes = text.as_bytes();
        let mut rules = Vec::with_capacity(bytes.len());
        let mut i = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'\\' => match bytes.get(i + 1) {
                    Some(b'\\') => {
                        rules.push(TemplateByte::Literal(b'\\'));
                        i += 2;
                    }
                    Some(b'x') => {
                        let hex = bytes.get(i + 2..i + 4).ok_or(TemplateError::BadEscape(i))?;
                        let hex = std::str::from_utf8(hex).map_err(|_| TemplateError::BadEscape(i))?;
                        let value =
                            u8::from_str_radix(hex, 16).map_err(|_| TemplateError::BadEscape(i))?;
                        rules.push(TemplateByte::Literal(value));
                        i += 4;
                    }
                    _ => return Err(TemplateError::BadEscape(i)),
                },
                WILDCARD => {
                    rules.push(TemplateByte::Any);
                    i += 1;
                }
                b => {
                    rules.push(TemplateByte::Literal(b));
                    i += 1;
                }
            }
        }

        Self::new(rules)
    }

    /// Built-in camera raw start signature
    pub fn braw_start() -> Self {
        Self {
            rules: rules_from_pattern(BRAW_START),
        }
    }

    /// Built-in RIFF/WAVE detection signature
    pub fn wave_start() -> Self {
        Self {
            rules: rules_from_pattern(WAVE_START),
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> &[TemplateByte] {
        &self.rules
    }

    /// Whether `window` (exactly `len()` bytes) satisfies every rule
    pub fn matches(&self, window: &[u8]) -> bool {
        window.len() == self.rules.len()
            && self.rules.iter().zip(window).all(|(rule, &b)| rule.accepts(b))
    }
}

fn rules_from_pattern(pattern: &[u8]) -> Vec<TemplateByte> {
    pattern
        .iter()
        .map(|&b| match b {
            WILDCARD => TemplateByte::Any,
            b => TemplateByte::Literal(b),
        })
        .collect()
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rule in &self.rules {
            match *rule {
                TemplateByte::Any => f.write_str("*")?,
                TemplateByte::Literal(b'\\') => f.write_str("\\\\")?,
                TemplateByte::Literal(b) if b.is_ascii_graphic() && b != WILDCARD => {
                    write!(f, "{}", b as char)?
                }
                TemplateByte::Literal(b) => write!(f, "\\x{:02x}", b)?,
            }
        }
        Ok(())
    }
}

/// Outcome of feeding one byte to a [`Matcher`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchEvent {
    /// Byte accepted, template not complete yet
    Continuing,
    /// Byte rejected; any partial match was dropped
    Reset,
    /// Template complete; carries every matched byte in stream order
    Matched(Vec<u8>),
}

/// Single-pass matcher state for one template
#[derive(Debug, Clone)]
pub struct Matcher {
    template: Template,
    cursor: usize,
    accumulated: Vec<u8>,
}

impl Matcher {
    pub fn new(template: Template) -> Self {
        let cap = template.len();
        Self {
            template,
            cursor: 0,
            accumulated: Vec::with_capacity(cap),
        }
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Current position within the template, always `0..len`
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Bytes of the partial match in progress
    pub fn pending(&self) -> &[u8] {
        &self.accumulated
    }

    /// Drop any partial match
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.accumulated.clear();
    }

    /// Feed the next stream byte
    pub fn advance(&mut self, byte: u8) -> MatchEvent {
        if !self.template.rules[self.cursor].accepts(byte) {
            self.reset();
            return MatchEvent::Reset;
        }

        self.cursor += 1;
        self.accumulated.push(byte);

        if self.cursor == self.template.len() {
            self.cursor = 0;
            let matched = std::mem::replace(
                &mut self.accumulated,
                Vec::with_capacity(self.template.len()),
            );
            return MatchEvent::Matched(matched);
        }

        MatchEvent::Continuing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn feed(m: &mut Matcher, data: &[u8]) -> Vec<(usize, Vec<u8>)> {
        let mut hits = Vec::new();
        for (i, &b) in data.iter().enumerate() {
            if let MatchEvent::Matched(bytes) = m.advance(b) {
                hits.push((i, bytes));
            }
        }
        hits
    }

    fn concrete_braw() -> Vec<u8> {
        b"\x00\x00\x00\x08wideABC\xf8mdat".to_vec()
    }

    #[test]
    fn test_builtin_templates() {
        let braw = Template::braw_start();
        assert_eq!(braw.len(), 16);
        assert_eq!(braw.rules()[8], TemplateByte::Any);
        assert_eq!(braw.rules()[11], TemplateByte::Literal(0xF8));

        let wave = Template::wave_start();
        assert_eq!(wave.len(), 16);
        assert!(wave.rules()[4..8].iter().all(|r| *r == TemplateByte::Any));
    }

    #[test]
    fn test_parse_matches_builtin() {
        let parsed = Template::parse(r"\x00\x00\x00\x08wide***\xf8mdat").unwrap();
        assert_eq!(parsed, Template::braw_start());
        assert_eq!(Template::parse("RIFF****WAVEfmt ").unwrap(), Template::wave_start());
    }

    #[test]
    fn test_parse_escapes() {
        let t = Template::parse(r"a\x2a\\*").unwrap();
        assert_eq!(
            t.rules(),
            &[
                TemplateByte::Literal(b'a'),
                TemplateByte::Literal(b'*'),
                TemplateByte::Literal(b'\\'),
                TemplateByte::Any,
            ]
        );
        assert_eq!(Template::parse(""), Err(TemplateError::Empty));
        assert_eq!(Template::parse(r"ab\x4"), Err(TemplateError::BadEscape(2)));
        assert_eq!(Template::parse(r"\q"), Err(TemplateError::BadEscape(0)));
        assert_eq!(Template::parse(r"\xZZ"), Err(TemplateError::BadEscape(0)));
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        let t = Template::braw_start();
        let shown = t.to_string();
        assert_eq!(shown, r"\x00\x00\x00\x08wide***\xf8mdat");
        assert_eq!(Template::parse(&shown).unwrap(), t);
    }

    #[test]
    fn test_match_emits_observed_bytes() {
        let mut m = Matcher::new(Template::braw_start());
        let mut stream = b"junkjunk".to_vec();
        stream.extend_from_slice(&concrete_braw());
        stream.extend_from_slice(b"tail");

        let hits = feed(&mut m, &stream);
        assert_eq!(hits, vec![(8 + 15, concrete_braw())]);
        assert_eq!(m.cursor(), 0);
        assert!(m.pending().is_empty());
    }

    #[test]
    fn test_rejected_byte_is_not_retried() {
        // "aab": after "a","a" fails at position 1 of "ab", the second 'a' is
        // not re-evaluated as a fresh start, so "ab" is missed.
        let mut m = Matcher::new(Template::parse("ab").unwrap());
        assert_eq!(m.advance(b'a'), MatchEvent::Continuing);
        assert_eq!(m.advance(b'a'), MatchEvent::Reset);
        assert_eq!(m.advance(b'b'), MatchEvent::Reset);
        assert!(feed(&mut m, b"ab").len() == 1);
    }

    #[test]
    fn test_reset_discards_partial() {
        let mut m = Matcher::new(Template::braw_start());
        feed(&mut m, b"\x00\x00\x00\x08wi");
        assert_eq!(m.cursor(), 6);
        assert_eq!(m.pending(), b"\x00\x00\x00\x08wi");

        assert_eq!(m.advance(b'X'), MatchEvent::Reset);
        assert_eq!(m.cursor(), 0);
        assert!(m.pending().is_empty());
    }

    #[test]
    fn test_back_to_back_matches() {
        let mut m = Matcher::new(Template::wave_start());
        let one = b"RIFF\x24\x08\x00\x00WAVEfmt ".to_vec();
        let mut stream = one.clone();
        stream.extend_from_slice(&one);
        assert_eq!(feed(&mut m, &stream).len(), 2);
    }

    #[test]
    fn test_template_matches_window() {
        let t = Template::braw_start();
        assert!(t.matches(&concrete_braw()));
        assert!(!t.matches(&concrete_braw()[1..]));
    }

    proptest! {
        #[test]
        fn prop_wildcards_accept_any_byte(a in any::<u8>(), b in any::<u8>(), c in any::<u8>()) {
            let mut sig = concrete_braw();
            sig[8] = a;
            sig[9] = b;
            sig[10] = c;
            let mut m = Matcher::new(Template::braw_start());
            let hits = feed(&mut m, &sig);
            prop_assert_eq!(hits, vec![(15, sig.clone())]);
        }

        #[test]
        fn prop_signature_found_at_any_offset(
            prefix in proptest::collection::vec(0x30u8..0x40, 0..256),
        ) {
            // Prefix bytes never start the template, so nothing overlaps it.
            let mut stream = prefix.clone();
            stream.extend_from_slice(&concrete_braw());
            let mut m = Matcher::new(Template::braw_start());
            let hits = feed(&mut m, &stream);
            prop_assert_eq!(hits, vec![(prefix.len() + 15, concrete_braw())]);
        }

        #[test]
        fn prop_cursor_stays_in_bounds(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            let mut m = Matcher::new(Template::wave_start());
            for b in data {
                m.advance(b);
                prop_assert!(m.cursor() < m.template().len());
                prop_assert_eq!(m.pending().len(), m.cursor());
            }
        }
    }
}
