//! Incremental parser for the tagged streaming reply format.
//!
//! A streamed reply is a sequence of sections such as
//! `<analysis>intent: WORK</analysis>` or `<reply npc="Mei">...</reply>`.
//! Tokens arrive in arbitrary chunks; [`TagStreamParser::push`] buffers them
//! and yields each section as soon as its closing tag has been seen, so the
//! output never depends on how the transport split the text.

use std::collections::BTreeMap;

use cubicle_core::narrator::NarrationSection;
use cubicle_types::Intent;

/// One complete `<tag attr="v">body</tag>` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedSection {
    /// Lowercased tag name.
    pub tag: String,
    /// Attributes, keyed by lowercased name.
    pub attrs: BTreeMap<String, String>,
    /// Trimmed body text.
    pub body: String,
}

/// Buffers streamed text and emits completed sections.
#[derive(Debug, Default)]
pub struct TagStreamParser {
    buffer: String,
}

impl TagStreamParser {
    /// Create an empty parser.
    pub const fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    /// Feed a chunk and return every section it completed.
    pub fn push(&mut self, chunk: &str) -> Vec<TaggedSection> {
        self.buffer.push_str(chunk);
        let mut sections = Vec::new();
        while let Some(step) = next_section(&self.buffer) {
            match step {
                Step::Skip(consumed) => {
                    self.buffer.replace_range(..consumed, "");
                }
                Step::Section(section, consumed) => {
                    self.buffer.replace_range(..consumed, "");
                    sections.push(section);
                }
            }
        }
        sections
    }

    /// Text still waiting for a closing tag.
    pub fn pending(&self) -> &str {
        self.buffer.trim()
    }
}

enum Step {
    /// Drop this many bytes of noise.
    Skip(usize),
    /// A finished section, and the bytes it spanned.
    Section(TaggedSection, usize),
}

/// Find the next actionable step in `buffer`, or `None` if more input is
/// needed.
fn next_section(buffer: &str) -> Option<Step> {
    let Some(open) = buffer.find('<') else {
        return (!buffer.is_empty()).then_some(Step::Skip(buffer.len()));
    };
    if open > 0 {
        return Some(Step::Skip(open));
    }

    let after = buffer.get(1..)?;
    let first = after.chars().next()?;
    if !first.is_ascii_alphabetic() {
        // Stray `<` or a closing tag with no opener.
        return Some(Step::Skip(1));
    }

    let head_len = after.find('>')?;
    let head = after.get(..head_len)?;
    let (name, attrs) = parse_head(head);
    let body_start = head_len.saturating_add(2);

    let close = format!("</{name}>");
    let rest = buffer.get(body_start..)?;
    let body_len = find_ascii_ci(rest, &close)?;
    let body = rest.get(..body_len)?.trim().to_owned();
    let consumed = body_start
        .saturating_add(body_len)
        .saturating_add(close.len());
    Some(Step::Section(
        TaggedSection {
            tag: name,
            attrs,
            body,
        },
        consumed,
    ))
}

/// Split `name key="v" key2='w'` into a lowercased name and attributes.
fn parse_head(head: &str) -> (String, BTreeMap<String, String>) {
    let head = head.trim().trim_end_matches('/');
    let name_end = head.find(char::is_whitespace).unwrap_or(head.len());
    let name = head.get(..name_end).unwrap_or(head).to_ascii_lowercase();
    let mut attrs = BTreeMap::new();
    let mut rest = head.get(name_end..).unwrap_or("").trim_start();
    while let Some(eq) = rest.find('=') {
        let key = rest.get(..eq).unwrap_or("").trim().to_ascii_lowercase();
        let value_part = rest.get(eq.saturating_add(1)..).unwrap_or("").trim_start();
        let Some(quote) = value_part.chars().next().filter(|c| *c == '"' || *c == '\'') else {
            // Unquoted value: runs to the next whitespace.
            let end = value_part.find(char::is_whitespace).unwrap_or(value_part.len());
            attrs.insert(key, value_part.get(..end).unwrap_or("").to_owned());
            rest = value_part.get(end..).unwrap_or("").trim_start();
            continue;
        };
        let quoted = value_part.get(1..).unwrap_or("");
        let end = quoted.find(quote).unwrap_or(quoted.len());
        attrs.insert(key, quoted.get(..end).unwrap_or("").to_owned());
        rest = quoted.get(end.saturating_add(1)..).unwrap_or("").trim_start();
    }
    (name, attrs)
}

/// Byte offset of `needle` in `haystack`, ignoring ASCII case.
fn find_ascii_ci(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .char_indices()
        .map(|(i, _)| i)
        .find(|&i| {
            haystack
                .get(i..i.saturating_add(needle.len()))
                .is_some_and(|window| window.eq_ignore_ascii_case(needle))
        })
}

/// `key: value` lines of a section body, keyed by lowercased key.
fn fields(body: &str) -> BTreeMap<String, String> {
    body.lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_owned()))
        .collect()
}

fn number(fields: &BTreeMap<String, String>, key: &str) -> Option<f64> {
    fields
        .get(key)
        .and_then(|v| v.trim_start_matches('+').parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

impl TaggedSection {
    /// Interpret the section as a narration event.
    ///
    /// Unknown tags yield `None`. `default_npc` names the speaker of a reply
    /// whose tag carries no `npc` attribute.
    pub fn to_narration(&self, default_npc: &str) -> Option<NarrationSection> {
        match self.tag.as_str() {
            "analysis" => {
                let fields = fields(&self.body);
                Some(NarrationSection::Analysis {
                    intent: fields.get("intent").and_then(|v| Intent::from_label(v.as_str())),
                    magnitude: number(&fields, "magnitude"),
                })
            }
            "narrative" => Some(NarrationSection::Narrative {
                text: self.body.clone(),
            }),
            "reply" => {
                let npc = self
                    .attrs
                    .get("npc")
                    .map(|n| n.trim())
                    .filter(|n| !n.is_empty())
                    .unwrap_or(default_npc);
                Some(NarrationSection::Reply {
                    npc: npc.to_owned(),
                    text: self.body.clone(),
                })
            }
            "effects" => {
                let fields = fields(&self.body);
                Some(NarrationSection::Effects {
                    mood: number(&fields, "mood").map_or(0, cubicle_core::num::trunc),
                    trust: number(&fields, "trust").map_or(0, cubicle_core::num::trunc),
                })
            }
            "error" => Some(NarrationSection::Error {
                message: self.body.clone(),
            }),
            _ => None,
        }
    }
}
