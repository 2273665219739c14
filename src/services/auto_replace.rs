//! Typographic substitution table (smart quotes, dashes, ellipsis, symbols).
//!
//! Rules are applied in registration order. A rule whose pattern fails to
//! compile is kept in the table but stays disabled; the others still run.

use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};

use crate::utils::text::byte_to_char;

/// Chars on each side of the cursor examined by [`AutoReplaceEngine::apply_near_cursor`].
const CURSOR_CONTEXT: usize = 50;
/// Only matches starting this close to the cursor are replaced while typing.
const CURSOR_REACH: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplaceKind {
    SmartQuotes,
    Dashes,
    Ellipsis,
    Fractions,
    Symbols,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplaceRule {
    pub pattern: String,
    /// Replacement text; `${n}` refers to capture group `n`.
    pub replacement: String,
    pub kind: ReplaceKind,
    pub description: String,
    pub enabled: bool,
}

#[derive(Debug)]
struct CompiledRule {
    rule: ReplaceRule,
    regex: Option<Regex>,
}

impl CompiledRule {
    fn new(rule: ReplaceRule) -> Self {
        let regex = match Regex::new(&rule.pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!(
                    "Disabling replace rule '{}' ({}): {}",
                    rule.description, rule.pattern, e
                );
                None
            }
        };
        let enabled = rule.enabled && regex.is_some();
        Self {
            rule: ReplaceRule { enabled, ..rule },
            regex,
        }
    }

    fn active(&self) -> Option<&Regex> {
        if self.rule.enabled {
            self.regex.as_ref()
        } else {
            None
        }
    }
}

const DEFAULT_RULES: &[(&str, &str, ReplaceKind, &str)] = &[
    (r#"(?m)(^|\s)"(\w)"#, "${1}\u{201C}${2}", ReplaceKind::SmartQuotes, "opening double quote"),
    (r#"(?m)(\w)"([\s,.!?;:]|$)"#, "${1}\u{201D}${2}", ReplaceKind::SmartQuotes, "closing double quote"),
    (r"(?m)(^|\s)'(\w)", "${1}\u{2018}${2}", ReplaceKind::SmartQuotes, "opening single quote"),
    (r"(?m)(\w)'([\s,.!?;:]|$)", "${1}\u{2019}${2}", ReplaceKind::SmartQuotes, "closing single quote"),
    (r"(\w)\s*--\s*(\w)", "${1}\u{2014}${2}", ReplaceKind::Dashes, "em dash"),
    (r"(\d)\s*-\s*(\d)", "${1}\u{2013}${2}", ReplaceKind::Dashes, "en dash in number ranges"),
    (r"\.{3}", "\u{2026}", ReplaceKind::Ellipsis, "ellipsis"),
    (r"\b1/2\b", "\u{BD}", ReplaceKind::Fractions, "one half"),
    (r"\b1/3\b", "\u{2153}", ReplaceKind::Fractions, "one third"),
    (r"\b2/3\b", "\u{2154}", ReplaceKind::Fractions, "two thirds"),
    (r"\b1/4\b", "\u{BC}", ReplaceKind::Fractions, "one quarter"),
    (r"\b3/4\b", "\u{BE}", ReplaceKind::Fractions, "three quarters"),
    (r"\(c\)", "\u{A9}", ReplaceKind::Symbols, "copyright"),
    (r"\(r\)", "\u{AE}", ReplaceKind::Symbols, "registered"),
    (r"\(tm\)", "\u{2122}", ReplaceKind::Symbols, "trademark"),
    (r"<->", "\u{2194}", ReplaceKind::Symbols, "two-way arrow"),
    (r"->", "\u{2192}", ReplaceKind::Symbols, "right arrow"),
    (r"<-", "\u{2190}", ReplaceKind::Symbols, "left arrow"),
];

#[derive(Debug)]
pub struct AutoReplaceEngine {
    rules: Vec<CompiledRule>,
    enabled: bool,
}

impl Default for AutoReplaceEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AutoReplaceEngine {
    /// Engine with the default typographic rules.
    pub fn new() -> Self {
        let rules = DEFAULT_RULES
            .iter()
            .map(|(pattern, replacement, kind, description)| {
                CompiledRule::new(ReplaceRule {
                    pattern: pattern.to_string(),
                    replacement: replacement.to_string(),
                    kind: *kind,
                    description: description.to_string(),
                    enabled: true,
                })
            })
            .collect();
        Self {
            rules,
            enabled: true,
        }
    }

    /// Engine with no rules.
    pub fn empty() -> Self {
        Self {
            rules: Vec::new(),
            enabled: true,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        info!(
            "Auto-replace {}",
            if enabled { "enabled" } else { "disabled" }
        );
    }

    pub fn rules(&self) -> Vec<&ReplaceRule> {
        self.rules.iter().map(|r| &r.rule).collect()
    }

    pub fn rules_of(&self, kind: ReplaceKind) -> Vec<&ReplaceRule> {
        self.rules
            .iter()
            .map(|r| &r.rule)
            .filter(|r| r.kind == kind)
            .collect()
    }

    /// Append a rule. Returns false when the pattern is malformed; the rule
    /// is still recorded, disabled.
    pub fn add_rule(&mut self, rule: ReplaceRule) -> bool {
        let compiled = CompiledRule::new(rule);
        let ok = compiled.regex.is_some();
        if ok {
            info!("Added replace rule '{}'", compiled.rule.description);
        }
        self.rules.push(compiled);
        ok
    }

    /// Shorthand for a [`ReplaceKind::Custom`] rule.
    pub fn add_custom_rule(&mut self, pattern: &str, replacement: &str, description: &str) -> bool {
        self.add_rule(ReplaceRule {
            pattern: pattern.to_string(),
            replacement: replacement.to_string(),
            kind: ReplaceKind::Custom,
            description: description.to_string(),
            enabled: true,
        })
    }

    pub fn remove_rule(&mut self, description: &str) -> bool {
        match self
            .rules
            .iter()
            .position(|r| r.rule.description == description)
        {
            Some(idx) => {
                self.rules.remove(idx);
                info!("Removed replace rule '{}'", description);
                true
            }
            None => false,
        }
    }

    /// Toggle the rule at `index`. Malformed rules cannot be enabled.
    pub fn set_rule_enabled(&mut self, index: usize, enabled: bool) -> bool {
        let Some(compiled) = self.rules.get_mut(index) else {
            return false;
        };
        if enabled && compiled.regex.is_none() {
            return false;
        }
        compiled.rule.enabled = enabled;
        true
    }

    /// Run every enabled rule over the whole text.
    pub fn apply(&self, text: &str) -> String {
        if !self.enabled {
            return text.to_string();
        }
        let mut result = text.to_string();
        for compiled in &self.rules {
            let Some(regex) = compiled.active() else {
                continue;
            };
            result = regex
                .replace_all(&result, compiled.rule.replacement.as_str())
                .into_owned();
        }
        result
    }

    /// Replace only matches that start within a few chars of `cursor`
    /// (char offset), returning the new text and the shifted cursor.
    pub fn apply_near_cursor(&self, text: &str, cursor: usize) -> (String, usize) {
        let chars: Vec<char> = text.chars().collect();
        if !self.enabled || cursor > chars.len() {
            return (text.to_string(), cursor);
        }
        let start = cursor.saturating_sub(CURSOR_CONTEXT);
        let end = (cursor + CURSOR_CONTEXT).min(chars.len());
        let mut window: String = chars[start..end].iter().collect();
        let relative = cursor - start;
        let mut shift: isize = 0;

        for compiled in &self.rules {
            let Some(regex) = compiled.active() else {
                continue;
            };
            let hits: Vec<(usize, usize, String)> = regex
                .captures_iter(&window)
                .filter_map(|caps| {
                    let m = caps.get(0)?;
                    let mut replacement = String::new();
                    caps.expand(&compiled.rule.replacement, &mut replacement);
                    Some((m.start(), m.end(), replacement))
                })
                .collect();
            // back to front so earlier byte offsets stay valid
            for (byte_start, byte_end, replacement) in hits.into_iter().rev() {
                let char_start = byte_to_char(&window, byte_start);
                if char_start.abs_diff(relative) > CURSOR_REACH {
                    continue;
                }
                let old_len = byte_to_char(&window, byte_end) - char_start;
                window.replace_range(byte_start..byte_end, &replacement);
                if char_start <= relative {
                    shift += replacement.chars().count() as isize - old_len as isize;
                }
            }
        }

        let mut out: String = chars[..start].iter().collect();
        out.push_str(&window);
        out.extend(&chars[end..]);
        let new_cursor = (cursor as isize + shift).max(0) as usize;
        (out, new_cursor)
    }
}
