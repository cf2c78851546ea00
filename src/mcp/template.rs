//! URI templates with `{name}` placeholders.
//!
//! A template compiles into a matcher (an anchored regex where every
//! placeholder captures one or more non-`/` characters) and a generator that
//! fills placeholders from a parameter map.

use regex::Regex;
use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Result};

/// A compiled URI template.
#[derive(Debug, Clone)]
pub struct UriTemplate {
    pattern: String,
    names: Vec<String>,
    matcher: Regex,
}

/// One piece of a template: literal text or a named placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<'a> {
    Literal(&'a str),
    Param(&'a str),
}

fn tokenize(pattern: &str) -> Result<Vec<Segment<'_>>> {
    let mut segments = Vec::new();
    let mut rest = pattern;

    while let Some(open) = rest.find('{') {
        if open > 0 {
            segments.push(Segment::Literal(&rest[..open]));
        }
        let after = &rest[open + 1..];
        let close = after.find('}').ok_or_else(|| Error::InvalidTemplate {
            template: pattern.to_string(),
            message: "unclosed placeholder".to_string(),
        })?;
        let name = &after[..close];
        if name.is_empty() || name.contains(|c: char| c == '{' || c == '/') {
            return Err(Error::InvalidTemplate {
                template: pattern.to_string(),
                message: format!("invalid placeholder name '{}'", name),
            });
        }
        if segments.contains(&Segment::Param(name)) {
            return Err(Error::InvalidTemplate {
                template: pattern.to_string(),
                message: format!("duplicate placeholder '{}'", name),
            });
        }
        segments.push(Segment::Param(name));
        rest = &after[close + 1..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Literal(rest));
    }
    Ok(segments)
}

impl UriTemplate {
    /// Compile a template string.
    pub fn parse(pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();
        let segments = tokenize(&pattern)?;

        let mut source = String::from("^");
        let mut names = Vec::new();
        for segment in &segments {
            match segment {
                Segment::Literal(text) => source.push_str(&regex::escape(text)),
                Segment::Param(name) => {
                    source.push_str("([^/]+)");
                    names.push((*name).to_string());
                }
            }
        }
        source.push('$');

        let matcher = Regex::new(&source).map_err(|e| Error::InvalidTemplate {
            template: pattern.clone(),
            message: e.to_string(),
        })?;

        Ok(Self {
            pattern,
            names,
            matcher,
        })
    }

    /// The raw template string.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Placeholder names in order of appearance.
    pub fn param_names(&self) -> &[String] {
        &self.names
    }

    /// Substitute placeholders from `params`.
    ///
    /// Placeholders without a value are left as literal `{name}` text.
    pub fn fill(&self, params: &HashMap<String, String>) -> String {
        // Tokenizing cannot fail here: the pattern was validated in `parse`.
        let Ok(segments) = tokenize(&self.pattern) else {
            return self.pattern.clone();
        };

        let mut out = String::with_capacity(self.pattern.len());
        for segment in segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Param(name) => match params.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                },
            }
        }
        out
    }

    /// Match a concrete URI, returning the captured parameters.
    ///
    /// The whole URI must match.
    pub fn match_uri(&self, uri: &str) -> Option<HashMap<String, String>> {
        let captures = self.matcher.captures(uri)?;
        let params = self
            .names
            .iter()
            .enumerate()
            .filter_map(|(i, name)| {
                captures
                    .get(i + 1)
                    .map(|m| (name.clone(), m.as_str().to_string()))
            })
            .collect();
        Some(params)
    }
}

impl fmt::Display for UriTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}
