//! Pattern compiler and structural matcher.
//!
//! Adapters declare how they are written as pattern text:
//!
//! ```text
//! [the] altitude[s] of %locations%
//! stop (all|every) sound[s] [(in|from) %text%]
//! ```
//!
//! Syntax elements: `[x]` optional group, `(a|b|c)` alternation, `%type%`
//! single-value placeholder, `%types%` plural placeholder (the type's plural
//! name), `%a/b%` union-typed placeholder. Compilation turns the text into a
//! `PatternPart` tree plus a flat slot table; matching walks it against an
//! input fragment and reports, per slot, which sub-span the placeholder
//! consumed.
//!
//! ## Matching order
//!
//! Matching is a backtracking walk with a fixed, documented order; the
//! parser's first-match-wins contract depends on it being deterministic:
//!
//! - optional groups are greedy: taken before skipped
//! - alternatives are tried left to right
//! - placeholder spans are tried shortest first and only end on word
//!   boundaries
//!
//! The walk keeps a stack of pending part sequences and backtracks in
//! place, so a mismatched prefix prunes every split behind it; the group
//! structure is never expanded into flat sequences. Group nesting is capped
//! at [`MAX_GROUP_DEPTH`].
//!
//! ## Flexible spaces
//!
//! A space in pattern text matches one input space, or nothing at the edges
//! of the input and after an already-consumed space. That is what makes
//! `[the] altitude[s] of %locations%` match both "the altitudes of ..." and
//! "altitude of ..." without the pattern author thinking about spacing.

use crate::error::PatternError;

use super::types::{TypeId, TypeRegistry};

/// Maximum group nesting depth a pattern may use.
pub(crate) const MAX_GROUP_DEPTH: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PatternPart {
    Literal(String),
    Optional(Vec<PatternPart>),
    Choice(Vec<Vec<PatternPart>>),
    Slot(usize),
}

/// What a placeholder accepts: one or more types, single or plural.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotSpec {
    pub types: Vec<TypeId>,
    pub plural: bool,
}

/// Byte span into the matched input fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// A compiled, matchable pattern.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    source: String,
    pub(crate) parts: Vec<PatternPart>,
    pub(crate) slots: Vec<SlotSpec>,
}

impl CompiledPattern {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn slots(&self) -> &[SlotSpec] {
        &self.slots
    }
}

// --- Compilation -------------------------------------------------------------

struct Compiler<'a> {
    bytes: &'a [u8],
    text: &'a str,
    pos: usize,
    types: &'a TypeRegistry,
    slots: Vec<SlotSpec>,
}

/// Compile pattern text against the known types.
pub fn compile(text: &str, types: &TypeRegistry) -> Result<CompiledPattern, PatternError> {
    let mut compiler = Compiler { bytes: text.as_bytes(), text, pos: 0, types, slots: Vec::new() };
    let parts = compiler.sequence(1)?;
    if compiler.pos < compiler.bytes.len() {
        // A stray closer or separator outside any group.
        return Err(PatternError::UnexpectedChar {
            ch: compiler.bytes[compiler.pos] as char,
            at: compiler.pos,
        });
    }
    if !always_has_literal(&parts) {
        return Err(PatternError::MissingLiteral);
    }
    Ok(CompiledPattern { source: text.to_string(), parts, slots: compiler.slots })
}

impl<'a> Compiler<'a> {
    /// Parse parts until a group closer / alternation separator (left for the
    /// caller to consume) or the end of the pattern.
    fn sequence(&mut self, depth: usize) -> Result<Vec<PatternPart>, PatternError> {
        if depth > MAX_GROUP_DEPTH {
            return Err(PatternError::TooDeep { max: MAX_GROUP_DEPTH });
        }
        let mut parts: Vec<PatternPart> = Vec::new();
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b']' | b')' | b'|' => break,
                b'[' => {
                    let open = self.pos;
                    self.pos += 1;
                    let inner = self.sequence(depth + 1)?;
                    if self.pos >= self.bytes.len() || self.bytes[self.pos] != b']' {
                        return Err(PatternError::UnbalancedGroup(open));
                    }
                    self.pos += 1;
                    parts.push(PatternPart::Optional(inner));
                }
                b'(' => {
                    let open = self.pos;
                    self.pos += 1;
                    let mut alternatives = Vec::new();
                    loop {
                        let alt_start = self.pos;
                        let alt = self.sequence(depth + 1)?;
                        if alt.is_empty() {
                            return Err(PatternError::EmptyAlternative(alt_start));
                        }
                        alternatives.push(alt);
                        match self.bytes.get(self.pos) {
                            Some(b'|') => self.pos += 1,
                            Some(b')') => {
                                self.pos += 1;
                                break;
                            }
                            _ => return Err(PatternError::UnbalancedGroup(open)),
                        }
                    }
                    parts.push(PatternPart::Choice(alternatives));
                }
                b'%' => {
                    let slot = self.placeholder()?;
                    parts.push(PatternPart::Slot(slot));
                }
                _ => {
                    let start = self.pos;
                    while self.pos < self.bytes.len() && !matches!(self.bytes[self.pos], b'[' | b']' | b'(' | b')' | b'|' | b'%') {
                        self.pos += 1;
                    }
                    let literal = &self.text[start..self.pos];
                    if let Some(PatternPart::Literal(prev)) = parts.last_mut() {
                        prev.push_str(literal);
                    } else {
                        parts.push(PatternPart::Literal(literal.to_string()));
                    }
                }
            }
        }
        Ok(parts)
    }

    /// `%type%`, `%types%`, `%a/b%`: resolve the names and intern a slot.
    fn placeholder(&mut self) -> Result<usize, PatternError> {
        let open = self.pos;
        self.pos += 1;
        let start = self.pos;
        while self.pos < self.bytes.len() && self.bytes[self.pos] != b'%' {
            self.pos += 1;
        }
        if self.pos >= self.bytes.len() {
            return Err(PatternError::UnterminatedPlaceholder(open));
        }
        let body = &self.text[start..self.pos];
        self.pos += 1;

        let mut type_ids = Vec::new();
        let mut plural = false;
        for name in body.split('/') {
            let name = name.trim();
            let (id, is_plural) =
                self.types.lookup_placeholder(name).ok_or_else(|| PatternError::UnknownType(name.to_string()))?;
            if !type_ids.contains(&id) {
                type_ids.push(id);
            }
            plural |= is_plural;
        }
        if type_ids.is_empty() {
            return Err(PatternError::UnknownType(body.to_string()));
        }
        let idx = self.slots.len();
        self.slots.push(SlotSpec { types: type_ids, plural });
        Ok(idx)
    }
}

/// True when every expansion of the pattern keeps at least one literal word.
/// Optional groups contribute nothing here since they may be skipped; a choice
/// counts only when all of its alternatives do. Patterns failing this check
/// could match a slot span as wide as the whole input, which the parser must
/// never see.
fn always_has_literal(parts: &[PatternPart]) -> bool {
    parts.iter().any(|part| match part {
        PatternPart::Literal(s) => !s.trim().is_empty(),
        PatternPart::Optional(_) => false,
        PatternPart::Choice(alternatives) => alternatives.iter().all(|alt| always_has_literal(alt)),
        PatternPart::Slot(_) => false,
    })
}

// --- Matching ----------------------------------------------------------------

/// Match `input` against the pattern, reporting each complete split to
/// `visit` in deterministic order. The visitor returns `true` to accept the
/// split and stop the walk; `match_pattern` returns whether any split was
/// accepted.
///
/// The slot-span slice handed to the visitor is indexed by slot; `None`
/// means the placeholder sat inside a skipped optional group.
pub(crate) fn match_pattern<F>(pattern: &CompiledPattern, input: &str, visit: &mut F) -> bool
where
    F: FnMut(&[Option<Span>]) -> bool,
{
    let mut spans: Vec<Option<Span>> = vec![None; pattern.slots.len()];
    match_seq(&[&pattern.parts], input, 0, &mut spans, visit)
}

/// Backtracking match over the group structure, in matching order:
/// optionals taken before skipped, alternatives left to right, slot spans
/// shortest first.
///
/// `stack` holds the pending part sequences, current one last; entering a
/// group pushes its body as a new frame on top of the remaining tail.
fn match_seq<F>(
    stack: &[&[PatternPart]],
    input: &str,
    pos: usize,
    spans: &mut Vec<Option<Span>>,
    visit: &mut F,
) -> bool
where
    F: FnMut(&[Option<Span>]) -> bool,
{
    let Some((&seq, rest)) = stack.split_last() else {
        return pos == input.len() && visit(spans);
    };
    let Some((part, tail)) = seq.split_first() else {
        return match_seq(rest, input, pos, spans, visit);
    };
    let mut with_tail: Vec<&[PatternPart]> = rest.to_vec();
    with_tail.push(tail);
    match part {
        PatternPart::Literal(text) => match match_literal(text, input, pos) {
            Some(next) => match_seq(&with_tail, input, next, spans, visit),
            None => false,
        },
        PatternPart::Slot(index) => {
            let bytes = input.as_bytes();
            let mut start = pos;
            while start < bytes.len() && bytes[start] == b' ' {
                start += 1;
            }
            if start >= input.len() {
                return false;
            }
            // Shortest span first, ending only on word boundaries.
            for end in (start + 1)..=input.len() {
                if end < input.len() && bytes[end] != b' ' {
                    continue;
                }
                if input[start..end].trim().is_empty() {
                    continue;
                }
                spans[*index] = Some(Span { start, end });
                if match_seq(&with_tail, input, end, spans, visit) {
                    return true;
                }
                spans[*index] = None;
            }
            false
        }
        PatternPart::Optional(inner) => {
            let mut taken = with_tail.clone();
            taken.push(inner);
            match_seq(&taken, input, pos, spans, visit) || match_seq(&with_tail, input, pos, spans, visit)
        }
        PatternPart::Choice(alternatives) => alternatives.iter().any(|alternative| {
            let mut branch = with_tail.clone();
            branch.push(alternative);
            match_seq(&branch, input, pos, spans, visit)
        }),
    }
}

/// Case-insensitive literal match with flexible spaces: a pattern space
/// matches one input space, or nothing at the input edges and after an
/// already-consumed space (a skipped optional group).
fn match_literal(literal: &str, input: &str, start: usize) -> Option<usize> {
    let bytes = input.as_bytes();
    let mut pos = start;
    for &c in literal.as_bytes() {
        if c == b' ' {
            if pos < bytes.len() && bytes[pos] == b' ' {
                pos += 1;
            } else if pos == 0 || pos >= bytes.len() || bytes[pos - 1] == b' ' {
                continue;
            } else {
                return None;
            }
        } else {
            if pos >= bytes.len() || !bytes[pos].eq_ignore_ascii_case(&c) {
                return None;
            }
            pos += 1;
        }
    }
    Some(pos)
}
