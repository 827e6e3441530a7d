//! Sentence parser.
//!
//! Turns one normalized sentence fragment into an [`Expr`] tree. The walk is
//! recursive descent over the frozen candidate lists:
//!
//! ```text
//! "altitude of {_loc}"  expected: number
//!     │
//!     ├─ time marker?        ("past ...", "future ...")
//!     ├─ variable reference? ({name} over the whole fragment)
//!     ├─ adapter candidates  (per expected type, frozen order; each slot
//!     │                       span recurses with the slot's types)
//!     ├─ literal fallback    (type parsers, direct then via converters)
//!     └─ list split          (", " / " and ", plural slots only)
//! ```
//!
//! The first candidate that matches wins; everything after it is never
//! tried. Candidate order is frozen at build time, so the same vocabulary
//! parses the same sentence to the same tree on every run.
//!
//! Parsing touches no mutable state outside its own stack. Failures feed a
//! deepest-offset tracker so the final diagnostic points at the placeholder
//! that got furthest, not at byte zero.

use tracing::{debug, trace};

use crate::TimeState;
use crate::error::{ParseError, ParseFailure};

use super::EngineView;
use super::eval::Expr;
use super::pattern::match_pattern;
use super::types::TypeId;

/// Recursion cap for slot parsing. Every recursion step consumes at least
/// one literal word, so this depth is never reached by sane input; it
/// bounds the damage of a pathological vocabulary.
pub(crate) const MAX_PARSE_DEPTH: usize = 32;

/// Parse one sentence against a single expected type.
///
/// The top level accepts plural results, so `"1, 2 and 3"` parses as a
/// list when the expected type allows it.
pub(crate) fn parse(view: &EngineView<'_>, text: &str, expected: TypeId) -> Result<Expr, ParseError> {
    let normalized = normalize(text);
    let mut deepest = Deepest::new();
    if let Some(expr) = fragment(view, &normalized, 0, &[expected], true, 0, &mut deepest)? {
        debug!(sentence = %normalized, node = %expr.label(view.registry), "parsed");
        return Ok(expr);
    }
    Err(ParseError::Failure(ParseFailure {
        text: normalized,
        offset: deepest.offset,
        expected: deepest.expected.unwrap_or_else(|| view.types.name(expected).to_string()),
    }))
}

/// Collapse runs of whitespace to single spaces and trim the ends. All
/// offsets in diagnostics refer to the normalized text.
pub(crate) fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Deepest-progress failure tracker. Only the furthest offset is kept;
/// ties keep the first explanation recorded there.
struct Deepest {
    offset: usize,
    expected: Option<String>,
}

impl Deepest {
    fn new() -> Self {
        Deepest { offset: 0, expected: None }
    }

    fn note(&mut self, offset: usize, expected: impl FnOnce() -> String) {
        if self.expected.is_none() || offset > self.offset {
            self.offset = offset;
            self.expected = Some(expected());
        }
    }
}

/// Parse one fragment against a set of accepted types.
///
/// `base` is the fragment's byte offset in the whole normalized sentence,
/// used for diagnostics only. `Ok(None)` means "no interpretation"; the
/// caller tries its next split. `Err` is reserved for failures that must
/// not be retried away, such as an unsupported time state on an adapter
/// that already matched.
fn fragment(
    view: &EngineView<'_>,
    text: &str,
    base: usize,
    accepted: &[TypeId],
    plural: bool,
    depth: usize,
    deepest: &mut Deepest,
) -> Result<Option<Expr>, ParseError> {
    if depth >= MAX_PARSE_DEPTH {
        deepest.note(base, || expected_names(view, accepted));
        return Ok(None);
    }

    // A leading time marker reinterprets the rest of the fragment under
    // that state. If nothing matches the marked reading, the marker words
    // fall through and are parsed as ordinary sentence text.
    if let Some((time, skip)) = time_marker(text) {
        if let Some(expr) =
            candidates(view, &text[skip..], base + skip, accepted, plural, Some(time), depth, deepest)?
        {
            return Ok(Some(expr));
        }
    }

    if let Some((name, many)) = variable_name(text) {
        if many && !plural {
            deepest.note(base, || expected_names(view, accepted));
            return Ok(None);
        }
        return Ok(Some(Expr::Variable {
            name: name.to_string(),
            expected: accepted.to_vec(),
            plural: many,
        }));
    }

    if let Some(expr) = candidates(view, text, base, accepted, plural, None, depth, deepest)? {
        return Ok(Some(expr));
    }

    if let Some(expr) = literal(view, text, accepted) {
        return Ok(Some(expr));
    }

    if plural {
        let parts = split_list(text);
        if parts.len() > 1 {
            let mut children = Vec::with_capacity(parts.len());
            let mut complete = true;
            for (offset, part) in parts {
                match fragment(view, part, base + offset, accepted, true, depth + 1, deepest)? {
                    Some(child) => children.push(child),
                    None => {
                        complete = false;
                        break;
                    }
                }
            }
            if complete {
                return Ok(Some(Expr::List { children }));
            }
        }
    }

    deepest.note(base, || expected_names(view, accepted));
    Ok(None)
}

/// Try every adapter candidate for the accepted types, in frozen order.
#[allow(clippy::too_many_arguments)]
fn candidates(
    view: &EngineView<'_>,
    text: &str,
    base: usize,
    accepted: &[TypeId],
    plural: bool,
    requested: Option<TimeState>,
    depth: usize,
    deepest: &mut Deepest,
) -> Result<Option<Expr>, ParseError> {
    for &ty in accepted {
        for &rid in view.registry.candidates_for(ty) {
            let registration = view.registry.get(rid);
            for (pattern_index, pattern) in registration.patterns.iter().enumerate() {
                let mut children: Option<Vec<Option<Expr>>> = None;
                let mut hard: Option<ParseError> = None;
                match_pattern(pattern, text, &mut |spans| {
                    let mut bound = Vec::with_capacity(spans.len());
                    for (slot, span) in pattern.slots().iter().zip(spans) {
                        match span {
                            None => bound.push(None),
                            Some(span) => {
                                let sub = &text[span.start..span.end];
                                match fragment(
                                    view,
                                    sub,
                                    base + span.start,
                                    &slot.types,
                                    slot.plural,
                                    depth + 1,
                                    deepest,
                                ) {
                                    Ok(Some(child)) => bound.push(Some(child)),
                                    Ok(None) => return false,
                                    Err(err) => {
                                        hard = Some(err);
                                        return true;
                                    }
                                }
                            }
                        }
                    }
                    children = Some(bound);
                    true
                });
                if let Some(err) = hard {
                    return Err(err);
                }
                let Some(children) = children else { continue };

                if let Some(time) = requested {
                    if !registration.times.supports(time) {
                        // The sentence already committed to this adapter;
                        // trying others would silently change its meaning.
                        return Err(ParseError::UnsupportedTime { adapter: registration.id, time });
                    }
                }

                let node = Expr::Call {
                    reg: rid,
                    pattern: pattern_index,
                    children,
                    time: requested.unwrap_or(TimeState::Present),
                };
                if !plural && !node.is_single(view.registry) {
                    continue;
                }
                trace!(adapter = registration.id, pattern = pattern.source(), "candidate bound");
                let node = if registration.return_type == ty {
                    node
                } else {
                    Expr::Convert { inner: Box::new(node), to: ty }
                };
                return Ok(Some(node));
            }
        }
    }
    Ok(None)
}

/// Literal fallback: the accepted types' own parsers first, then any type
/// whose parsed value can be carried to an accepted type. Earlier accepted
/// types and earlier-registered source types win.
fn literal(view: &EngineView<'_>, text: &str, accepted: &[TypeId]) -> Option<Expr> {
    for &ty in accepted {
        if let Some(value) = view.types.get(ty).parse(text) {
            return Some(Expr::Literal { type_id: ty, values: vec![value] });
        }
    }
    for &ty in accepted {
        for source in view.types.ids() {
            if source == ty || !view.graph.path_exists(source, ty) {
                continue;
            }
            if let Some(value) = view.types.get(source).parse(text) {
                if let Ok(converted) = view.graph.convert(view.types, &value, source, ty) {
                    return Some(Expr::Literal { type_id: ty, values: vec![converted] });
                }
            }
        }
    }
    None
}

/// A leading past/future marker. Matched ASCII case-insensitively; the
/// returned byte count covers the marker and its trailing space.
fn time_marker(text: &str) -> Option<(TimeState, usize)> {
    const MARKERS: [(&str, TimeState); 3] = [
        ("past ", TimeState::Past),
        ("former ", TimeState::Past),
        ("future ", TimeState::Future),
    ];
    for (marker, time) in MARKERS {
        // `get` also rejects a prefix that would split a multibyte character.
        if text.len() > marker.len()
            && text.get(..marker.len()).is_some_and(|head| head.eq_ignore_ascii_case(marker))
        {
            return Some((time, marker.len()));
        }
    }
    None
}

/// The fragment is a `{name}` reference covering the whole span. The name
/// is kept verbatim, including a `_` local prefix. A `::*` suffix marks a
/// list variable; a plain `{name}` promises at most one value.
fn variable_name(text: &str) -> Option<(&str, bool)> {
    let captures = regex!(r"^\{(_?[A-Za-z][A-Za-z0-9 _.-]*)(::\*)?\}$").captures(text)?;
    let name = captures.get(1)?.as_str();
    Some((name, captures.get(2).is_some()))
}

/// Split an "a, b and c" enumeration at its top level. Separators inside
/// double quotes or `{...}` references do not count. Returns each part with
/// its byte offset; a single-element result means "not a list".
fn split_list(text: &str) -> Vec<(usize, &str)> {
    const AND_COMMA: &str = ", and ";
    const AND: &str = " and ";
    const COMMA: &str = ", ";

    let mut parts = Vec::new();
    let mut start = 0usize;
    let mut in_quotes = false;
    let mut braces = 0usize;
    let bytes = text.as_bytes();
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                in_quotes = !in_quotes;
                i += 1;
            }
            b'{' if !in_quotes => {
                braces += 1;
                i += 1;
            }
            b'}' if !in_quotes && braces > 0 => {
                braces -= 1;
                i += 1;
            }
            _ if in_quotes || braces > 0 => i += 1,
            // Continuation bytes of a multibyte character never start a
            // separator.
            _ if !text.is_char_boundary(i) => i += 1,
            _ => {
                let rest = &text[i..];
                let sep = [AND_COMMA, AND, COMMA].into_iter().find(|sep| {
                    rest.get(..sep.len()).is_some_and(|head| head.eq_ignore_ascii_case(sep))
                });
                match sep {
                    Some(sep) => {
                        parts.push((start, &text[start..i]));
                        i += sep.len();
                        start = i;
                    }
                    None => i += 1,
                }
            }
        }
    }
    parts.push((start, &text[start..]));
    parts
}

fn expected_names(view: &EngineView<'_>, accepted: &[TypeId]) -> String {
    accepted.iter().map(|&ty| view.types.name(ty)).collect::<Vec<_>>().join(" or ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::convert::ConverterGraph;
    use crate::engine::registry::{AdapterSpec, ExpressionRegistry, Priority, TimeStates};
    use crate::engine::types::{TypeDescriptor, TypeRegistry};
    use crate::{Location, Value};
    use std::sync::Arc;

    struct Fixture {
        types: TypeRegistry,
        graph: ConverterGraph,
        registry: ExpressionRegistry,
        number: TypeId,
        text: TypeId,
        location: TypeId,
    }

    fn here() -> Location {
        Location { x: 0.0, y: 64.0, z: 0.0, world: "overworld".to_string() }
    }

    fn spec(id: &'static str, returns: &'static str, patterns: &'static [&'static str]) -> AdapterSpec {
        AdapterSpec {
            id,
            returns,
            patterns,
            priority: Priority::Simple,
            times: TimeStates::PRESENT,
            plural_result: None,
            foldable: true,
            eval: Arc::new(move |_, _| Ok(vec![Value::Text(id.to_string())])),
        }
    }

    fn fixture() -> Fixture {
        let mut types = TypeRegistry::new();
        let number = types
            .register(
                TypeDescriptor::new("number", "numbers", |v| matches!(v, Value::Number(_)))
                    .with_parser(|s| s.parse::<f64>().ok().map(Value::Number)),
            )
            .unwrap();
        let text = types
            .register(
                TypeDescriptor::new("text", "texts", |v| matches!(v, Value::Text(_))).with_parser(|s| {
                    let inner = s.strip_prefix('"')?.strip_suffix('"')?;
                    Some(Value::Text(inner.to_string()))
                }),
            )
            .unwrap();
        let location = types
            .register(
                TypeDescriptor::new("location", "locations", |v| matches!(v, Value::Location(_)))
                    .with_parser(|s| s.eq_ignore_ascii_case("here").then(|| Value::Location(here()))),
            )
            .unwrap();
        let mut graph = ConverterGraph::new();
        graph
            .register(&types, number, text, Arc::new(|v| match v {
                Value::Number(n) => Some(Value::Text(n.to_string())),
                _ => None,
            }))
            .unwrap();

        let mut registry = ExpressionRegistry::new();
        registry
            .register(
                &types,
                AdapterSpec {
                    id: "altitude",
                    returns: "number",
                    patterns: &["[the] altitude[s] of %locations%"],
                    priority: Priority::Property,
                    times: TimeStates::PRESENT,
                    plural_result: None,
                    foldable: true,
                    eval: Arc::new(|args, _| {
                        Ok(args.all(0).iter().filter_map(|v| match v {
                            Value::Location(l) => Some(Value::Number(l.y)),
                            _ => None,
                        }).collect())
                    }),
                },
            )
            .unwrap();
        registry
            .register(
                &types,
                AdapterSpec {
                    id: "double",
                    returns: "number",
                    patterns: &["double %number%"],
                    priority: Priority::Combined,
                    times: TimeStates::PRESENT,
                    plural_result: None,
                    foldable: true,
                    eval: Arc::new(|args, _| {
                        Ok(args.number(0).map(|n| Value::Number(n * 2.0)).into_iter().collect())
                    }),
                },
            )
            .unwrap();
        registry.register(&types, spec("winner-first", "text", &["the winner"])).unwrap();
        registry.register(&types, spec("winner-second", "text", &["the winner"])).unwrap();
        registry
            .register(
                &types,
                AdapterSpec {
                    id: "the-message",
                    returns: "text",
                    patterns: &["the message"],
                    priority: Priority::Simple,
                    times: TimeStates::PRESENT.union(TimeStates::PAST),
                    plural_result: Some(false),
                    foldable: false,
                    eval: Arc::new(|_, cx| Ok(cx.snapshot("message").to_vec())),
                },
            )
            .unwrap();
        registry.freeze(&types, &graph);
        Fixture { types, graph, registry, number, text, location }
    }

    fn view(f: &Fixture) -> EngineView<'_> {
        EngineView { types: &f.types, graph: &f.graph, registry: &f.registry }
    }

    #[test]
    fn normalizes_whitespace() {
        assert_eq!(normalize("  the \t altitude\n of  here "), "the altitude of here");
    }

    #[test]
    fn parses_a_property_with_a_variable_slot() {
        let f = fixture();
        let expr = parse(&view(&f), "the altitude of {_loc}", f.number).unwrap();
        match expr {
            Expr::Call { children, time, .. } => {
                assert_eq!(time, TimeState::Present);
                match children[0].as_ref().unwrap() {
                    Expr::Variable { name, expected, plural } => {
                        assert_eq!(name, "_loc");
                        assert_eq!(expected, &vec![f.location]);
                        assert!(!plural);
                    }
                    other => panic!("unexpected child: {other:?}"),
                }
            }
            other => panic!("unexpected node: {other:?}"),
        }
    }

    #[test]
    fn list_variables_only_fit_plural_slots() {
        let f = fixture();
        let expr = parse(&view(&f), "altitude of {_spots::*}", f.number).unwrap();
        let Expr::Call { children, .. } = expr else { panic!() };
        assert!(matches!(
            children[0],
            Some(Expr::Variable { ref name, plural: true, .. }) if name == "_spots"
        ));
        // %number% is a single slot; a list variable cannot fill it.
        assert!(parse(&view(&f), "double {_ns::*}", f.number).is_err());
    }

    #[test]
    fn nests_calls_through_slot_spans() {
        let f = fixture();
        let expr = parse(&view(&f), "double altitude of here", f.number).unwrap();
        let Expr::Call { reg, children, .. } = expr else { panic!() };
        assert_eq!(f.registry.get(reg).id, "double");
        assert!(matches!(children[0], Some(Expr::Call { .. })));
    }

    #[test]
    fn declaration_order_breaks_ties() {
        let f = fixture();
        let expr = parse(&view(&f), "the winner", f.text).unwrap();
        let Expr::Call { reg, .. } = expr else { panic!() };
        assert_eq!(f.registry.get(reg).id, "winner-first");
    }

    #[test]
    fn parse_is_deterministic() {
        let f = fixture();
        let v = view(&f);
        let first = parse(&v, "double altitude of here", f.number).unwrap();
        for _ in 0..3 {
            assert_eq!(parse(&v, "double altitude of here", f.number).unwrap(), first);
        }
    }

    #[test]
    fn literal_fallback_parses_accepted_types_directly() {
        let f = fixture();
        let expr = parse(&view(&f), "4.5", f.number).unwrap();
        assert_eq!(expr, Expr::Literal { type_id: f.number, values: vec![Value::Number(4.5)] });
    }

    #[test]
    fn literal_fallback_converts_from_other_parsers() {
        // No text parser accepts bare digits; the number parser does, and
        // numbers convert to text.
        let f = fixture();
        let expr = parse(&view(&f), "42", f.text).unwrap();
        assert_eq!(expr, Expr::Literal { type_id: f.text, values: vec![Value::Text("42".to_string())] });
    }

    #[test]
    fn enumerations_split_into_lists() {
        let f = fixture();
        let expr = parse(&view(&f), "1, 2 and 3", f.number).unwrap();
        let Expr::List { children } = expr else { panic!("expected list") };
        assert_eq!(children.len(), 3);
        assert_eq!(children[2], Expr::Literal { type_id: f.number, values: vec![Value::Number(3.0)] });
    }

    #[test]
    fn separators_inside_quotes_do_not_split() {
        let parts = split_list(r#""a, b" and {x, y}"#);
        assert_eq!(parts, vec![(0, r#""a, b""#), (11, "{x, y}")]);
    }

    #[test]
    fn multibyte_characters_pass_through_list_splitting() {
        assert_eq!(split_list("日本語 and français"), vec![(0, "日本語"), (14, "français")]);
    }

    #[test]
    fn non_ascii_input_fails_with_a_diagnostic() {
        // Marker and separator prefix checks must not slice into a
        // multibyte character.
        let f = fixture();
        for sentence in ["pasté x", "futureほ", "日本語 and x"] {
            let err = parse(&view(&f), sentence, f.text).unwrap_err();
            assert!(matches!(err, ParseError::Failure(_)), "{sentence}");
        }
    }

    #[test]
    fn failure_points_at_the_deepest_placeholder() {
        let f = fixture();
        let err = parse(&view(&f), "altitude of the wind", f.number).unwrap_err();
        let ParseError::Failure(failure) = err else { panic!("expected failure") };
        assert_eq!(failure.offset, "altitude of ".len());
        assert_eq!(failure.expected, "location");
    }

    #[test]
    fn unknown_sentence_reports_offset_zero() {
        let f = fixture();
        let err = parse(&view(&f), "rubbish", f.location).unwrap_err();
        let ParseError::Failure(failure) = err else { panic!("expected failure") };
        assert_eq!(failure.offset, 0);
        assert_eq!(failure.expected, "location");
    }

    #[test]
    fn past_marker_binds_the_past_state() {
        let f = fixture();
        let expr = parse(&view(&f), "past the message", f.text).unwrap();
        let Expr::Call { reg, time, .. } = expr else { panic!() };
        assert_eq!(f.registry.get(reg).id, "the-message");
        assert_eq!(time, TimeState::Past);
    }

    #[test]
    fn unsupported_time_fails_at_bind() {
        let f = fixture();
        let err = parse(&view(&f), "future the message", f.text).unwrap_err();
        assert!(matches!(
            err,
            ParseError::UnsupportedTime { adapter: "the-message", time: TimeState::Future }
        ));
    }

    #[test]
    fn marker_words_fall_back_to_plain_text() {
        // No adapter matches "the winner" under a marker, but an adapter
        // whose own literal text starts with a marker word still parses.
        let mut f = fixture();
        f.registry = {
            let mut registry = ExpressionRegistry::new();
            registry.register(&f.types, spec("plans", "text", &["future plans"])).unwrap();
            registry.freeze(&f.types, &f.graph);
            registry
        };
        let expr = parse(&view(&f), "future plans", f.text).unwrap();
        let Expr::Call { reg, time, .. } = expr else { panic!() };
        assert_eq!(f.registry.get(reg).id, "plans");
        assert_eq!(time, TimeState::Present);
    }
}
