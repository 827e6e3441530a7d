#[macro_export]
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).unwrap());
        &*RE
    }};
}

/// Declare a leaf adapter: its sentence patterns, return type, and the
/// conversion it applies to its evaluated arguments.
///
/// Optional metadata:
/// - `priority`: candidate tier (default [`Priority::Simple`]).
/// - `times`: supported time states (default `PRESENT` only).
/// - `plural`: force the node's cardinality instead of deriving it from the
///   bound arguments (`true` = many values, `false` = at most one).
/// - `foldable`: whether a literal-only call may be constant-folded
///   (default `true`; event-dependent or volatile adapters must opt out).
#[macro_export]
macro_rules! adapter {
    (@or $default:expr) => { $default };
    (@or $default:expr, $value:expr) => { $value };
    (
        id: $id:expr,
        returns: $returns:expr,
        patterns: [ $($pat:expr),* $(,)? ]
        $(, priority: $priority:expr)?
        $(, times: $times:expr)?
        $(, plural: $plural:expr)?
        $(, foldable: $foldable:expr)?
        , eval: |$args:ident, $cx:ident| $body:block
        $(,)?
    ) => {{
        $crate::AdapterSpec {
            id: $id,
            returns: $returns,
            patterns: &[ $($pat),* ],
            priority: $crate::adapter!(@or $crate::Priority::Simple $(, $priority)?),
            times: $crate::adapter!(@or $crate::TimeStates::PRESENT $(, $times)?),
            plural_result: $crate::adapter!(@or None $(, Some($plural))?),
            foldable: $crate::adapter!(@or true $(, $foldable)?),
            eval: ::std::sync::Arc::new(
                move |$args: &$crate::Args<'_>, $cx: &$crate::EvalCx<'_>| $body,
            ),
        }
    }};
}
