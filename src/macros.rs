/// Compile a literal pattern once and hand out a `&'static Regex`.
///
/// Only for patterns fixed at compile time (tokenizer shapes). Patterns derived
/// from configuration are compiled into the owning value instead.
#[macro_export]
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).expect("static pattern compiles"));
        &*RE
    }};
}

/// Build a [`SegmentSet`](crate::SegmentSet) from string literals.
#[cfg(test)]
macro_rules! segments {
    ($($seg:expr),* $(,)?) => {{
        let set: $crate::SegmentSet = [$($seg),*].into_iter().map(String::from).collect();
        set
    }};
}
