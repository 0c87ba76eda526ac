//! Case-insensitive, first-match lookup over declaration-ordered tables.
//!
//! Every name-based lookup in the generator (targets, target properties,
//! union options, dictionary keys, time units) goes through here so that
//! the earliest declared candidate always wins when several could match.

/// Anything that can be looked up by a user-facing name.
pub trait Named {
    fn name(&self) -> &str;
}

impl Named for &str {
    fn name(&self) -> &str {
        self
    }
}

impl Named for String {
    fn name(&self) -> &str {
        self.as_str()
    }
}

/// Return the first candidate whose name equals `name`, ignoring ASCII case.
pub fn match_ignore_case<'a, T, I>(name: &str, candidates: I) -> Option<&'a T>
where
    T: Named + ?Sized + 'a,
    I: IntoIterator<Item = &'a T>,
{
    candidates
        .into_iter()
        .find(|c| c.name().eq_ignore_ascii_case(name))
}

/// Position of the first candidate matching `name`, ignoring ASCII case.
pub fn position_ignore_case<'a, T, I>(name: &str, candidates: I) -> Option<usize>
where
    T: Named + ?Sized + 'a,
    I: IntoIterator<Item = &'a T>,
{
    candidates
        .into_iter()
        .position(|c| c.name().eq_ignore_ascii_case(name))
}
