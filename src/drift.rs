/// Drops trailing blank or whitespace-only lines.
fn trim_trailing_blank<S: AsRef<str>>(lines: &[S]) -> &[S] {
    let end = lines
        .iter()
        .rposition(|line| !line.as_ref().trim().is_empty())
        .map_or(0, |index| index + 1);
    &lines[..end]
}

/// True when the live file differs from the reference line for line.
///
/// Comparison is exact and case-sensitive, so toggling a plugin or changing a
/// filename's casing counts as drift. Only trailing blank lines are ignored.
pub fn has_drifted<R, C>(reference_lines: &[R], current_lines: &[C]) -> bool
where
    R: AsRef<str>,
    C: AsRef<str>,
{
    first_difference(reference_lines, current_lines).is_some()
}

/// 1-based line number of the first mismatch, if any.
pub fn first_difference<R, C>(reference_lines: &[R], current_lines: &[C]) -> Option<usize>
where
    R: AsRef<str>,
    C: AsRef<str>,
{
    let reference = trim_trailing_blank(reference_lines);
    let current = trim_trailing_blank(current_lines);

    if let Some(index) = reference
        .iter()
        .zip(current.iter())
        .position(|(a, b)| a.as_ref() != b.as_ref())
    {
        return Some(index + 1);
    }
    if reference.len() != current.len() {
        return Some(reference.len().min(current.len()) + 1);
    }
    None
}
