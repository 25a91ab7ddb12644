/// Lines the renderer leaves behind where a template block produced nothing.
/// Matched exactly: other whitespace-only lines (tabs, four spaces) are kept.
const DROPPED_LINES: [&str; 3] = ["", "  ", "   "];

/// Split rendered text into config lines, dropping blank filler lines.
pub fn normalize(text: &str) -> Vec<String> {
    text.split('\n')
        .filter(|line| !DROPPED_LINES.contains(line))
        .map(str::to_string)
        .collect()
}
