/// Chat command that enters a viewer into the open window
pub const RIP_COMMAND: &str = "!rip";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub viewer_id: String,
}

/// Parse a `<viewerId> <message>` chat line.
///
/// Only `!rip` (any case, surrounding whitespace ignored) counts as an entry.
pub fn parse_entry(line: &str) -> Option<Entry> {
    let (viewer_id, message) = line.trim().split_once(char::is_whitespace)?;
    if viewer_id.is_empty() || !message.trim().eq_ignore_ascii_case(RIP_COMMAND) {
        return None;
    }

    Some(Entry {
        viewer_id: viewer_id.to_string(),
    })
}
