/// Renders bytes for logs: printable ASCII as-is, everything else escaped.
pub(crate) fn bytes_to_human_str(input: &[u8]) -> String {
    input.escape_ascii().to_string()
}
