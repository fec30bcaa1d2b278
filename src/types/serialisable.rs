/// Types implementing RespSerialisable can be written to the broker as a RESP
/// request.
pub trait RespSerialisable {
    /// Converts the value in question to a RESP array of bulk strings.
    fn serialise_resp(&self) -> Vec<u8>;
}

/// Encodes a command name and arguments as `*<n>` followed by one
/// `$<len>\r\n<bytes>\r\n` per part.
pub fn encode_request<S: AsRef<[u8]>>(name: &str, args: &[S]) -> Vec<u8> {
    let mut out = format!("*{}\r\n", args.len() + 1).into_bytes();

    for part in std::iter::once(name.as_bytes())
        .chain(args.iter().map(|a| a.as_ref()))
    {
        out.extend_from_slice(format!("${}\r\n", part.len()).as_bytes());
        out.extend_from_slice(part);
        out.extend_from_slice(b"\r\n");
    }

    out
}
