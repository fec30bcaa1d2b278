use bytes::Bytes;

/// A decoded reply from the broker.
///
/// RESP status replies (`+OK`) and bulk strings (`$3\r\nfoo`) both land in
/// `Bulk`: nothing in the Disque command set distinguishes them.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Reply {
    /// On the wire: `$-1` or `*-1`.
    Nil,
    /// On the wire: `:<n>`.
    Integer(i64),
    /// On the wire: `+<text>` or `$<len>` plus data.
    Bulk(Bytes),
    /// On the wire: `*<n>` followed by `n` replies.
    Array(Vec<Reply>),
    /// On the wire: `-<reason>`. The reason keeps its leading code token,
    /// e.g. `NOJOB Job not known in the context of this node.`
    Error(String),
}

impl Reply {
    /// Short name for the reply kind, used in decode error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Reply::Nil => "nil",
            Reply::Integer(_) => "integer",
            Reply::Bulk(_) => "bulk",
            Reply::Array(_) => "array",
            Reply::Error(_) => "error",
        }
    }

    /// Builds a bulk reply from anything string-like.
    pub fn bulk(value: impl Into<Bytes>) -> Self {
        Reply::Bulk(value.into())
    }
}

impl From<i64> for Reply {
    fn from(value: i64) -> Self {
        Reply::Integer(value)
    }
}

impl From<&'static str> for Reply {
    fn from(value: &'static str) -> Self {
        Reply::Bulk(Bytes::from_static(value.as_bytes()))
    }
}

impl From<String> for Reply {
    fn from(value: String) -> Self {
        Reply::Bulk(value.into())
    }
}

impl From<Vec<Reply>> for Reply {
    fn from(value: Vec<Reply>) -> Self {
        Reply::Array(value)
    }
}
