/// An incremental update of streaming assistant output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamFragment {
    /// Text added by this fragment.
    pub delta: String,

    /// All text seen so far in this stream, including `delta`.
    pub accumulated: String,

    /// True on the fragment that closes the stream.
    pub done: bool,
}

impl StreamFragment {
    /// Create a fragment that extends `accumulated` by `delta`.
    pub fn new(delta: impl Into<String>, accumulated: impl Into<String>) -> Self {
        Self {
            delta: delta.into(),
            accumulated: accumulated.into(),
            done: false,
        }
    }

    /// Mark this fragment as the end of the stream.
    pub fn finished(mut self) -> Self {
        self.done = true;
        self
    }
}
