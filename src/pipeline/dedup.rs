/// Consecutive-duplicate suppression for decoded values.
///
/// Holds the last value that produced a detection. The empty string means
/// nothing has been seen yet; it never matches a real barcode value.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DedupFilter {
    last_seen: String,
}

impl DedupFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_seen(&self) -> &str {
        &self.last_seen
    }

    /// Returns true and remembers `value` if it differs from the last one.
    pub fn observe(&mut self, value: &str) -> bool {
        if value.is_empty() || value == self.last_seen {
            return false;
        }
        self.last_seen.clear();
        self.last_seen.push_str(value);
        true
    }

    /// Run one frame's values through the filter in decoder order.
    ///
    /// State updates after every accepted value, so a value repeated inside
    /// the same frame fires only once.
    pub fn accept_frame<'a, I>(&mut self, values: I) -> Vec<&'a str>
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        values
            .into_iter()
            .flatten()
            .filter(|value| self.observe(value))
            .collect()
    }
}
