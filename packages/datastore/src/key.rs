use std::fmt;

/// A hierarchical datastore key such as `/safemode/audit/2024-01-01T00:00:00Z`.
///
/// Keys are always rooted and cleaned on construction: empty and `.` segments
/// are dropped and `..` removes the preceding segment, so a key never climbs
/// above the root.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(String);

impl Key {
    /// The root key `/`.
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Build a cleaned key from any slash-separated string.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let mut segments: Vec<&str> = Vec::new();
        for segment in raw.as_ref().split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                s => segments.push(s),
            }
        }
        Self::from_segments(&segments)
    }

    fn from_segments(segments: &[&str]) -> Self {
        if segments.is_empty() {
            return Self::root();
        }
        let mut out = String::new();
        for segment in segments {
            out.push('/');
            out.push_str(segment);
        }
        Self(out)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Iterate over the non-empty path segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Append a (possibly multi-segment) name below this key.
    pub fn child(&self, name: impl AsRef<str>) -> Self {
        Self::new(format!("{}/{}", self.0, name.as_ref()))
    }

    /// Append another key below this one.
    pub fn join(&self, other: &Key) -> Self {
        self.child(other.as_str())
    }

    /// The last segment, or `""` for the root.
    pub fn name(&self) -> &str {
        self.segments().last().unwrap_or("")
    }

    /// The key one level up. The root is its own parent.
    pub fn parent(&self) -> Self {
        let segments: Vec<&str> = self.segments().collect();
        match segments.split_last() {
            Some((_, rest)) => Self::from_segments(rest),
            None => Self::root(),
        }
    }

    /// True when `self` sits strictly below `ancestor`.
    pub fn is_descendant_of(&self, ancestor: &Key) -> bool {
        if ancestor.is_root() {
            return !self.is_root();
        }
        self.0.len() > ancestor.0.len()
            && self.0.starts_with(&ancestor.0)
            && self.0.as_bytes()[ancestor.0.len()] == b'/'
    }

    /// Re-root `self` relative to `prefix`, if it lies below it.
    pub fn strip_prefix(&self, prefix: &Key) -> Option<Key> {
        if prefix.is_root() {
            return Some(self.clone());
        }
        if self == prefix {
            return Some(Self::root());
        }
        if self.is_descendant_of(prefix) {
            Some(Self::new(&self.0[prefix.0.len()..]))
        } else {
            None
        }
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self.0)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Key {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}
