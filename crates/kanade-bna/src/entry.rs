//! BNA archive entry.

/// A file stored in a BNA archive, fully loaded in memory.
#[derive(Debug, Clone)]
pub struct BnaEntry {
    /// Directory path within the archive, forward-slash separated, no
    /// trailing slash.
    dir: String,
    /// File name.
    name: String,
    /// File payload.
    data: Vec<u8>,
}

impl BnaEntry {
    /// Create an entry from its parts.
    pub fn new(dir: impl Into<String>, name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            dir: dir.into(),
            name: name.into(),
            data,
        }
    }

    /// Directory path within the archive.
    #[inline]
    pub fn dir(&self) -> &str {
        &self.dir
    }

    /// File name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File payload.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Payload size in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Full `dir/name` path, the addressing key for lookups.
    pub fn full_path(&self) -> String {
        format!("{}/{}", self.dir, self.name)
    }

    /// File extension without the dot, if any.
    pub fn extension(&self) -> Option<&str> {
        self.name.rsplit_once('.').map(|(_, ext)| ext)
    }

    pub(crate) fn set_data(&mut self, data: Vec<u8>) {
        self.data = data;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_path() {
        let entry = BnaEntry::new("scene/01", "intro.bxr", vec![]);
        assert_eq!(entry.full_path(), "scene/01/intro.bxr");
        assert_eq!(entry.extension(), Some("bxr"));
    }

    #[test]
    fn test_no_extension() {
        let entry = BnaEntry::new("data", "README", vec![]);
        assert_eq!(entry.extension(), None);
    }
}
