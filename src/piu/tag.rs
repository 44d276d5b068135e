//! Correlation tags (CIDs) for matching responses to requests.

/// Used for generating unique-ish command IDs.
///
/// The codec never assigns a `cid` itself; this is a helper for callers
/// that build request frames and need to match responses to them.
#[derive(Debug)]
pub struct TagGenerator(u16);

impl Default for TagGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TagGenerator {
    /// Initialize the tag generator.
    pub fn new() -> TagGenerator {
        Self::starting_at(0)
    }

    pub fn starting_at(first: u16) -> TagGenerator {
        Self(first)
    }

    /// Returns a u16 that's different from the previously returned value,
    /// wrapping after `u16::MAX`.
    pub fn tag(&mut self) -> u16 {
        let output = self.0;
        self.0 = self.0.wrapping_add(1);
        output
    }
}

#[cfg(test)]
mod tests {
    use super::TagGenerator;

    #[test]
    fn tags_advance_and_wrap() {
        let mut tags = TagGenerator::starting_at(u16::MAX - 1);
        assert_eq!(tags.tag(), u16::MAX - 1);
        assert_eq!(tags.tag(), u16::MAX);
        assert_eq!(tags.tag(), 0);
    }
}
