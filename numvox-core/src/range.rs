use anyhow::{bail, Result};
use std::fmt;
use std::ops::RangeInclusive;

/// Smallest number the generator will render.
pub const MIN_NUMBER: u32 = 1;

/// Largest number the generator will render.
pub const MAX_NUMBER: u32 = 8000;

/// Inclusive range of numbers to synthesize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberRange {
    start: u32,
    end: u32,
}

impl NumberRange {
    pub fn new(start: u32, end: u32) -> Result<Self> {
        if start < MIN_NUMBER || end > MAX_NUMBER {
            bail!("range {start}..={end} is outside the supported {MIN_NUMBER}..={MAX_NUMBER}");
        }
        if start > end {
            bail!("range start {start} is greater than end {end}");
        }
        Ok(Self { start, end })
    }

    /// The full supported range.
    pub fn full() -> Self {
        Self {
            start: MIN_NUMBER,
            end: MAX_NUMBER,
        }
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    pub fn len(&self) -> usize {
        (self.end - self.start + 1) as usize
    }

    /// Never true; a range always holds at least one number.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, index: u32) -> bool {
        self.iter().contains(&index)
    }

    pub fn iter(&self) -> RangeInclusive<u32> {
        self.start..=self.end
    }
}

impl fmt::Display for NumberRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

impl IntoIterator for NumberRange {
    type Item = u32;
    type IntoIter = RangeInclusive<u32>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_range() {
        let range = NumberRange::full();
        assert_eq!(range.len(), 8000);
        assert_eq!(range.iter().next(), Some(1));
        assert_eq!(range.iter().last(), Some(8000));
    }

    #[test]
    fn test_single_number() {
        let range = NumberRange::new(42, 42).unwrap();
        assert_eq!(range.len(), 1);
        assert!(range.contains(42));
        assert!(!range.contains(43));
    }

    #[test]
    fn test_rejects_zero() {
        let err = NumberRange::new(0, 10).unwrap_err();
        assert!(err.to_string().contains("outside the supported"));
    }

    #[test]
    fn test_rejects_past_max() {
        assert!(NumberRange::new(1, MAX_NUMBER + 1).is_err());
    }

    #[test]
    fn test_rejects_inverted() {
        let err = NumberRange::new(10, 5).unwrap_err();
        assert!(err.to_string().contains("greater than end"));
    }
}
