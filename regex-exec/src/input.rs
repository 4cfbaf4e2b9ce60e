//! Read access to the text being searched.
//!
//! The engine never decodes text itself. It reads one code unit at a time
//! through [`Haystack`] and leans on the two scanning primitives for the
//! fast paths (self-loop fast-forwarding and inner-literal jumps).

/// The largest code unit any haystack may report.
pub const MAX_CODE_UNIT: u32 = 0x10FFFF;

/// A random-access sequence of code units.
pub trait Haystack {
    /// The number of code units.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The code unit at `index`. Callers guarantee `index < len()`.
    fn code_unit(&self, index: usize) -> u32;

    /// Returns the first index in `from..to` whose code unit is in `set`.
    fn index_of_any(&self, from: usize, to: usize, set: &[u32]) -> Option<usize> {
        (from..to).find(|&i| set.contains(&self.code_unit(i)))
    }

    /// Returns the first index `i` in `from..to` such that `literal` occurs
    /// at `i` and ends at or before `to`.
    fn index_of_literal(&self, from: usize, to: usize, literal: &[u32]) -> Option<usize> {
        if literal.is_empty() {
            return if from <= to { Some(from) } else { None };
        }
        if to < from || to - from < literal.len() {
            return None;
        }
        (from..=to - literal.len()).find(|&i| {
            literal
                .iter()
                .enumerate()
                .all(|(k, &c)| self.code_unit(i + k) == c)
        })
    }
}

impl Haystack for [u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn code_unit(&self, index: usize) -> u32 {
        u32::from(self[index])
    }

    #[cfg(feature = "perf-literal")]
    fn index_of_any(&self, from: usize, to: usize, set: &[u32]) -> Option<usize> {
        let mut needles = [0u8; 3];
        let mut count = 0;
        for &c in set {
            // Code units above 0xFF can never occur in a byte haystack.
            if let Ok(b) = u8::try_from(c) {
                if count == needles.len() {
                    count += 1;
                    break;
                }
                needles[count] = b;
                count += 1;
            }
        }
        let hay = &self[from..to];
        let found = match count {
            0 => None,
            1 => memchr::memchr(needles[0], hay),
            2 => memchr::memchr2(needles[0], needles[1], hay),
            3 => memchr::memchr3(needles[0], needles[1], needles[2], hay),
            _ => hay.iter().position(|&b| set.contains(&u32::from(b))),
        };
        found.map(|i| from + i)
    }

    #[cfg(feature = "perf-literal")]
    fn index_of_literal(&self, from: usize, to: usize, literal: &[u32]) -> Option<usize> {
        let needle: Option<Vec<u8>> = literal.iter().map(|&c| u8::try_from(c).ok()).collect();
        let needle = needle?;
        if to < from {
            return None;
        }
        memchr::memmem::find(&self[from..to], &needle).map(|i| from + i)
    }
}

impl Haystack for [u16] {
    fn len(&self) -> usize {
        <[u16]>::len(self)
    }

    fn code_unit(&self, index: usize) -> u32 {
        u32::from(self[index])
    }
}

impl Haystack for [char] {
    fn len(&self) -> usize {
        <[char]>::len(self)
    }

    fn code_unit(&self, index: usize) -> u32 {
        u32::from(self[index])
    }
}

/// The offsets governing one search.
///
/// A search looks for the leftmost match starting at or after `from` whose
/// end does not exceed `to`. The region is the logical extent of the text:
/// `^` holds only at `region_from` and `$` only at `region_to`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchBounds {
    pub from: usize,
    pub to: usize,
    pub region_from: usize,
    pub region_to: usize,
}

impl SearchBounds {
    /// Bounds covering an entire haystack of length `len`.
    pub fn full(len: usize) -> SearchBounds {
        SearchBounds { from: 0, to: len, region_from: 0, region_to: len }
    }

    /// Bounds covering a haystack of length `len`, starting the search at
    /// `from`.
    pub fn starting_at(len: usize, from: usize) -> SearchBounds {
        SearchBounds { from, ..SearchBounds::full(len) }
    }

    /// Panics unless `region_from <= from <= to <= region_to <= len`.
    ///
    /// Inconsistent bounds are a caller bug, never a failed match.
    pub fn assert_valid(&self, len: usize) {
        assert!(
            self.region_from <= self.from
                && self.from <= self.to
                && self.to <= self.region_to
                && self.region_to <= len,
            "invalid search bounds {:?} for haystack of length {}",
            self,
            len,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_of_any_bytes() {
        let hay: &[u8] = b"aaaabxc";
        assert_eq!(hay.index_of_any(0, 7, &[u32::from(b'x')]), Some(5));
        assert_eq!(hay.index_of_any(0, 7, &[u32::from(b'c'), u32::from(b'b')]), Some(4));
        assert_eq!(hay.index_of_any(0, 4, &[u32::from(b'b')]), None);
        assert_eq!(hay.index_of_any(0, 7, &[0x1F600]), None);
        let many = [u32::from(b'q'), u32::from(b'r'), u32::from(b's'), u32::from(b'c')];
        assert_eq!(hay.index_of_any(0, 7, &many), Some(6));
    }

    #[test]
    fn index_of_literal_respects_bounds() {
        let hay: &[u8] = b"xxfooyyfoo";
        let foo: Vec<u32> = "foo".chars().map(u32::from).collect();
        assert_eq!(hay.index_of_literal(0, 10, &foo), Some(2));
        assert_eq!(hay.index_of_literal(3, 10, &foo), Some(7));
        assert_eq!(hay.index_of_literal(3, 9, &foo), None);
        let chars: Vec<char> = "xxfooyy".chars().collect();
        assert_eq!(chars[..].index_of_literal(0, 7, &foo), Some(2));
        assert_eq!(chars[..].index_of_literal(0, 4, &foo), None);
    }

    #[test]
    #[should_panic]
    fn inverted_bounds_panic() {
        SearchBounds { from: 3, to: 2, region_from: 0, region_to: 4 }.assert_valid(4);
    }
}
