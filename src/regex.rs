use core::ops::{Index, Range};
use std::fmt;
use std::sync::Arc;

use regex_exec::{Controller, Haystack, MatchError, SearchBounds, Stats, Tier};

use crate::{Error, RegexBuilder};

/// A compiled regular expression.
///
/// Cloning is cheap and clones share their tier: promoting one promotes
/// them all.
///
/// Searches over `&str` run on the text's Unicode scalar values and report
/// byte offsets. ASCII text is searched in place; other text is decoded
/// once per call, or once per [`find_iter`](Self::find_iter). [`search`](Self::search) runs on any [`Haystack`] and
/// reports offsets in that haystack's code units.
#[derive(Clone)]
pub struct Regex {
    pattern: Arc<str>,
    controller: Arc<Controller>,
}

impl Regex {
    /// Compiles a regular expression with the default configuration.
    pub fn new(pattern: &str) -> Result<Regex, Error> {
        RegexBuilder::new(pattern).build()
    }

    pub(crate) fn from_controller(pattern: &str, controller: Controller) -> Regex {
        Regex { pattern: Arc::from(pattern), controller: Arc::new(controller) }
    }

    /// Returns true if and only if there is a match anywhere in `haystack`.
    ///
    /// This never computes where the match starts or what its groups are,
    /// so it is the cheapest search in every tier.
    pub fn is_match(&self, haystack: &str) -> bool {
        let text = Text::new(haystack);
        text.is_match(&self.controller, SearchBounds::full(text.len()))
    }

    /// Returns the leftmost-first match in `haystack`.
    ///
    /// # Example
    ///
    /// ```
    /// use tiered_regex::Regex;
    ///
    /// let re = Regex::new("a+b").unwrap();
    /// let m = re.find("xxaab").unwrap();
    /// assert_eq!(m.range(), 2..5);
    /// assert_eq!(m.as_str(), "aab");
    /// ```
    pub fn find<'h>(&self, haystack: &'h str) -> Option<Match<'h>> {
        self.find_at(haystack, 0)
    }

    /// Like [`find`](Self::find), starting the search at byte offset
    /// `start`. Anchors still see the whole haystack: `^` never matches at
    /// `start > 0`.
    ///
    /// # Panics
    ///
    /// Panics if `start` is not on a character boundary.
    pub fn find_at<'h>(&self, haystack: &'h str, start: usize) -> Option<Match<'h>> {
        let text = Text::new(haystack);
        let (s, e) = text.find(&self.controller, text.bounds_from(start))?;
        Some(Match::new(haystack, text.offset(s), text.offset(e)))
    }

    /// Returns an iterator over successive non-overlapping matches.
    ///
    /// ```
    /// use tiered_regex::Regex;
    ///
    /// let re = Regex::new("[0-9]+").unwrap();
    /// let found: Vec<&str> = re.find_iter("a1b22c333").map(|m| m.as_str()).collect();
    /// assert_eq!(found, vec!["1", "22", "333"]);
    /// ```
    pub fn find_iter<'r, 'h>(&'r self, haystack: &'h str) -> Matches<'r, 'h> {
        Matches { re: self, haystack, text: Text::new(haystack), at: 0, last_end: None }
    }

    /// Returns the groups of the leftmost-first match in `haystack`.
    ///
    /// ```
    /// use tiered_regex::Regex;
    ///
    /// let re = Regex::new("(a)(b)").unwrap();
    /// let caps = re.captures("xaby").unwrap();
    /// assert_eq!(caps.get(0).unwrap().range(), 1..3);
    /// assert_eq!(&caps[1], "a");
    /// assert_eq!(&caps[2], "b");
    /// ```
    pub fn captures<'h>(&self, haystack: &'h str) -> Option<Captures<'h>> {
        self.captures_at(haystack, 0)
    }

    /// Like [`captures`](Self::captures), starting at byte offset `start`.
    pub fn captures_at<'h>(&self, haystack: &'h str, start: usize) -> Option<Captures<'h>> {
        let text = Text::new(haystack);
        let boundaries = text.boundaries(&self.controller, text.bounds_from(start))?;
        let mut slots: Vec<Option<usize>> =
            boundaries.iter().map(|b| b.map(|i| text.offset(i))).collect();
        slots.resize(2 * self.captures_len(), None);
        Some(Captures { haystack, slots: slots.into_boxed_slice() })
    }

    /// Searches all of `haystack`, in whatever code units it is made of.
    ///
    /// The result is computed as lazily as the current tier allows: in the
    /// lazy DFA tier only the match end is known up front, and asking for
    /// the start or a group runs the remaining passes once.
    ///
    /// ```
    /// use tiered_regex::Regex;
    ///
    /// let re = Regex::new("(b+)").unwrap();
    /// let m = re.search(&b"abbc"[..]);
    /// assert_eq!(m.start(1), Some(1));
    /// assert_eq!(m.end(1), Some(3));
    /// ```
    pub fn search<'h, H: Haystack + ?Sized>(&self, haystack: &'h H) -> regex_exec::Match<'h, H> {
        self.search_with(haystack, SearchBounds::full(haystack.len()))
    }

    /// Like [`search`](Self::search), within explicit bounds.
    ///
    /// # Panics
    ///
    /// Panics if `bounds` do not fit `haystack`, or if an interrupt flag is
    /// raised during the search.
    pub fn search_with<'h, H: Haystack + ?Sized>(
        &self,
        haystack: &'h H,
        bounds: SearchBounds,
    ) -> regex_exec::Match<'h, H> {
        self.controller.run(haystack, bounds)
    }

    /// Like [`search_with`](Self::search_with), but reports an interrupted
    /// search as an error instead of panicking.
    pub fn try_search<'h, H: Haystack + ?Sized>(
        &self,
        haystack: &'h H,
        bounds: SearchBounds,
    ) -> Result<regex_exec::Match<'h, H>, MatchError> {
        self.controller.try_run(haystack, bounds)
    }

    /// The pattern this regex was compiled from.
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// The number of groups, including the implicit group 0.
    pub fn captures_len(&self) -> usize {
        self.controller.nfa().group_count()
    }

    /// The tier currently answering searches.
    pub fn tier(&self) -> Tier {
        self.controller.tier()
    }

    /// The current tier and the call profile driving promotion.
    pub fn stats(&self) -> Stats {
        self.controller.stats()
    }

    /// Forgets the call profile gathered so far. The tier is kept.
    pub fn reset_profile(&self) {
        self.controller.reset_profile()
    }
}

impl fmt::Debug for Regex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Regex").field(&self.as_str()).finish()
    }
}

impl fmt::Display for Regex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl core::str::FromStr for Regex {
    type Err = Error;

    fn from_str(s: &str) -> Result<Regex, Error> {
        Regex::new(s)
    }
}

/// A string haystack as the core sees it. ASCII text is its own code
/// units; anything else is decoded into scalar values, with the byte offset
/// of every scalar value and of the end.
#[derive(Debug)]
enum Text<'h> {
    Ascii(&'h [u8]),
    Decoded { chars: Vec<char>, offsets: Vec<usize> },
}

impl<'h> Text<'h> {
    fn new(haystack: &'h str) -> Text<'h> {
        if haystack.is_ascii() {
            return Text::Ascii(haystack.as_bytes());
        }
        let mut chars = Vec::with_capacity(haystack.len());
        let mut offsets = Vec::with_capacity(haystack.len() + 1);
        for (i, c) in haystack.char_indices() {
            chars.push(c);
            offsets.push(i);
        }
        offsets.push(haystack.len());
        Text::Decoded { chars, offsets }
    }

    /// The number of code units.
    fn len(&self) -> usize {
        match self {
            Text::Ascii(bytes) => bytes.len(),
            Text::Decoded { chars, .. } => chars.len(),
        }
    }

    /// The byte offset of code unit `i`.
    fn offset(&self, i: usize) -> usize {
        match self {
            Text::Ascii(_) => i,
            Text::Decoded { offsets, .. } => offsets[i],
        }
    }

    /// Bounds over the whole text, searching from byte offset `start`.
    fn bounds_from(&self, start: usize) -> SearchBounds {
        let from = match self {
            Text::Ascii(bytes) if start <= bytes.len() => start,
            Text::Ascii(_) => panic!("search start {} is past the end", start),
            Text::Decoded { offsets, .. } => match offsets.binary_search(&start) {
                Ok(i) => i,
                Err(_) => panic!("search start {} is not on a character boundary", start),
            },
        };
        SearchBounds::starting_at(self.len(), from)
    }

    fn is_match(&self, controller: &Controller, bounds: SearchBounds) -> bool {
        match self {
            Text::Ascii(bytes) => controller.is_match(*bytes, bounds),
            Text::Decoded { chars, .. } => controller.is_match(&chars[..], bounds),
        }
    }

    /// The code unit range of the leftmost match.
    fn find(&self, controller: &Controller, bounds: SearchBounds) -> Option<(usize, usize)> {
        fn range<H: Haystack + ?Sized>(m: regex_exec::Match<'_, H>) -> Option<(usize, usize)> {
            Some((m.start(0)?, m.end(0)?))
        }
        match self {
            Text::Ascii(bytes) => range(controller.run(*bytes, bounds)),
            Text::Decoded { chars, .. } => range(controller.run(&chars[..], bounds)),
        }
    }

    /// Every group boundary of the leftmost match, in code units.
    fn boundaries(&self, controller: &Controller, bounds: SearchBounds) -> Option<Box<[Option<usize>]>> {
        match self {
            Text::Ascii(bytes) => controller.run(*bytes, bounds).boundaries(),
            Text::Decoded { chars, .. } => controller.run(&chars[..], bounds).boundaries(),
        }
    }
}

/// A single match in a string haystack, in byte offsets.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct Match<'h> {
    haystack: &'h str,
    start: usize,
    end: usize,
}

impl<'h> Match<'h> {
    fn new(haystack: &'h str, start: usize, end: usize) -> Match<'h> {
        Match { haystack, start, end }
    }

    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }

    #[inline]
    pub fn end(&self) -> usize {
        self.end
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    #[inline]
    pub fn as_str(&self) -> &'h str {
        &self.haystack[self.range()]
    }
}

impl<'h> fmt::Debug for Match<'h> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Match")
            .field("start", &self.start)
            .field("end", &self.end)
            .field("string", &self.as_str())
            .finish()
    }
}

impl<'h> From<Match<'h>> for &'h str {
    fn from(m: Match<'h>) -> &'h str {
        m.as_str()
    }
}

/// The groups of one match. Group 0 is the overall match.
#[derive(Clone)]
pub struct Captures<'h> {
    haystack: &'h str,
    slots: Box<[Option<usize>]>,
}

impl<'h> Captures<'h> {
    /// The match of group `i`, or `None` if the group did not participate.
    pub fn get(&self, i: usize) -> Option<Match<'h>> {
        let start = (*self.slots.get(2 * i)?)?;
        let end = (*self.slots.get(2 * i + 1)?)?;
        Some(Match::new(self.haystack, start, end))
    }

    /// The number of groups, participating or not.
    pub fn len(&self) -> usize {
        self.slots.len() / 2
    }

    /// Iterates over every group in order.
    pub fn iter<'c>(&'c self) -> impl Iterator<Item = Option<Match<'h>>> + 'c {
        (0..self.len()).map(move |i| self.get(i))
    }
}

impl<'h> fmt::Debug for Captures<'h> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter().map(|m| m.map(|m| m.range()))).finish()
    }
}

/// The text of group `i`.
///
/// # Panics
///
/// Panics if group `i` did not participate or does not exist.
impl<'h> Index<usize> for Captures<'h> {
    type Output = str;

    fn index(&self, i: usize) -> &str {
        self.get(i)
            .map(|m| m.as_str())
            .unwrap_or_else(|| panic!("no group at index '{}'", i))
    }
}

/// An iterator over non-overlapping matches, created by
/// [`Regex::find_iter`].
///
/// An empty match that ends where the previous match ended is skipped.
#[derive(Debug)]
pub struct Matches<'r, 'h> {
    re: &'r Regex,
    haystack: &'h str,
    text: Text<'h>,
    /// The code unit the next search starts at.
    at: usize,
    last_end: Option<usize>,
}

impl<'r, 'h> Iterator for Matches<'r, 'h> {
    type Item = Match<'h>;

    fn next(&mut self) -> Option<Match<'h>> {
        let len = self.text.len();
        while self.at <= len {
            let bounds = SearchBounds::starting_at(len, self.at);
            let (s, e) = self.text.find(&self.re.controller, bounds)?;
            if s == e {
                self.at = e + 1;
                if self.last_end == Some(e) {
                    continue;
                }
            } else {
                self.at = e;
            }
            self.last_end = Some(e);
            return Some(Match::new(self.haystack, self.text.offset(s), self.text.offset(e)));
        }
        None
    }
}
