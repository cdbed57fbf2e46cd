//! Duplicate-interrupt suppression.
//!
//! The runtime may observe the same logical interrupt more than once: a
//! drive loop that re-enters a suspended node re-raises its prompt, and a
//! resumed node that re-calls the model can produce a near-identical prompt.
//! The push channel must deliver each logical interrupt exactly once, so
//! every candidate passes through this filter under the session's interrupt
//! lock.
//!
//! A candidate is rejected when any of these holds:
//! - the session is already waiting for input;
//! - the last acceptance was less than the cooldown ago (default 500 ms);
//! - its similarity to the previously accepted prompt is >= 0.80
//!   (longest-common-subsequence ratio over normalized text);
//! - any of its normalization variants (or their hashes) was recently
//!   accepted.
//!
//! Three variants are tracked per accepted prompt: whitespace-collapsed
//! lowercase, the same without punctuation, and the sorted set of unique
//! alphabetic tokens. The recent-set is bounded (~50 entries) and trimmed to
//! half capacity on overflow - strict equality alone is not enough, because
//! upstream retries produce near-identical repeats.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};

/// Why a candidate interrupt was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// An accepted interrupt is already awaiting its reply.
    AlreadyWaiting,
    /// Too soon after the last accepted interrupt.
    Cooldown,
    /// Too similar to the previously accepted prompt.
    TooSimilar,
    /// A normalization variant was recently accepted.
    RecentDuplicate,
}

const RECENT_CAPACITY: usize = 50;
const SIMILARITY_THRESHOLD: f64 = 0.80;

/// Per-session duplicate-interrupt filter.
#[derive(Debug)]
pub struct InterruptFilter {
    waiting_for_input: bool,
    cooldown: Duration,
    last_accept_at: Option<Instant>,
    last_content: Option<String>,
    recent_contents: HashSet<String>,
    recent_hashes: HashSet<u64>,
    recent_order: Vec<String>,
}

impl Default for InterruptFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl InterruptFilter {
    /// Filter with the default 500 ms cooldown.
    pub fn new() -> Self {
        Self::with_cooldown(Duration::from_millis(500))
    }

    /// Filter with a custom cooldown.
    pub fn with_cooldown(cooldown: Duration) -> Self {
        Self {
            waiting_for_input: false,
            cooldown,
            last_accept_at: None,
            last_content: None,
            recent_contents: HashSet::new(),
            recent_hashes: HashSet::new(),
            recent_order: Vec::new(),
        }
    }

    /// Whether an accepted interrupt is awaiting its reply.
    pub fn is_waiting(&self) -> bool {
        self.waiting_for_input
    }

    /// Mark the pending interrupt as answered (a user reply was consumed).
    pub fn mark_answered(&mut self) {
        self.waiting_for_input = false;
    }

    /// Mark the session as waiting without emitting anything. Used when a
    /// session reattaches to a thread whose interrupt was already delivered.
    pub fn set_waiting(&mut self) {
        self.waiting_for_input = true;
    }

    /// Forget all tracked content (new conversation).
    pub fn reset(&mut self) {
        self.waiting_for_input = false;
        self.last_accept_at = None;
        self.last_content = None;
        self.recent_contents.clear();
        self.recent_hashes.clear();
        self.recent_order.clear();
    }

    /// Decide whether to deliver a candidate interrupt. On acceptance the
    /// filter records its variants and flips into the waiting state.
    pub fn try_accept(&mut self, content: &str) -> Result<(), RejectReason> {
        if self.waiting_for_input {
            return Err(RejectReason::AlreadyWaiting);
        }

        if let Some(last) = self.last_accept_at {
            if last.elapsed() < self.cooldown {
                return Err(RejectReason::Cooldown);
            }
        }

        let collapsed = normalize_collapsed(content);

        if let Some(previous) = &self.last_content {
            if lcs_ratio(previous, &collapsed) >= SIMILARITY_THRESHOLD {
                return Err(RejectReason::TooSimilar);
            }
        }

        let variants = [
            collapsed.clone(),
            normalize_no_punct(&collapsed),
            normalize_token_signature(&collapsed),
        ];
        for variant in &variants {
            if self.recent_contents.contains(variant) || self.recent_hashes.contains(&hash_of(variant)) {
                return Err(RejectReason::RecentDuplicate);
            }
        }

        for variant in variants {
            self.remember(variant);
        }
        self.last_content = Some(collapsed);
        self.last_accept_at = Some(Instant::now());
        self.waiting_for_input = true;
        Ok(())
    }

    fn remember(&mut self, variant: String) {
        if self.recent_order.len() >= RECENT_CAPACITY {
            // Trim to half capacity, dropping the oldest entries.
            let keep_from = self.recent_order.len() - RECENT_CAPACITY / 2;
            for old in self.recent_order.drain(..keep_from) {
                self.recent_hashes.remove(&hash_of(&old));
                self.recent_contents.remove(&old);
            }
        }
        self.recent_hashes.insert(hash_of(&variant));
        self.recent_contents.insert(variant.clone());
        self.recent_order.push(variant);
    }
}

fn hash_of(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

/// Collapse whitespace and lowercase.
pub fn normalize_collapsed(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Collapsed variant with punctuation removed.
pub fn normalize_no_punct(collapsed: &str) -> String {
    collapsed
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Sorted unique alphabetic tokens of the collapsed variant.
pub fn normalize_token_signature(collapsed: &str) -> String {
    let mut tokens: Vec<String> = collapsed
        .split_whitespace()
        .map(|token| token.chars().filter(|c| c.is_alphabetic()).collect::<String>())
        .filter(|token| !token.is_empty())
        .collect();
    tokens.sort();
    tokens.dedup();
    tokens.join(" ")
}

/// Longest-common-subsequence ratio between two strings, in [0, 1].
///
/// Inputs are capped at 400 chars to bound the DP table; prompts longer
/// than that are compared by their prefix, which is plenty for telling
/// retries apart.
pub fn lcs_ratio(a: &str, b: &str) -> f64 {
    const CAP: usize = 400;
    let a: Vec<char> = a.chars().take(CAP).collect();
    let b: Vec<char> = b.chars().take(CAP).collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let mut prev = vec![0usize; b.len() + 1];
    let mut row = vec![0usize; b.len() + 1];
    for &ca in &a {
        for (j, &cb) in b.iter().enumerate() {
            row[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(row[j])
            };
        }
        std::mem::swap(&mut prev, &mut row);
    }

    prev[b.len()] as f64 / a.len().max(b.len()) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_have_ratio_one() {
        assert_eq!(lcs_ratio("hello world", "hello world"), 1.0);
    }

    #[test]
    fn disjoint_strings_have_low_ratio() {
        assert!(lcs_ratio("abcdef", "uvwxyz") < 0.2);
    }

    #[test]
    fn near_identical_prompts_are_similar() {
        let a = "Hey! I'm Kotori. What's your english level?";
        let b = "Hey! I'm Kotori. What's your english level today?";
        assert!(lcs_ratio(&normalize_collapsed(a), &normalize_collapsed(b)) >= 0.80);
    }

    #[test]
    fn normalization_variants_differ_as_expected() {
        let collapsed = normalize_collapsed("  Hello,   WORLD! ");
        assert_eq!(collapsed, "hello, world!");
        assert_eq!(normalize_no_punct(&collapsed), "hello world");
        assert_eq!(normalize_token_signature(&collapsed), "hello world");
        // Token signature sorts and dedups.
        assert_eq!(
            normalize_token_signature("world hello world"),
            "hello world"
        );
    }

    #[test]
    fn accepts_then_blocks_while_waiting() {
        let mut filter = InterruptFilter::with_cooldown(Duration::ZERO);
        assert!(filter.try_accept("What's your level?").is_ok());
        assert!(filter.is_waiting());
        assert_eq!(
            filter.try_accept("Totally different prompt"),
            Err(RejectReason::AlreadyWaiting)
        );
    }

    #[test]
    fn cooldown_rejects_even_distinct_content() {
        let mut filter = InterruptFilter::with_cooldown(Duration::from_secs(60));
        assert!(filter.try_accept("first prompt").is_ok());
        filter.mark_answered();
        assert_eq!(
            filter.try_accept("entirely unrelated question"),
            Err(RejectReason::Cooldown)
        );
    }

    #[test]
    fn similar_prompt_is_dropped_after_reply() {
        let mut filter = InterruptFilter::with_cooldown(Duration::ZERO);
        assert!(filter.try_accept("Which mode would you like today?").is_ok());
        filter.mark_answered();
        assert_eq!(
            filter.try_accept("Which mode would you like today??"),
            Err(RejectReason::TooSimilar)
        );
    }

    #[test]
    fn exact_repeat_is_dropped_via_recent_set() {
        let mut filter = InterruptFilter::with_cooldown(Duration::ZERO);
        assert!(filter.try_accept("prompt alpha").is_ok());
        filter.mark_answered();
        // Push an unrelated accept in between so the similarity check on
        // last_content does not fire first.
        assert!(filter
            .try_accept("completely different second question about trains and verbs")
            .is_ok());
        filter.mark_answered();
        assert_eq!(
            filter.try_accept("prompt alpha"),
            Err(RejectReason::RecentDuplicate)
        );
    }

    #[test]
    fn distinct_prompts_flow_through() {
        let mut filter = InterruptFilter::with_cooldown(Duration::ZERO);
        let prompts = [
            "Hey! I'm Kotori. What's your level?",
            "Which mode would you like - study or chat?",
            "Let's talk about your weekend plans then!",
        ];
        for prompt in prompts {
            assert!(filter.try_accept(prompt).is_ok(), "rejected: {prompt}");
            filter.mark_answered();
        }
    }

    #[test]
    fn recent_set_trims_to_half_capacity() {
        let mut filter = InterruptFilter::with_cooldown(Duration::ZERO);
        for i in 0..40 {
            // Wildly different prompts so similarity never triggers.
            let prompt = format!(
                "prompt number {i} about {}",
                ["cats", "verbs", "trains", "rivers", "books"][i % 5].repeat(i % 3 + 1)
            );
            let _ = filter.try_accept(&prompt);
            filter.mark_answered();
        }
        // 3 variants per accept; the order list stays bounded.
        assert!(filter.recent_order.len() <= RECENT_CAPACITY + 3);
    }

    #[test]
    fn reset_forgets_history() {
        let mut filter = InterruptFilter::with_cooldown(Duration::ZERO);
        assert!(filter.try_accept("prompt alpha").is_ok());
        filter.reset();
        assert!(!filter.is_waiting());
        assert!(filter.try_accept("prompt alpha").is_ok());
    }
}

#[cfg(test)]
mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn lcs_ratio_is_bounded(a in ".{0,120}", b in ".{0,120}") {
            let ratio = lcs_ratio(&a, &b);
            prop_assert!((0.0..=1.0).contains(&ratio));
        }

        #[test]
        fn lcs_ratio_is_symmetric(a in ".{0,80}", b in ".{0,80}") {
            prop_assert!((lcs_ratio(&a, &b) - lcs_ratio(&b, &a)).abs() < 1e-9);
        }

        #[test]
        fn self_similarity_is_one(a in ".{1,120}") {
            prop_assert!((lcs_ratio(&a, &a) - 1.0).abs() < 1e-9);
        }

        #[test]
        fn normalization_is_idempotent(text in ".{0,200}") {
            let collapsed = normalize_collapsed(&text);
            prop_assert_eq!(normalize_collapsed(&collapsed), collapsed.clone());
            let no_punct = normalize_no_punct(&collapsed);
            prop_assert_eq!(normalize_no_punct(&no_punct), no_punct.clone());
            let signature = normalize_token_signature(&collapsed);
            prop_assert_eq!(normalize_token_signature(&signature), signature.clone());
        }
    }
}
