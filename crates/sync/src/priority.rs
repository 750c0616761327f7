//! Deterministic sort weights for menu entries.
//!
//! The store the menu is built from has no ordering field, so entries are weighted from
//! their display name alone. The head unit renders higher weights first, which with this
//! scheme means alphabetical order by the first two letters.

/// Weight assigned before subtracting the name bucket.
pub const BASE_WEIGHT: i32 = 800;

const BUCKETS_PER_LETTER: i64 = 6;
const MAX_PRIMARY: i64 = 25;

/// Returns the combined bucket for `display_name`, lowest for names starting with "a".
///
/// The primary bucket is the first letter's offset from `a`, clamped to 25. The secondary
/// bucket is the second letter's code point divided by six, rounded half up. Only
/// alphabetic characters count, after lowercasing.
///
/// Returns `None` when the name has fewer than two letters.
pub fn sort_bucket(display_name: &str) -> Option<i32> {
	let mut letters = display_name.chars().flat_map(char::to_lowercase).filter(|c| c.is_alphabetic());
	let first = letters.next()?;
	let second = letters.next()?;

	let primary = (i64::from(u32::from(first)) - i64::from(u32::from('a'))).min(MAX_PRIMARY);
	let secondary = (i64::from(u32::from(second)) + BUCKETS_PER_LETTER / 2) / BUCKETS_PER_LETTER;
	let combined = primary * BUCKETS_PER_LETTER + secondary;
	i32::try_from(combined).ok()
}

/// Returns the sort weight for `display_name`, or `None` if it has fewer than two letters.
pub fn try_priority(display_name: &str) -> Option<i32> {
	sort_bucket(display_name).map(|bucket| BASE_WEIGHT - bucket)
}

/// Returns the sort weight for `display_name`.
///
/// # Panics
///
/// Panics if the name has fewer than two letters. Callers validate names up front (see
/// [`crate::EntryDescriptor::new`]).
pub fn priority(display_name: &str) -> i32 {
	match try_priority(display_name) {
		Some(weight) => weight,
		None => panic!("display name {display_name:?} needs at least two letters"),
	}
}
