//! Partitioning a sequence into fixed-size display buckets.

/// Bucket sizes of the homepage sections, top to bottom
pub const HOME_LAYOUT: [usize; 5] = [2, 4, 20, 40, 39];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GroupingError {
	#[error("cannot fill non-empty buckets from an empty sequence")]
	EmptySource,
}

/// Split `vals` into one bucket per entry of `lens`, each exactly that long.
///
/// Items are drawn with a single cursor. When the cursor runs off the end of
/// `vals` it resets to the first element, so the same leading items repeat
/// in later buckets once every item has been used.
///
/// # Errors
///
/// [`GroupingError::EmptySource`] when `vals` is empty and any bucket needs
/// at least one item.
///
/// # Examples
///
/// ```
/// use newsdesk::grouping::group_by_lengths;
///
/// let groups = group_by_lengths(&[1, 2, 3], &[2, 3]).unwrap();
/// assert_eq!(groups, vec![vec![1, 2], vec![3, 1, 2]]);
/// ```
pub fn group_by_lengths<T: Clone>(vals: &[T], lens: &[usize]) -> Result<Vec<Vec<T>>, GroupingError> {
	if vals.is_empty() && lens.iter().any(|&len| len > 0) {
		return Err(GroupingError::EmptySource);
	}

	let mut cursor = 0;
	let mut groups = Vec::with_capacity(lens.len());
	for &len in lens {
		let mut group = Vec::with_capacity(len);
		for _ in 0..len {
			group.push(vals[cursor].clone());
			cursor += 1;
			if cursor == vals.len() {
				cursor = 0;
			}
		}
		groups.push(group);
	}
	Ok(groups)
}
