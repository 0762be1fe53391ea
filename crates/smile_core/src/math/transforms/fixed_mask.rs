//! Immutable set of pinned parameter indices.

use std::collections::BTreeSet;

/// Indices of model parameters held at their initial value.
///
/// A mask is never mutated after construction. Callers that need an extra
/// pinned index derive a new mask with [`with_fixed`](Self::with_fixed).
///
/// # Example
///
/// ```
/// use smile_core::math::transforms::FixedMask;
///
/// let beta_fixed = FixedMask::from_indices([1]);
/// let with_alpha = beta_fixed.with_fixed(0);
///
/// assert!(!beta_fixed.contains(0));
/// assert_eq!(with_alpha.iter().collect::<Vec<_>>(), vec![0, 1]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FixedMask {
    indices: BTreeSet<usize>,
}

impl FixedMask {
    /// A mask with nothing fixed.
    pub fn none() -> Self {
        Self::default()
    }

    /// A mask fixing the given indices. Duplicates collapse.
    pub fn from_indices<I: IntoIterator<Item = usize>>(indices: I) -> Self {
        Self {
            indices: indices.into_iter().collect(),
        }
    }

    /// A mask from a boolean flag per parameter.
    pub fn from_flags(flags: &[bool]) -> Self {
        Self::from_indices(
            flags
                .iter()
                .enumerate()
                .filter_map(|(i, &fixed)| fixed.then_some(i)),
        )
    }

    /// A new mask additionally fixing `index`.
    #[must_use]
    pub fn with_fixed(&self, index: usize) -> Self {
        let mut indices = self.indices.clone();
        indices.insert(index);
        Self { indices }
    }

    /// Whether `index` is fixed.
    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        self.indices.contains(&index)
    }

    /// Number of fixed indices.
    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// `true` when nothing is fixed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Fixed indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.iter().copied()
    }

    /// Largest fixed index, if any.
    pub fn max_index(&self) -> Option<usize> {
        self.indices.iter().next_back().copied()
    }
}
