use std::{cmp::Ordering, mem};

use crate::{Result, settings};

/// Stable merge sort with a fallible comparator.
///
/// Runs at or below the insertion threshold are insertion sorted; larger
/// runs are merged with exponential searches so long ordered stretches
/// cost logarithmic comparisons. On error the slice contents are
/// unspecified, callers sort a copy.
pub fn merge_sort<T, F>(values: &mut [T], mut compare: F) -> Result<()>
where
    T: Clone,
    F: FnMut(&T, &T) -> Result<Ordering>,
{
    if values.len() < 2 {
        return Ok(());
    }
    let threshold = settings::get().sort_insertion_threshold;
    let mut scratch = values.to_vec();
    sort_range(values, &mut scratch, &mut compare, threshold)
}

fn sort_range<T, F>(data: &mut [T], scratch: &mut [T], compare: &mut F, threshold: usize) -> Result<()>
where
    F: FnMut(&T, &T) -> Result<Ordering>,
{
    let len = data.len();
    if len <= threshold {
        return insertion_sort(data, compare);
    }
    let mid = len / 2;
    {
        let (left, right) = data.split_at_mut(mid);
        let (left_scratch, right_scratch) = scratch.split_at_mut(mid);
        sort_range(left, left_scratch, compare, threshold)?;
        sort_range(right, right_scratch, compare, threshold)?;
    }
    // already in order
    if compare(&data[mid - 1], &data[mid])? != Ordering::Greater {
        return Ok(());
    }
    merge(data, mid, scratch, compare)
}

fn insertion_sort<T, F>(data: &mut [T], compare: &mut F) -> Result<()>
where
    F: FnMut(&T, &T) -> Result<Ordering>,
{
    for i in 1..data.len() {
        let mut j = i;
        while j > 0 && compare(&data[j - 1], &data[j])? == Ordering::Greater {
            data.swap(j - 1, j);
            j -= 1;
        }
    }
    Ok(())
}

/// Length of the prefix of `slice` satisfying `pred`, which must hold
/// for a prefix and fail for the rest.
fn gallop<T>(slice: &[T], mut pred: impl FnMut(&T) -> Result<bool>) -> Result<usize> {
    let len = slice.len();
    let mut bound = 1;
    while bound <= len && pred(&slice[bound - 1])? {
        bound *= 2;
    }
    let mut lo = bound / 2;
    let mut hi = (bound - 1).min(len);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if pred(&slice[mid])? {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    Ok(lo)
}

// Merge the sorted runs data[..mid] and data[mid..]. The left run is
// moved into scratch, output is written from the front of data.
fn merge<T, F>(data: &mut [T], mid: usize, scratch: &mut [T], compare: &mut F) -> Result<()>
where
    F: FnMut(&T, &T) -> Result<Ordering>,
{
    let len = data.len();
    scratch[..mid].swap_with_slice(&mut data[..mid]);

    let (mut i, mut j, mut k) = (0, mid, 0);
    while i < mid && j < len {
        // left items not greater than the next right item keep their place
        let take = {
            let right = &data[j];
            gallop(&scratch[i..mid], |left| Ok(compare(left, right)? != Ordering::Greater))?
        };
        for _ in 0..take {
            mem::swap(&mut data[k], &mut scratch[i]);
            i += 1;
            k += 1;
        }
        if i == mid {
            break;
        }

        let take = {
            let left = &scratch[i];
            gallop(&data[j..len], |right| Ok(compare(right, left)? == Ordering::Less))?
        };
        for _ in 0..take {
            data.swap(k, j);
            j += 1;
            k += 1;
        }
    }
    while i < mid {
        mem::swap(&mut data[k], &mut scratch[i]);
        i += 1;
        k += 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RexxError;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    fn sort_ints(values: &mut [i64]) {
        merge_sort(values, |a, b| Ok(a.cmp(b))).unwrap();
    }

    #[test]
    fn sorts_random_inputs_of_many_sizes() {
        let mut rng = StdRng::seed_from_u64(7);
        for len in [0, 1, 2, 9, 10, 11, 31, 100, 1_000] {
            let mut values: Vec<i64> = (0..len).map(|_| rng.gen_range(-50..50)).collect();
            let mut expected = values.clone();
            expected.sort();
            sort_ints(&mut values);
            assert_eq!(values, expected, "length {len}");
        }
    }

    #[test]
    fn presorted_and_reversed() {
        let mut values: Vec<i64> = (0..500).collect();
        sort_ints(&mut values);
        assert!(values.windows(2).all(|w| w[0] <= w[1]));

        let mut values: Vec<i64> = (0..500).rev().collect();
        sort_ints(&mut values);
        assert_eq!(values, (0..500).collect::<Vec<_>>());
    }

    #[test]
    fn equal_keys_keep_their_order() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut pairs: Vec<(u8, usize)> = (0..2_000).map(|seq| (rng.gen_range(0..8u8), seq)).collect();
        merge_sort(&mut pairs, |a, b| Ok(a.0.cmp(&b.0))).unwrap();
        for w in pairs.windows(2) {
            assert!(w[0].0 < w[1].0 || (w[0].0 == w[1].0 && w[0].1 < w[1].1));
        }
    }

    #[test]
    fn presorted_input_needs_few_comparisons() {
        let mut values: Vec<i64> = (0..4_096).collect();
        let mut comparisons = 0usize;
        merge_sort(&mut values, |a, b| {
            comparisons += 1;
            Ok(a.cmp(b))
        })
        .unwrap();
        assert!(comparisons < 2 * values.len(), "{comparisons} comparisons");
    }

    #[test]
    fn comparator_errors_propagate() {
        let mut values: Vec<i64> = (0..100).rev().collect();
        let mut calls = 0;
        let err = merge_sort(&mut values, |a, b| {
            calls += 1;
            if calls == 40 {
                return Err(RexxError::raised("SYNTAX", "comparison failed"));
            }
            Ok(a.cmp(b))
        })
        .unwrap_err();
        assert_eq!(err.name(), "raised");
        assert_eq!(calls, 40);
    }
}
