//! Order-preserving partitioning into near-equal groups.

/// Split `items` into exactly `n` contiguous groups whose sizes differ by at
/// most one, earlier groups taking the remainder.
///
/// When `n` exceeds the number of items the trailing groups are empty. An `n`
/// of zero is treated as one.
pub fn chunks_of<T: Clone>(items: &[T], n: usize) -> Vec<Vec<T>> {
    let n = n.max(1);
    let (size, remainder) = (items.len() / n, items.len() % n);

    (0..n)
        .map(|i| {
            let start = i * size + i.min(remainder);
            let end = (i + 1) * size + (i + 1).min(remainder);
            items[start..end].to_vec()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_evenly() {
        let groups = chunks_of(&[1, 2, 3, 4, 5, 6], 3);
        assert_eq!(groups, vec![vec![1, 2], vec![3, 4], vec![5, 6]]);
    }

    #[test]
    fn remainder_goes_to_leading_groups() {
        let groups = chunks_of(&[1, 2, 3, 4, 5, 6, 7], 3);
        assert_eq!(groups, vec![vec![1, 2, 3], vec![4, 5], vec![6, 7]]);
    }

    #[test]
    fn more_groups_than_items() {
        let groups = chunks_of(&["a", "b"], 4);
        assert_eq!(groups.len(), 4);
        assert_eq!(groups[0], vec!["a"]);
        assert_eq!(groups[1], vec!["b"]);
        assert!(groups[2].is_empty() && groups[3].is_empty());
    }

    #[test]
    fn zero_groups_treated_as_one() {
        assert_eq!(chunks_of(&[1, 2], 0), vec![vec![1, 2]]);
    }

    #[test]
    fn sizes_differ_by_at_most_one_and_order_is_preserved() {
        let items: Vec<u32> = (0..103).collect();
        for n in 1..=20 {
            let groups = chunks_of(&items, n);
            assert_eq!(groups.len(), n);

            let sizes: Vec<usize> = groups.iter().map(Vec::len).collect();
            let max = *sizes.iter().max().unwrap();
            let min = *sizes.iter().min().unwrap();
            assert!(max - min <= 1, "n={n}: sizes {sizes:?}");

            let flattened: Vec<u32> = groups.into_iter().flatten().collect();
            assert_eq!(flattened, items);
        }
    }
}
