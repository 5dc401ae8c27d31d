//! Pairwise reordering of the info cards.
//!
//! Message and info pages end up on the two sides of the same card stock.
//! Printing duplex flips each sheet, so the info side of a pair of cards must
//! list them in the opposite order to line up with their messages.

/// The message side in print order: the cards as given, plus one `None`
/// placeholder when the count is odd so both sides have the same length.
pub fn pad_to_even<T: Clone>(items: &[T]) -> Vec<Option<T>> {
    let mut out: Vec<Option<T>> = items.iter().cloned().map(Some).collect();
    if out.len() % 2 == 1 {
        out.push(None);
    }
    out
}

/// Swap every consecutive pair: `[a, b, c, d, e]` becomes
/// `[b, a, d, c, _, e]`, where `_` (`None`) pads an odd-length input so the
/// last card still lands on the correct side.
pub fn swap_pairs<T: Clone>(items: &[T]) -> Vec<Option<T>> {
    let mut out = Vec::with_capacity(items.len() + items.len() % 2);
    for pair in items.chunks(2) {
        out.push(pair.get(1).cloned());
        out.push(Some(pair[0].clone()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn even_input_swaps_each_pair() {
        assert_eq!(
            swap_pairs(&[1, 2, 3, 4]),
            vec![Some(2), Some(1), Some(4), Some(3)]
        );
    }

    #[test]
    fn odd_input_gets_placeholder_before_last() {
        assert_eq!(swap_pairs(&["a", "b", "c"]), vec![Some("b"), Some("a"), None, Some("c")]);
    }

    #[test]
    fn empty_and_single() {
        assert!(swap_pairs::<u8>(&[]).is_empty());
        assert_eq!(swap_pairs(&[7]), vec![None, Some(7)]);
    }

    #[test]
    fn padding_matches_swapped_length() {
        assert_eq!(pad_to_even(&[1, 2]), vec![Some(1), Some(2)]);
        assert_eq!(pad_to_even(&[1, 2, 3]), vec![Some(1), Some(2), Some(3), None]);
        for n in 0..9usize {
            let input: Vec<usize> = (0..n).collect();
            assert_eq!(pad_to_even(&input).len(), swap_pairs(&input).len());
        }
    }

    #[test]
    fn reorder_law_holds_for_many_lengths() {
        for n in 0..25usize {
            let input: Vec<usize> = (0..n).collect();
            let out = swap_pairs(&input);
            assert_eq!(out.len(), n + n % 2, "n = {n}");
            for k in 0..out.len() / 2 {
                assert_eq!(out[2 * k], input.get(2 * k + 1).copied());
                assert_eq!(out[2 * k + 1], Some(input[2 * k]));
            }
        }
    }
}
