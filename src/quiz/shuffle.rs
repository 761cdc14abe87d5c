use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeMap;

use crate::quiz::{DisplayOption, Label};

/// Shuffles `options` and binds them to labels `A`, `B`, `C`, ... in the new order.
///
/// A fresh permutation is drawn on every call, so the correct answer isn't
/// always behind the same letter.
pub fn shuffle(options: &BTreeMap<String, String>) -> Vec<DisplayOption> {
    shuffle_with(options, &mut rand::thread_rng())
}

pub fn shuffle_with<R: Rng + ?Sized>(
    options: &BTreeMap<String, String>,
    rng: &mut R,
) -> Vec<DisplayOption> {
    let mut texts: Vec<&String> = options.values().collect();
    texts.shuffle(rng);

    texts
        .into_iter()
        .enumerate()
        // The bank caps options at Label::MAX_OPTIONS, so no option is dropped here
        .filter_map(|(i, text)| {
            Label::from_index(i).map(|label| DisplayOption {
                label,
                text: text.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn options(n: usize) -> BTreeMap<String, String> {
        (0..n)
            .map(|i| (format!("key{i}"), format!("text {i}")))
            .collect()
    }

    #[test]
    fn shuffle_is_a_bijection() {
        let mut rng = StdRng::seed_from_u64(7);
        for n in 1..=8 {
            let input = options(n);
            for _ in 0..25 {
                let shown = shuffle_with(&input, &mut rng);
                assert_eq!(shown.len(), input.len());

                let labels: HashSet<_> = shown.iter().map(|o| o.label).collect();
                assert_eq!(labels.len(), n);

                let texts: HashSet<_> = shown.iter().map(|o| o.text.as_str()).collect();
                let expected: HashSet<_> = input.values().map(String::as_str).collect();
                assert_eq!(texts, expected);
            }
        }
    }

    #[test]
    fn labels_are_assigned_in_display_order() {
        let shown = shuffle(&options(4));
        let labels: String = shown.iter().map(|o| o.label.as_char()).collect();
        assert_eq!(labels, "ABCD");
    }

    #[test]
    fn single_option_is_still_shuffled() {
        let shown = shuffle(&options(1));
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].label.as_char(), 'A');
        assert_eq!(shown[0].text, "text 0");
    }

    #[test]
    fn order_varies_between_calls() {
        let input = options(6);
        let mut rng = StdRng::seed_from_u64(42);
        let orders: HashSet<Vec<String>> = (0..30)
            .map(|_| {
                shuffle_with(&input, &mut rng)
                    .into_iter()
                    .map(|o| o.text)
                    .collect()
            })
            .collect();
        assert!(orders.len() > 1);
    }
}
