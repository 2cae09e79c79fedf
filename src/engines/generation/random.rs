use rand::Rng;

/// Uniform float in `[min, max)` truncated to two decimals.
pub fn two_digit_float<R: Rng>(rng: &mut R, min: f64, max: f64) -> f64 {
    ((min + rng.gen::<f64>() * (max - min)) * 100.0).floor() / 100.0
}

pub fn round_two_digits(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Weighted pick over integer weights. The draw is taken from `0..=total`, so
/// the first entry gets one extra slot and is chosen on a draw of 0 even with
/// weight 0. Entries after it are never chosen at weight 0.
pub fn weighted_index<R: Rng>(weights: &[u32], rng: &mut R) -> Option<usize> {
    let total: u32 = weights.iter().sum();
    if weights.is_empty() || total == 0 {
        return None;
    }
    let choice = rng.gen_range(0..=total);
    let mut cumulative = 0;
    for (i, w) in weights.iter().enumerate() {
        cumulative += w;
        if choice <= cumulative {
            return Some(i);
        }
    }
    Some(weights.len() - 1)
}

pub fn random_item<'a, T, R: Rng>(items: &'a [T], rng: &mut R) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }
    Some(&items[rng.gen_range(0..items.len())])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_two_digit_float_range() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let v = two_digit_float(&mut rng, 0.5, 2.0);
            assert!((0.5..2.0).contains(&v));
            assert_eq!(v, (v * 100.0).round() / 100.0);
        }
    }

    #[test]
    fn test_weighted_index_draw_is_inclusive() {
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(weighted_index(&[], &mut rng), None);
        assert_eq!(weighted_index(&[0, 0], &mut rng), None);

        let mut hits = [0usize; 3];
        for _ in 0..4000 {
            hits[weighted_index(&[0, 7, 0], &mut rng).unwrap()] += 1;
        }
        // a draw of 0 lands on the leading entry even at weight 0
        assert!(hits[0] > 0);
        assert!(hits[1] > hits[0] * 3);
        assert_eq!(hits[2], 0);
    }

    #[test]
    fn test_weighted_index_favours_first_on_equal_weights() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut hits = [0usize; 2];
        for _ in 0..4000 {
            hits[weighted_index(&[1, 1], &mut rng).unwrap()] += 1;
        }
        // draws 0 and 1 both pick the first entry, 2 picks the second
        assert!(hits[0] > hits[1]);
    }
}
