//! Temporal emotion smoothing.
//!
//! Raw classifier outputs are jittery frame to frame; an exponential moving
//! average with a fixed alpha keeps the reported vector steady. The very
//! first observation seeds the smoothed vector directly from the raw scores;
//! blending against an undefined (or zeroed) prior would drag every label
//! toward zero for the first several frames.

use std::collections::BTreeMap;

/// EMA weight of the newest raw observation.
pub const EMA_ALPHA: f64 = 0.2;

/// Fold one raw observation into the smoothed vector.
///
/// `smoothed` is `None` until the first successful classification; in that
/// case it is seeded with the raw scores as-is. Labels are smoothed
/// independently; a label absent from the prior is treated the same as a
/// first observation of that label.
pub fn smooth_into(smoothed: &mut Option<BTreeMap<String, f64>>, raw: &BTreeMap<String, f64>) {
    match smoothed {
        None => {
            *smoothed = Some(raw.clone());
        }
        Some(prior) => {
            for (label, &score) in raw {
                let blended = match prior.get(label) {
                    Some(&previous) => EMA_ALPHA * score + (1.0 - EMA_ALPHA) * previous,
                    None => score,
                };
                prior.insert(label.clone(), blended);
            }
        }
    }
}

/// Label with the highest smoothed score.
///
/// Ties break to the lexicographically smallest label: the map iterates in
/// key order and only a strictly greater score displaces the current best.
pub fn dominant(smoothed: &BTreeMap<String, f64>) -> Option<String> {
    let mut best: Option<(&String, f64)> = None;
    for (label, &score) in smoothed {
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((label, score)),
        }
    }
    best.map(|(label, _)| label.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(l, s)| (l.to_string(), *s)).collect()
    }

    #[test]
    fn test_first_observation_seeds_raw() {
        let mut smoothed = None;
        smooth_into(&mut smoothed, &raw(&[("happy", 80.0), ("neutral", 20.0)]));
        let smoothed = smoothed.unwrap();
        assert_eq!(smoothed["happy"], 80.0);
        assert_eq!(smoothed["neutral"], 20.0);
    }

    #[test]
    fn test_ema_exactness() {
        let mut smoothed = Some(raw(&[("happy", 50.0)]));
        smooth_into(&mut smoothed, &raw(&[("happy", 80.0)]));
        // 0.2 * 80 + 0.8 * 50 = 56
        assert_eq!(smoothed.unwrap()["happy"], 56.0);
    }

    #[test]
    fn test_new_label_in_existing_vector_seeds_directly() {
        let mut smoothed = Some(raw(&[("happy", 50.0)]));
        smooth_into(&mut smoothed, &raw(&[("happy", 50.0), ("surprise", 30.0)]));
        assert_eq!(smoothed.unwrap()["surprise"], 30.0);
    }

    #[test]
    fn test_dominant_argmax() {
        let v = raw(&[("angry", 5.0), ("happy", 70.0), ("neutral", 25.0)]);
        assert_eq!(dominant(&v), Some("happy".to_string()));
    }

    #[test]
    fn test_dominant_tie_breaks_lexicographically() {
        let v = raw(&[("neutral", 40.0), ("happy", 40.0), ("sad", 20.0)]);
        assert_eq!(dominant(&v), Some("happy".to_string()));
    }

    #[test]
    fn test_dominant_empty_vector() {
        assert_eq!(dominant(&BTreeMap::new()), None);
    }
}
