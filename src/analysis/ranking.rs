//! Candidate ordering, top-tie shuffling and per-game diversity selection.

use std::cmp::Ordering;
use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::domain::Candidate;

/// Descending by synergy, then break probability, then confidence.
pub fn compare_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    b.synergy
        .total_cmp(&a.synergy)
        .then_with(|| b.break_probability.total_cmp(&a.break_probability))
        .then_with(|| b.confidence.cmp(&a.confidence))
}

/// Stable three-key sort, no shuffle.
pub fn sort_candidates(candidates: &mut [Candidate]) {
    candidates.sort_by(compare_candidates);
}

/// Length of the leading run whose score tuple equals the first candidate's.
pub fn leading_tie_len(ranked: &[Candidate]) -> usize {
    let Some(first) = ranked.first() else {
        return 0;
    };
    let top = first.score_key();
    ranked
        .iter()
        .take_while(|c| c.score_key() == top)
        .count()
}

/// Sorted candidates after the top tie group was shuffled.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    pub ranked: Vec<Candidate>,
    /// Size of the shuffled leading tie group (1 when there was no tie).
    pub tie_group: usize,
}

impl Ranking {
    pub fn had_tie(&self) -> bool {
        self.tie_group > 1
    }
}

/// Sort, then shuffle only the leading exact-tie group with `rng`.
///
/// Candidates tied further down keep their sorted (insertion) order.
pub fn rank_candidates<R: Rng + ?Sized>(mut candidates: Vec<Candidate>, rng: &mut R) -> Ranking {
    sort_candidates(&mut candidates);
    let tie_group = leading_tie_len(&candidates);
    if tie_group > 1 {
        debug!(tie_group, "shuffling tied top candidates");
        candidates[..tie_group].shuffle(rng);
    }
    Ranking {
        ranked: candidates,
        tie_group,
    }
}

/// Seeded generator when a seed is configured, entropy-seeded otherwise.
pub fn tie_break_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Whether a candidate passes the diversity pass's probability floor.
pub fn meets_probability(candidate: &Candidate, min_probability: f64) -> bool {
    candidate.break_probability >= min_probability
}

/// Walk `ranked` in order and keep at most one candidate per group key.
///
/// Candidates under `min_probability` are skipped and never count toward
/// `k`. Candidates with no key all share the same `None` group.
pub fn select_diverse(ranked: &[Candidate], k: usize, min_probability: f64) -> Vec<Candidate> {
    let mut picks = Vec::with_capacity(k);
    if k == 0 {
        return picks;
    }
    let mut seen = HashSet::new();
    for candidate in ranked {
        if !meets_probability(candidate, min_probability) {
            continue;
        }
        if seen.insert(candidate.group_key.clone()) {
            picks.push(candidate.clone());
            if picks.len() == k {
                break;
            }
        }
    }
    picks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{synergy_score, Direction, FactorNotes, RosterTag};

    fn candidate(id: u64, prob: f64, conf: i64, game: Option<&str>) -> Candidate {
        Candidate {
            entity_id: id,
            entity_name: format!("Player {id}"),
            threshold: 20.5,
            direction: Direction::Over,
            break_probability: prob,
            confidence: conf,
            synergy: synergy_score(prob, conf),
            group_key: game.map(str::to_string),
            streak_length: 2,
            season_average: 21.0,
            efficiency_ratio: 0.45,
            roster_tag: RosterTag::Unchanged,
            notes: FactorNotes::default(),
        }
    }

    fn ids(cands: &[Candidate]) -> Vec<u64> {
        cands.iter().map(|c| c.entity_id).collect()
    }

    #[test]
    fn sort_uses_all_three_keys() {
        let mut cands = vec![
            candidate(1, 50.0, 80, None), // 0.40
            candidate(2, 80.0, 50, None), // 0.40, higher prob
            candidate(3, 100.0, 60, None), // 0.60
            candidate(4, 50.0, 81, None),
        ];
        sort_candidates(&mut cands);
        assert_eq!(ids(&cands), vec![3, 4, 2, 1]);
    }

    #[test]
    fn shuffle_only_touches_top_tie_group() {
        let mut cands: Vec<Candidate> = (1..=5).map(|i| candidate(i, 80.0, 70, None)).collect();
        cands.push(candidate(10, 60.0, 70, None));
        cands.push(candidate(11, 50.0, 50, None));
        cands.push(candidate(12, 50.0, 50, None));

        let mut rng = StdRng::seed_from_u64(42);
        let ranking = rank_candidates(cands, &mut rng);
        assert_eq!(ranking.tie_group, 5);
        assert!(ranking.had_tie());

        let mut head = ids(&ranking.ranked[..5]);
        head.sort_unstable();
        assert_eq!(head, vec![1, 2, 3, 4, 5]);
        // lower ties keep insertion order
        assert_eq!(ids(&ranking.ranked[5..]), vec![10, 11, 12]);
    }

    #[test]
    fn seeded_shuffle_is_reproducible() {
        let make = || (1..=8).map(|i| candidate(i, 90.0, 90, None)).collect::<Vec<_>>();
        let a = rank_candidates(make(), &mut tie_break_rng(Some(7)));
        let b = rank_candidates(make(), &mut tie_break_rng(Some(7)));
        assert_eq!(ids(&a.ranked), ids(&b.ranked));
    }

    #[test]
    fn no_tie_keeps_sorted_order() {
        let cands = vec![candidate(1, 10.0, 50, None), candidate(2, 90.0, 50, None)];
        let ranking = rank_candidates(cands, &mut StdRng::seed_from_u64(1));
        assert_eq!(ranking.tie_group, 1);
        assert_eq!(ids(&ranking.ranked), vec![2, 1]);
        assert_eq!(leading_tie_len(&[]), 0);
    }

    #[test]
    fn diversity_keeps_one_per_game_and_skips_low_probability() {
        let ranked = vec![
            candidate(1, 100.0, 90, Some("G1")),
            candidate(2, 100.0, 80, Some("G1")),
            candidate(3, 60.0, 99, Some("G2")), // under floor
            candidate(4, 80.0, 70, Some("G3")),
            candidate(5, 80.0, 60, Some("G4")),
        ];
        let picks = select_diverse(&ranked, 2, 75.0);
        assert_eq!(ids(&picks), vec![1, 4]);

        let all = select_diverse(&ranked, 10, 0.0);
        let keys: HashSet<_> = all.iter().map(|c| c.group_key.clone()).collect();
        assert_eq!(keys.len(), all.len());
        assert_eq!(ids(&all), vec![1, 3, 4, 5]);
    }

    #[test]
    fn keyless_candidates_share_one_group() {
        let ranked = vec![candidate(1, 90.0, 90, None), candidate(2, 90.0, 80, None)];
        assert_eq!(ids(&select_diverse(&ranked, 4, 0.0)), vec![1]);
        assert!(select_diverse(&ranked, 0, 0.0).is_empty());
    }
}
