//! Nearest-neighbour candidates between two catalogs and their resolution into one-to-one matches.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt::Debug;
use std::ops::Deref;

use itertools::Itertools;
use kiddo::float::{distance::SquaredEuclidean, kdtree::KdTree};
use log::debug;
use ndarray::Array1;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::Float;
use crate::geometry::{SkyPosition, unit_array};
use crate::ndarray_utils::argmin;

/// A source of catalog A and its nearest neighbour in catalog B.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CandidatePair<F: Float> {
    /// Index into catalog A.
    pub index_a: usize,
    /// Index into catalog B.
    pub index_b: usize,
    /// Angular separation in arcseconds.
    pub separation: F,
}

impl<F: Float> CandidatePair<F> {
    /// Create a new candidate.
    pub fn new(index_a: usize, index_b: usize, separation: F) -> Self {
        Self {
            index_a,
            index_b,
            separation,
        }
    }
}

/// Decides which candidate keeps a B source claimed by several A sources.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ClaimPolicy {
    /// Visit candidates by decreasing separation and let the first one claim its B source.
    ///
    /// This reproduces the reference reduction, which means a contested B source is kept by its
    /// **farthest** claimant below the threshold. That is most likely an accident of sorting in the
    /// wrong direction; use [`ClaimPolicy::Nearest`] unless the old numbers have to be reproduced.
    #[default]
    FirstClaim,
    /// Visit candidates by increasing separation, so the closest claimant keeps its B source.
    Nearest,
}

impl ClaimPolicy {
    /// Visiting order of two candidates. Equal separations are visited by ascending `index_a`.
    fn order<F: Float>(self, c1: &CandidatePair<F>, c2: &CandidatePair<F>) -> Ordering {
        let by_separation = c1
            .separation
            .partial_cmp(&c2.separation)
            .unwrap_or(Ordering::Equal);
        let by_separation = match self {
            ClaimPolicy::FirstClaim => by_separation.reverse(),
            ClaimPolicy::Nearest => by_separation,
        };
        by_separation.then(c1.index_a.cmp(&c2.index_a))
    }
}

/// One-to-one matches between two catalogs.
///
/// No B index appears twice and every separation is below the threshold it was resolved with.
/// Pairs are kept in the order they were accepted, which only depends on the candidates and the policy.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MatchSet<F: Float> {
    pairs: Vec<CandidatePair<F>>,
}

impl<F: Float> MatchSet<F> {
    /// Indices into catalog A and catalog B, aligned.
    pub fn indices(&self) -> (Vec<usize>, Vec<usize>) {
        self.pairs
            .iter()
            .map(|pair| (pair.index_a, pair.index_b))
            .unzip()
    }

    /// Whether some pair uses `index_b`.
    pub fn contains_b(&self, index_b: usize) -> bool {
        self.pairs.iter().any(|pair| pair.index_b == index_b)
    }
}

impl<F: Float> Deref for MatchSet<F> {
    type Target = [CandidatePair<F>];

    fn deref(&self) -> &Self::Target {
        &self.pairs
    }
}

impl<F: Float> IntoIterator for MatchSet<F> {
    type Item = CandidatePair<F>;

    type IntoIter = std::vec::IntoIter<CandidatePair<F>>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.into_iter()
    }
}

/// Resolve nearest-neighbour candidates into one-to-one matches.
///
/// Candidates are visited in the order given by `policy`. A candidate is accepted if its separation is
/// strictly below `threshold` (arcseconds) and its B index has not been claimed by an earlier accepted
/// candidate. Rejected candidates never claim anything.
///
/// Never fails: an empty input, a non-positive threshold or NaN separations simply yield fewer matches.
///
/// # Example:
/// ```
/// # use xmatch::{resolve, CandidatePair, ClaimPolicy};
/// let candidates = [
///     CandidatePair::new(0, 0, 0.02),
///     CandidatePair::new(1, 0, 0.08),
///     CandidatePair::new(2, 1, 0.5),
/// ];
/// let first = resolve(&candidates, 0.1, ClaimPolicy::FirstClaim);
/// assert_eq!(first.indices(), (vec![1], vec![0]));
///
/// let nearest = resolve(&candidates, 0.1, ClaimPolicy::Nearest);
/// assert_eq!(nearest.indices(), (vec![0], vec![0]));
/// ```
pub fn resolve<F: Float>(
    candidates: &[CandidatePair<F>],
    threshold: F,
    policy: ClaimPolicy,
) -> MatchSet<F> {
    let mut claimed = HashSet::new();

    // Candidates at or above the threshold never claim, so dropping them before sorting changes nothing.
    let pairs = candidates
        .iter()
        .filter(|candidate| candidate.separation < threshold)
        .sorted_by(|c1, c2| policy.order(c1, c2))
        .filter(|candidate| claimed.insert(candidate.index_b))
        .copied()
        .collect_vec();

    debug!(
        "Accepted {} of {} candidates below {} arcsec.",
        pairs.len(),
        candidates.len(),
        threshold
    );
    MatchSet { pairs }
}

/// Generalizes over nearest-neighbour search strategies.
pub trait SkyMatcher<F: Float>: Clone + Debug + Default {
    /// Find the nearest neighbour in `catalog_b` of every position in `catalog_a`.
    ///
    /// Returns one candidate per position of `catalog_a`, in order, or nothing if `catalog_b` is empty.
    /// Neighbours are not unique: several positions may share the same nearest neighbour.
    fn nearest(
        &self,
        catalog_a: &[SkyPosition<F>],
        catalog_b: &[SkyPosition<F>],
    ) -> Vec<CandidatePair<F>>;
}

/// Nearest neighbours from a kd-tree over the unit vectors of catalog B.
///
/// The chord between two unit vectors grows monotonically with their great-circle distance,
/// so the Euclidean nearest neighbour is also the nearest on the sky. The reported separation is
/// recomputed on the sphere.
///
/// Identical positions of catalog B enter the tree once, under their lowest index, and positions
/// that are not finite are left out.
#[derive(Clone, Copy, Debug, Default)]
pub struct KdTreeMatcher;

impl<F: Float + num_traits::float::FloatCore> SkyMatcher<F> for KdTreeMatcher {
    fn nearest(
        &self,
        catalog_a: &[SkyPosition<F>],
        catalog_b: &[SkyPosition<F>],
    ) -> Vec<CandidatePair<F>> {
        let distinct = distinct_positions(catalog_b);
        if distinct.is_empty() {
            return Vec::new();
        }

        // a kiddo bucket cannot be split when it only holds one point repeated
        let tree: KdTree<F, usize, 3, 32, u32> = distinct
            .iter()
            .map(|&i| (unit_array(&catalog_b[i]), i))
            .collect();
        debug!(
            "Built kd-tree over {} positions, {} duplicate or non-finite skipped.",
            distinct.len(),
            catalog_b.len() - distinct.len()
        );

        catalog_a
            .iter()
            .enumerate()
            .map(|(index_a, position)| {
                let nearest = tree.nearest_one::<SquaredEuclidean>(&unit_array(position));
                let separation = position.separation(&catalog_b[nearest.item]);
                CandidatePair::new(index_a, nearest.item, separation)
            })
            .collect_vec()
    }
}

/// Indices of the finite positions, keeping the lowest index of every group of identical ones.
fn distinct_positions<F: Float>(positions: &[SkyPosition<F>]) -> Vec<usize> {
    (0..positions.len())
        .filter(|&i| positions[i].ra.is_finite() && positions[i].dec.is_finite())
        .sorted_by(|&i, &j| {
            let (p, q) = (&positions[i], &positions[j]);
            p.ra.partial_cmp(&q.ra)
                .unwrap_or(Ordering::Equal)
                .then(p.dec.partial_cmp(&q.dec).unwrap_or(Ordering::Equal))
                .then(i.cmp(&j))
        })
        .dedup_by(|&i, &j| positions[i] == positions[j])
        .collect_vec()
}

/// Nearest neighbours by computing all separations.
///
/// Quadratic, but exact in its tie-breaking: the lowest B index wins among equally distant neighbours.
/// Positions of catalog A without any finite separation are skipped.
#[derive(Clone, Copy, Debug, Default)]
pub struct BruteForceMatcher;

impl<F: Float> SkyMatcher<F> for BruteForceMatcher {
    fn nearest(
        &self,
        catalog_a: &[SkyPosition<F>],
        catalog_b: &[SkyPosition<F>],
    ) -> Vec<CandidatePair<F>> {
        catalog_a
            .iter()
            .enumerate()
            .filter_map(|(index_a, position)| {
                let separations: Array1<F> = catalog_b
                    .iter()
                    .map(|other| position.separation(other))
                    .collect();
                let index_b = argmin(separations.view())?;
                Some(CandidatePair::new(index_a, index_b, separations[index_b]))
            })
            .collect_vec()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    use super::*;

    fn random_candidates(rng: &mut StdRng, n: usize, n_b: usize) -> Vec<CandidatePair<f64>> {
        (0..n)
            .map(|i| CandidatePair::new(i, rng.random_range(0..n_b), rng.random_range(0.0..0.3)))
            .collect()
    }

    /// A small field with a tight cluster so that neighbours are contested.
    fn random_field(rng: &mut StdRng, n: usize) -> Vec<SkyPosition<f64>> {
        (0..n)
            .map(|_| {
                SkyPosition::new(
                    150. + rng.random_range(0.0..0.01),
                    2. + rng.random_range(0.0..0.01),
                )
            })
            .collect()
    }

    #[test]
    fn resolve_empty() {
        let matches = resolve::<f64>(&[], 0.1, ClaimPolicy::FirstClaim);
        assert!(matches.is_empty());
    }

    #[test]
    fn resolve_all_above_threshold() {
        let candidates = [
            CandidatePair::new(0, 0, 0.1),
            CandidatePair::new(1, 1, 0.2),
            CandidatePair::new(2, 2, 3.),
        ];

        assert!(resolve(&candidates, 0.1, ClaimPolicy::FirstClaim).is_empty());
        assert!(resolve(&candidates, 0.1, ClaimPolicy::Nearest).is_empty());
    }

    #[test]
    fn resolve_negative_threshold() {
        let candidates = [CandidatePair::new(0, 0, 0.), CandidatePair::new(1, 1, 0.01)];
        assert!(resolve(&candidates, -1., ClaimPolicy::FirstClaim).is_empty());
    }

    #[test]
    fn resolve_ignores_nan() {
        let candidates = [
            CandidatePair::new(0, 0, f64::NAN),
            CandidatePair::new(1, 0, 0.05),
        ];
        let matches = resolve(&candidates, 0.1, ClaimPolicy::FirstClaim);

        assert_eq!(matches.indices(), (vec![1], vec![0]));
    }

    #[test]
    fn resolve_uncontested() {
        let candidates = [
            CandidatePair::new(0, 2, 0.01),
            CandidatePair::new(1, 0, 0.15),
            CandidatePair::new(2, 1, 0.05),
        ];

        for policy in [ClaimPolicy::FirstClaim, ClaimPolicy::Nearest] {
            let matches = resolve(&candidates, 0.1, policy);
            assert_eq!(matches.len(), 2);
            assert!(matches.contains(&candidates[0]));
            assert!(matches.contains(&candidates[2]));
        }
    }

    #[test]
    fn contested_first_claim_keeps_farthest() {
        let candidates = [
            CandidatePair::new(0, 0, 0.02),
            CandidatePair::new(1, 0, 0.08),
        ];
        let matches = resolve(&candidates, 0.1, ClaimPolicy::FirstClaim);

        assert_eq!(&*matches, &[CandidatePair::new(1, 0, 0.08)]);
    }

    #[test]
    fn contested_nearest_keeps_closest() {
        let candidates = [
            CandidatePair::new(0, 0, 0.02),
            CandidatePair::new(1, 0, 0.08),
        ];
        let matches = resolve(&candidates, 0.1, ClaimPolicy::Nearest);

        assert_eq!(&*matches, &[CandidatePair::new(0, 0, 0.02)]);
    }

    #[test]
    fn rejected_candidates_do_not_claim() {
        let candidates = [
            CandidatePair::new(0, 0, 0.5),
            CandidatePair::new(1, 0, 0.03),
        ];
        let matches = resolve(&candidates, 0.1, ClaimPolicy::FirstClaim);

        assert_eq!(&*matches, &[CandidatePair::new(1, 0, 0.03)]);
    }

    #[test]
    fn ties_broken_by_index_a() {
        let candidates = [
            CandidatePair::new(3, 7, 0.05),
            CandidatePair::new(1, 7, 0.05),
            CandidatePair::new(2, 7, 0.05),
        ];

        for policy in [ClaimPolicy::FirstClaim, ClaimPolicy::Nearest] {
            let matches = resolve(&candidates, 0.1, policy);
            assert_eq!(matches.indices(), (vec![1], vec![7]));
        }
    }

    #[test]
    fn resolve_properties() {
        let mut rng = StdRng::seed_from_u64(17);

        for _ in 0..200 {
            let n_a = rng.random_range(0..60);
            let n_b = rng.random_range(1..40);
            let candidates = random_candidates(&mut rng, n_a, n_b);
            let threshold = rng.random_range(0.0..0.3);

            for policy in [ClaimPolicy::FirstClaim, ClaimPolicy::Nearest] {
                let matches = resolve(&candidates, threshold, policy);

                // unique B indices
                let (_, indices_b) = matches.indices();
                assert_eq!(indices_b.iter().unique().count(), indices_b.len());
                // below threshold
                assert!(matches.iter().all(|pair| pair.separation < threshold));
                // cardinality
                assert!(matches.len() <= candidates.len().min(n_b));
                // deterministic
                assert_eq!(matches, resolve(&candidates, threshold, policy));
                // every match is one of the inputs
                assert!(matches.iter().all(|pair| candidates.contains(pair)));
            }
        }
    }

    #[test]
    fn resolve_monotonic_in_threshold() {
        let mut rng = StdRng::seed_from_u64(5);

        for _ in 0..50 {
            let candidates = random_candidates(&mut rng, 50, 20);
            let thresholds = (0..30).map(|i| 0.3 - 0.01 * f64::from(i)).collect_vec();

            for policy in [ClaimPolicy::FirstClaim, ClaimPolicy::Nearest] {
                let sizes = thresholds
                    .iter()
                    .map(|threshold| resolve(&candidates, *threshold, policy).len())
                    .collect_vec();
                assert!(sizes.windows(2).all(|w| w[1] <= w[0]), "{sizes:?}");
            }
        }
    }

    #[test]
    fn nearest_keeps_closest_of_every_group() {
        let mut rng = StdRng::seed_from_u64(11);
        let candidates = random_candidates(&mut rng, 100, 15);
        let matches = resolve(&candidates, 0.3, ClaimPolicy::Nearest);

        for pair in matches.iter() {
            let closest = candidates
                .iter()
                .filter(|c| c.index_b == pair.index_b)
                .map(|c| c.separation)
                .fold(f64::INFINITY, f64::min);
            assert_eq!(pair.separation, closest);
        }
    }

    #[test]
    fn first_claim_keeps_farthest_of_every_group() {
        let mut rng = StdRng::seed_from_u64(13);
        let candidates = random_candidates(&mut rng, 100, 15);
        let threshold = 0.2;
        let matches = resolve(&candidates, threshold, ClaimPolicy::FirstClaim);

        for pair in matches.iter() {
            let farthest = candidates
                .iter()
                .filter(|c| c.index_b == pair.index_b && c.separation < threshold)
                .map(|c| c.separation)
                .fold(f64::NEG_INFINITY, f64::max);
            assert_eq!(pair.separation, farthest);
        }
    }

    #[test]
    fn matchers_empty() {
        let positions = vec![SkyPosition::new(1., 1.)];

        assert!(KdTreeMatcher.nearest(&positions, &[]).is_empty());
        assert!(BruteForceMatcher.nearest(&positions, &[]).is_empty());
        assert!(KdTreeMatcher.nearest(&[], &positions).is_empty());
        assert!(BruteForceMatcher.nearest(&[], &positions).is_empty());
    }

    #[test]
    fn matchers_one_candidate_per_source() {
        let a = vec![
            SkyPosition::new(10., 10.),
            SkyPosition::new(10.0001, 10.),
            SkyPosition::new(200., -30.),
        ];
        let b = vec![SkyPosition::new(200., -30.00001), SkyPosition::new(10., 10.00002)];

        let expected_b = [1, 1, 0];
        for candidates in [KdTreeMatcher.nearest(&a, &b), BruteForceMatcher.nearest(&a, &b)] {
            assert_eq!(candidates.len(), 3);
            for (i, candidate) in candidates.iter().enumerate() {
                assert_eq!(candidate.index_a, i);
                assert_eq!(candidate.index_b, expected_b[i]);
            }
            assert_abs_diff_eq!(candidates[2].separation, 0.036, epsilon = 1e-8);
        }
    }

    #[test]
    fn kdtree_agrees_with_brute_force() {
        let mut rng = StdRng::seed_from_u64(23);

        for _ in 0..10 {
            let a = random_field(&mut rng, 300);
            let b = random_field(&mut rng, 200);

            let tree = KdTreeMatcher.nearest(&a, &b);
            let brute = BruteForceMatcher.nearest(&a, &b);

            assert_eq!(tree.len(), brute.len());
            for (t, b) in tree.iter().zip(&brute) {
                assert_eq!(t.index_a, b.index_a);
                assert_abs_diff_eq!(t.separation, b.separation, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn kdtree_across_zero_right_ascension() {
        let a = vec![SkyPosition::new(359.99999, 0.5)];
        let b = vec![SkyPosition::new(180., 0.5), SkyPosition::new(0.00001, 0.5)];

        let candidates = KdTreeMatcher.nearest(&a, &b);
        assert_eq!(candidates[0].index_b, 1);
        assert!(candidates[0].separation < 0.1);
    }

    #[test]
    fn kdtree_with_duplicated_positions() {
        // more identical points than fit in one bucket
        let mut b = vec![SkyPosition::new(10., 5.); 40];
        b.push(SkyPosition::new(10.001, 5.));
        let a = vec![SkyPosition::new(10., 5.), SkyPosition::new(10.001, 5.00001)];

        let candidates = KdTreeMatcher.nearest(&a, &b);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].index_b, 0);
        assert_abs_diff_eq!(candidates[0].separation, 0., epsilon = 1e-9);
        assert_eq!(candidates[1].index_b, 40);

        let brute = BruteForceMatcher.nearest(&a, &b);
        assert_eq!(candidates, brute);
    }

    #[test]
    fn kdtree_skips_non_finite_positions() {
        let b = vec![
            SkyPosition::new(f64::NAN, 5.),
            SkyPosition::new(10., f64::INFINITY),
            SkyPosition::new(10., 5.),
        ];
        let a = vec![SkyPosition::new(10., 5.)];

        let candidates = KdTreeMatcher.nearest(&a, &b);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].index_b, 2);

        assert!(KdTreeMatcher.nearest(&a, &b[..2]).is_empty());
    }

    #[test]
    fn distinct_positions_keep_lowest_index() {
        let positions = vec![
            SkyPosition::new(1., 1.),
            SkyPosition::new(2., 2.),
            SkyPosition::new(1., 1.),
            SkyPosition::new(2., 1.),
            SkyPosition::new(2., 2.),
        ];

        let mut distinct = distinct_positions(&positions);
        distinct.sort_unstable();
        assert_eq!(distinct, vec![0, 1, 3]);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_candidates() {
        assert_eq!(serde_json::to_string(&ClaimPolicy::Nearest).unwrap(), r#""Nearest""#);
        let policy: ClaimPolicy = serde_json::from_str(r#""FirstClaim""#).unwrap();
        assert_eq!(policy, ClaimPolicy::FirstClaim);

        let candidate = CandidatePair::new(3, 7, 0.0625);
        let json = serde_json::to_string(&candidate).unwrap();
        assert_eq!(json, r#"{"index_a":3,"index_b":7,"separation":0.0625}"#);
        let back: CandidatePair<f64> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, candidate);
    }
}
