//! Probe-against-gallery matching.

use crate::identity::IdentityKey;
use crate::types::Embedding;

/// Default maximum distance accepted as a positive match.
pub const DEFAULT_TOLERANCE: f32 = 0.6;

/// Outcome of a gallery search. An empty gallery is its own outcome,
/// distinct from "scanned but nothing within tolerance".
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// Best candidate fell within tolerance.
    Matched { identity: IdentityKey, distance: f32 },
    /// Gallery scanned; best candidate still above tolerance.
    NoMatch { best_distance: f32 },
    /// Nothing enrolled to compare against.
    NoCandidates,
}

/// Strategy for searching a gallery with a probe embedding.
pub trait Matcher {
    fn search(
        &self,
        probe: &Embedding,
        gallery: &[(IdentityKey, Embedding)],
        tolerance: f32,
    ) -> MatchOutcome;
}

/// Linear-scan Euclidean matcher.
///
/// Ties break toward the first candidate encountered (strict `<` while
/// scanning), keeping results deterministic for a fixed gallery order.
pub struct NearestMatcher;

impl Matcher for NearestMatcher {
    fn search(
        &self,
        probe: &Embedding,
        gallery: &[(IdentityKey, Embedding)],
        tolerance: f32,
    ) -> MatchOutcome {
        let mut best: Option<(usize, f32)> = None;

        for (i, (_, candidate)) in gallery.iter().enumerate() {
            let distance = probe.distance(candidate);
            let better = match best {
                None => true,
                Some((_, best_distance)) => distance < best_distance,
            };
            if better {
                best = Some((i, distance));
            }
        }

        match best {
            None => MatchOutcome::NoCandidates,
            Some((i, distance)) if distance <= tolerance => MatchOutcome::Matched {
                identity: gallery[i].0.clone(),
                distance,
            },
            Some((_, distance)) => MatchOutcome::NoMatch { best_distance: distance },
        }
    }
}
