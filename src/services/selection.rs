//! Result selection
//!
//! Keeps only the top-scoring candidates, narrows fully tied sets to the
//! most generic documents and shuffles the survivors.

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::models::{ScoredDocument, SearchResultSet};

#[derive(Debug, Clone, Copy, Default)]
pub struct ResultSelector;

impl ResultSelector {
    pub fn new() -> Self {
        Self
    }

    pub fn select(&self, result: SearchResultSet) -> SearchResultSet {
        self.select_with(result, &mut rand::thread_rng())
    }

    /// Selection with an explicit random source.
    pub fn select_with<R: Rng + ?Sized>(
        &self,
        result: SearchResultSet,
        rng: &mut R,
    ) -> SearchResultSet {
        if result.total_found <= 1 {
            return result;
        }
        let Some(top_score) = result.documents.first().map(|d| d.score) else {
            return result;
        };

        let total_found = result.total_found;
        let mut survivors: Vec<ScoredDocument> = result
            .documents
            .into_iter()
            .filter(|d| d.score == top_score)
            .collect();

        // Every hit tied: no optional term discriminated, prefer the most generic.
        if survivors.len() == total_found {
            let min_specificity = survivors
                .iter()
                .map(ScoredDocument::specificity)
                .min()
                .unwrap_or(0);
            survivors.retain(|d| d.specificity() == min_specificity);
        }

        debug!(
            "Selected {} of {} candidates at score {}",
            survivors.len(),
            total_found,
            top_score
        );

        self.shuffle_with(&mut survivors, rng);
        SearchResultSet::from_documents(survivors)
    }

    /// Uniform in-place shuffle; membership is unchanged.
    pub fn shuffle(&self, documents: &mut [ScoredDocument]) {
        self.shuffle_with(documents, &mut rand::thread_rng());
    }

    pub fn shuffle_with<R: Rng + ?Sized>(&self, documents: &mut [ScoredDocument], rng: &mut R) {
        documents.shuffle(rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ElementValue, element_names};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::{BTreeMap, BTreeSet};

    fn doc(id: &str, score: f32, categories: usize) -> ScoredDocument {
        let mut elements = BTreeMap::new();
        if categories > 0 {
            elements.insert(
                element_names::FILTER.to_string(),
                ElementValue::Category {
                    categories: (0..categories).map(|i| format!("cat/{}", i)).collect(),
                },
            );
        }
        ScoredDocument {
            id: id.into(),
            name: id.into(),
            score,
            elements,
        }
    }

    fn id_set(result: &SearchResultSet) -> BTreeSet<String> {
        result.documents.iter().map(|d| d.id.clone()).collect()
    }

    #[test]
    fn test_single_result_unchanged() {
        let input = SearchResultSet::from_documents(vec![doc("a", 3.0, 2)]);
        assert_eq!(ResultSelector::new().select(input.clone()), input);
    }

    #[test]
    fn test_empty_result_unchanged() {
        let input = SearchResultSet::empty();
        assert_eq!(ResultSelector::new().select(input.clone()), input);
    }

    #[test]
    fn test_keeps_only_top_score() {
        let input = SearchResultSet::from_documents(vec![
            doc("a", 8.0, 3),
            doc("b", 8.0, 0),
            doc("c", 5.0, 0),
        ]);
        let result = ResultSelector::new().select(input);

        assert_eq!(result.total_found, 2);
        assert_eq!(id_set(&result), BTreeSet::from(["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn test_fully_tied_prefers_most_generic() {
        let input = SearchResultSet::from_documents(vec![
            doc("two", 1.0, 2),
            doc("zero", 1.0, 0),
            doc("three", 1.0, 3),
        ]);
        let result = ResultSelector::new().select(input);

        assert_eq!(result.total_found, 1);
        assert_eq!(result.ids(), vec!["zero"]);
    }

    #[test]
    fn test_fully_tied_keeps_all_of_min_specificity() {
        let input = SearchResultSet::from_documents(vec![
            doc("a", 1.0, 1),
            doc("b", 1.0, 2),
            doc("c", 1.0, 1),
        ]);
        let result = ResultSelector::new().select(input);
        assert_eq!(id_set(&result), BTreeSet::from(["a".to_string(), "c".to_string()]));
    }

    #[test]
    fn test_partial_tie_skips_specificity_refinement() {
        let input = SearchResultSet::from_documents(vec![
            doc("narrow", 8.0, 4),
            doc("generic", 8.0, 0),
            doc("low", 2.0, 0),
        ]);
        let result = ResultSelector::new().select(input);
        assert_eq!(result.total_found, 2);
        assert!(id_set(&result).contains("narrow"));
    }

    #[test]
    fn test_tied_page_of_larger_result_keeps_all_top_scores() {
        let input = SearchResultSet {
            total_found: 40,
            documents: vec![doc("a", 5.0, 2), doc("b", 5.0, 0), doc("c", 5.0, 3)],
        };
        let result = ResultSelector::new().select(input);

        assert_eq!(result.total_found, 3);
        assert_eq!(
            id_set(&result),
            BTreeSet::from(["a".to_string(), "b".to_string(), "c".to_string()])
        );
    }

    #[test]
    fn test_shuffle_preserves_membership() {
        let selector = ResultSelector::new();
        let mut rng = StdRng::seed_from_u64(7);
        let original: Vec<ScoredDocument> = (0..20).map(|i| doc(&i.to_string(), 1.0, 0)).collect();

        for _ in 0..10 {
            let mut shuffled = original.clone();
            selector.shuffle_with(&mut shuffled, &mut rng);
            let before: BTreeSet<_> = original.iter().map(|d| d.id.clone()).collect();
            let after: BTreeSet<_> = shuffled.iter().map(|d| d.id.clone()).collect();
            assert_eq!(before, after);
            assert_eq!(shuffled.len(), original.len());
        }
    }

    #[test]
    fn test_selection_order_is_randomised() {
        let selector = ResultSelector::new();
        let mut rng = StdRng::seed_from_u64(42);
        let input = SearchResultSet::from_documents(
            (0..8).map(|i| doc(&i.to_string(), 5.0, 0)).collect(),
        );

        let orders: BTreeSet<Vec<String>> = (0..20)
            .map(|_| {
                selector
                    .select_with(input.clone(), &mut rng)
                    .documents
                    .into_iter()
                    .map(|d| d.id)
                    .collect()
            })
            .collect();
        assert!(orders.len() > 1);
    }
}
