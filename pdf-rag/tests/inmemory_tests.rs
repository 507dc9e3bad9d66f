//! Property tests for in-memory vector store search ordering.

use std::collections::HashSet;

use pdf_rag::{InMemoryVectorStore, RagError, VectorStore};
use proptest::prelude::*;

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map(
        "non-zero embedding",
        |mut v| {
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm < 1e-8 {
                return None;
            }
            for val in &mut v {
                *val /= norm;
            }
            Some(v)
        },
    )
}

/// Generate an (id, text, embedding) passage.
fn arb_passage(dim: usize) -> impl Strategy<Value = (String, String, Vec<f32>)> {
    ("[a-z]{3,8}", "[a-z ]{5,30}", arb_normalized_embedding(dim))
}

/// **In-memory vector store search ordering**
/// *For any* set of passages stored in an InMemoryVectorStore, querying with
/// an embedding SHALL return results ordered by descending cosine similarity,
/// and the number of results SHALL be min(top_k, stored).
mod prop_inmemory_search_ordering {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_descending_and_bounded_by_top_k(
            passages in proptest::collection::vec(arb_passage(DIM), 1..20),
            query in arb_normalized_embedding(DIM),
            top_k in 1usize..25,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let (results, unique_count, stored_texts) = rt.block_on(async {
                let store = InMemoryVectorStore::new();
                let handle = store.open_or_create("test").await.unwrap();

                // Deduplicate by id; repeated ids are rejected by `add`
                let mut seen = HashSet::new();
                let mut ids = Vec::new();
                let mut texts = Vec::new();
                let mut embeddings = Vec::new();
                for (id, text, embedding) in passages {
                    if seen.insert(id.clone()) {
                        ids.push(id);
                        texts.push(text);
                        embeddings.push(embedding);
                    }
                }

                store.add(&handle, &ids, &texts, &embeddings).await.unwrap();
                let results = store.query(&handle, &query, top_k).await.unwrap();
                (results, ids.len(), texts)
            });

            prop_assert_eq!(results.len(), top_k.min(unique_count));

            // Asking for at least everything returns every passage exactly once
            if top_k >= unique_count {
                let got: HashSet<&str> = results.iter().map(|r| r.passage.id.as_str()).collect();
                prop_assert_eq!(got.len(), results.len());
                let mut got_texts: Vec<&str> =
                    results.iter().map(|r| r.passage.text.as_str()).collect();
                let mut want_texts: Vec<&str> = stored_texts.iter().map(String::as_str).collect();
                got_texts.sort_unstable();
                want_texts.sort_unstable();
                prop_assert_eq!(got_texts, want_texts);
            }

            for window in results.windows(2) {
                prop_assert!(
                    window[0].score >= window[1].score,
                    "results not in descending order: {} < {}",
                    window[0].score,
                    window[1].score,
                );
            }
        }
    }
}

#[tokio::test]
async fn ties_keep_insertion_order() {
    let store = InMemoryVectorStore::new();
    let handle = store.open_or_create("docs").await.unwrap();
    let ids: Vec<String> = vec!["z".into(), "a".into(), "m".into()];
    let texts: Vec<String> = vec!["first".into(), "second".into(), "third".into()];
    let embeddings = vec![vec![1.0, 0.0]; 3];
    store.add(&handle, &ids, &texts, &embeddings).await.unwrap();

    let results = store.query(&handle, &[1.0, 0.0], 3).await.unwrap();
    let order: Vec<&str> = results.iter().map(|r| r.passage.text.as_str()).collect();
    assert_eq!(order, vec!["first", "second", "third"]);
}

#[tokio::test]
async fn duplicate_id_is_rejected_without_partial_write() {
    let store = InMemoryVectorStore::new();
    let handle = store.open_or_create("docs").await.unwrap();
    store.add(&handle, &["a".to_string()], &["one".to_string()], &[vec![1.0]]).await.unwrap();

    let err = store
        .add(
            &handle,
            &["b".to_string(), "a".to_string()],
            &["two".to_string(), "three".to_string()],
            &[vec![1.0], vec![1.0]],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::DuplicateId { .. }));
    assert_eq!(store.count(&handle).await.unwrap(), 1);
}
