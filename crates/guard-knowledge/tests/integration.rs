//! Property-based tests for the knowledge graph's content-addressing and
//! idempotency invariants, plus end-to-end provenance chain tests.

use guard_knowledge::KnowledgeStore;
use proptest::prelude::*;

proptest! {
    #[test]
    fn sample_id_is_a_pure_function_of_text(text in ".{1,200}") {
        let a = KnowledgeStore::sample_id_for(&text);
        let b = KnowledgeStore::sample_id_for(&text);
        prop_assert_eq!(a.clone(), b);
        prop_assert_eq!(a.len(), 16);
    }

    #[test]
    fn ingesting_the_same_text_twice_never_duplicates_the_sample(text in "[a-z ]{1,100}") {
        let store = KnowledgeStore::temporary().unwrap();
        store.ingest_sample(&text, "test", 0.5, vec![], vec![]).unwrap();
        store.ingest_sample(&text, "test", 0.5, vec![], vec![]).unwrap();
        prop_assert_eq!(store.stats().samples, 1);
    }
}

#[test]
fn provenance_chain_survives_many_appends_in_one_session() {
    let store = KnowledgeStore::temporary().unwrap();
    let chain = store.provenance().unwrap();
    for i in 0..50 {
        chain.append("long-session", serde_json::json!({"step": i})).unwrap();
    }
    assert!(chain.verify("long-session").is_ok());
    assert_eq!(chain.load_chain("long-session").unwrap().len(), 50);
}
