use ragdb_core::traits::Embedder;
use ragdb_core::types::EMBEDDING_DIM;
use ragdb_embed::FakeEmbedder;

#[test]
fn fake_embedder_shapes_and_determinism() {
    let embedder = FakeEmbedder::default();
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), EMBEDDING_DIM, "embedding dim is 384");

    // Norm approximately 1.0
    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    // Deterministic for same input
    assert_eq!(v1, v2);
}

#[test]
fn fake_embedder_separates_unrelated_text() {
    let embedder = FakeEmbedder::default();
    let a = embedder.embed("rust ownership borrowing").unwrap();
    let b = embedder.embed("rust ownership borrowing lifetimes").unwrap();
    let c = embedder.embed("sourdough bread hydration").unwrap();
    let d = |x: &[f32], y: &[f32]| x.iter().zip(y).map(|(p, q)| (p - q) * (p - q)).sum::<f32>();
    assert!(d(&a, &b) < d(&a, &c));
}

#[test]
fn empty_text_embeds_to_finite_vector() {
    let v = FakeEmbedder::new(16).embed("").unwrap();
    assert_eq!(v.len(), 16);
    assert!(v.iter().all(|x| x.is_finite()));
}
