//! End-to-end reconciliation pass tests over an in-memory asset tree.

use std::sync::Arc;

use bytes::Bytes;

use flora_catalog::{
    AliasResolver, CatalogPublisher, ColorVocabulary, ConflictPolicy, Encoder, ImageFormat,
    ReconcileAction, ReconcileOptions, Reconciler, SkipReason, StorageAssetSource,
};
use flora_core::{MemoryBackend, StorageBackend};

async fn seeded_backend(objects: &[(&str, &[u8])]) -> Arc<MemoryBackend> {
    let backend = Arc::new(MemoryBackend::new());
    for (path, bytes) in objects {
        backend
            .put(path, Bytes::copy_from_slice(bytes))
            .await
            .expect("seeding should succeed");
    }
    backend
}

fn reconciler_over(backend: Arc<MemoryBackend>) -> Reconciler {
    let source = StorageAssetSource::new(backend as Arc<dyn StorageBackend>, "flowers");
    Reconciler::new(Arc::new(source))
}

#[tokio::test]
async fn byte_identical_copies_collapse_to_one_record() {
    // Same bytes under a legacy folder spelling and a legacy color label.
    let backend = seeded_backend(&[
        ("flowers/rose/화이트.webp", b"white-rose-image"),
        ("flowers/rosejpg/흰색.jpg", b"white-rose-image"),
    ])
    .await;

    let outcome = reconciler_over(backend).run().await.expect("pass should succeed");

    assert_eq!(outcome.index.len(), 1);
    let entity = AliasResolver::flower_entities().canonicalize("rose");
    let color = ColorVocabulary::flower_default().resolve("화이트");
    let record = outcome.index.get(&entity, &color).expect("merged record should exist");
    // Lexicographically smallest origin path survives.
    assert_eq!(record.origin_path, "flowers/rose/화이트.webp");

    let counts = outcome.report.counts();
    assert_eq!(counts.merged, 1);
    assert_eq!(counts.dropped, 0);
    assert!(outcome.report.actions.iter().any(|a| matches!(
        a,
        ReconcileAction::MergedDuplicate { dropped_path, .. }
            if dropped_path == "flowers/rosejpg/흰색.jpg"
    )));
}

#[tokio::test]
async fn legacy_labels_resolve_and_report_renames() {
    let backend = seeded_backend(&[
        ("flowers/Rosejpg/빨강.jpg", b"red-rose"),
        ("flowers/카네이숀/분홍.png", b"pink-carnation"),
    ])
    .await;

    let outcome = reconciler_over(backend).run().await.unwrap();

    let entities = AliasResolver::flower_entities();
    let vocab = ColorVocabulary::flower_default();

    let rose = outcome
        .index
        .get(&entities.canonicalize("Rosejpg"), &vocab.resolve("레드"))
        .expect("rose record should exist under its canonical key");
    assert_eq!(rose.entity.as_str(), "rose");

    let carnation = outcome
        .index
        .get(&entities.canonicalize("카네이숀"), &vocab.resolve("핑크"))
        .expect("carnation record should exist under its canonical key");
    assert_eq!(carnation.entity.as_str(), "카네이션");

    // Both raw labels differed from canonical, so both are renames.
    let counts = outcome.report.counts();
    assert_eq!(counts.renamed, 2);
    assert_eq!(counts.kept, 0);
    assert!(outcome.report.actions.iter().any(|a| matches!(
        a,
        ReconcileAction::RenamedAlias { raw_entity_label, raw_color_label, .. }
            if raw_entity_label == "Rosejpg" && raw_color_label == "빨강"
    )));
}

#[tokio::test]
async fn unknown_color_falls_back_to_default() {
    let backend = seeded_backend(&[("flowers/tulip/sepia.webp", b"odd-tulip")]).await;

    let outcome = reconciler_over(backend).run().await.unwrap();

    let entity = AliasResolver::flower_entities().canonicalize("tulip");
    let vocab = ColorVocabulary::flower_default();
    let record = outcome
        .index
        .get(&entity, &vocab.default_color())
        .expect("asset should land under the default color");
    assert_eq!(record.color.as_str(), "기타");
    assert_eq!(outcome.report.counts().renamed, 1);
}

#[tokio::test]
async fn key_conflict_keeps_first_seen_by_default() {
    // Two genuinely different images claiming (rose, 화이트).
    let backend = seeded_backend(&[
        ("flowers/rose/화이트.webp", b"white-rose-a"),
        ("flowers/rose/흰색.webp", b"white-rose-b"),
    ])
    .await;

    let outcome = reconciler_over(backend).run().await.unwrap();

    assert_eq!(outcome.index.len(), 1);
    let entity = AliasResolver::flower_entities().canonicalize("rose");
    let color = ColorVocabulary::flower_default().resolve("화이트");
    let kept = outcome.index.get(&entity, &color).unwrap();
    assert_eq!(kept.origin_path, "flowers/rose/화이트.webp");

    let counts = outcome.report.counts();
    assert_eq!(counts.dropped, 1);
    assert!(outcome.report.actions.iter().any(|a| matches!(
        a,
        ReconcileAction::DroppedConflict { kept_path, dropped_path, .. }
            if kept_path == "flowers/rose/화이트.webp"
                && dropped_path == "flowers/rose/흰색.webp"
    )));
}

#[tokio::test]
async fn keep_largest_policy_prefers_bigger_asset() {
    let backend = seeded_backend(&[
        ("flowers/rose/화이트.webp", b"small"),
        ("flowers/rose/흰색.webp", b"much-larger-replacement-scan"),
    ])
    .await;

    let options = ReconcileOptions {
        conflict_policy: ConflictPolicy::KeepLargest,
        ..ReconcileOptions::default()
    };
    let outcome = reconciler_over(backend)
        .with_options(options)
        .run()
        .await
        .unwrap();

    let entity = AliasResolver::flower_entities().canonicalize("rose");
    let color = ColorVocabulary::flower_default().resolve("화이트");
    let kept = outcome.index.get(&entity, &color).unwrap();
    assert_eq!(kept.origin_path, "flowers/rose/흰색.webp");
    assert_eq!(outcome.report.counts().dropped, 1);
}

#[tokio::test]
async fn unrecognized_paths_are_skipped_not_fatal() {
    let backend = seeded_backend(&[
        ("flowers/rose/wh.webp", b"white-rose"),
        ("flowers/stray-notes.txt", b"not an asset"),
        ("flowers/rose/archive/old.webp", b"too deep"),
    ])
    .await;

    let outcome = reconciler_over(backend).run().await.unwrap();

    assert_eq!(outcome.index.len(), 1);
    assert_eq!(outcome.report.discovered, 1);
    assert_eq!(outcome.report.skipped.len(), 2);
    assert!(outcome
        .report
        .skipped
        .iter()
        .all(|s| matches!(s.reason, SkipReason::UnrecognizedPath)));
}

struct FailingEncoder;

impl Encoder for FailingEncoder {
    fn encode(
        &self,
        _bytes: Bytes,
        _target: ImageFormat,
        _quality: u8,
    ) -> flora_catalog::Result<Bytes> {
        Err(flora_catalog::CatalogError::Encode {
            path: String::new(),
            message: "corrupt source".to_string(),
        })
    }
}

#[tokio::test]
async fn encode_failure_skips_the_asset_and_continues() {
    // The webp asset needs no re-encode and must survive the broken encoder.
    let backend = seeded_backend(&[
        ("flowers/rose/wh.webp", b"white-rose"),
        ("flowers/tulip/레드.jpg", b"red-tulip"),
    ])
    .await;

    let outcome = reconciler_over(backend)
        .with_encoder(Arc::new(FailingEncoder))
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.index.len(), 1);
    assert_eq!(outcome.report.skipped.len(), 1);
    assert!(matches!(
        outcome.report.skipped[0].reason,
        SkipReason::EncodeFailure { .. }
    ));
    assert_eq!(outcome.report.skipped[0].path, "flowers/tulip/레드.jpg");
}

#[tokio::test]
async fn output_is_bit_identical_across_runs() {
    let objects: &[(&str, &[u8])] = &[
        ("flowers/rose/화이트.webp", b"white-rose"),
        ("flowers/rosejpg/흰색.jpg", b"white-rose"),
        ("flowers/tulip/레드.webp", b"red-tulip"),
        ("flowers/liliumpng/노랑.png", b"yellow-lily"),
        ("flowers/후리지아/옐로우.webp", b"yellow-freesia"),
    ];

    let first = reconciler_over(seeded_backend(objects).await).run().await.unwrap();
    let second = reconciler_over(seeded_backend(objects).await).run().await.unwrap();

    let index_a = serde_json::to_string(&first.index).unwrap();
    let index_b = serde_json::to_string(&second.index).unwrap();
    assert_eq!(index_a, index_b);

    let report_a = serde_json::to_string(&first.report).unwrap();
    let report_b = serde_json::to_string(&second.report).unwrap();
    assert_eq!(report_a, report_b);
}

#[tokio::test]
async fn applied_catalog_reconciles_to_all_kept() {
    let backend = seeded_backend(&[
        ("flowers/rose/화이트.webp", b"white-rose"),
        ("flowers/rosejpg/흰색.jpg", b"white-rose"),
        ("flowers/tulip/빨강.webp", b"red-tulip"),
        ("flowers/카네이숀/분홍.png", b"pink-carnation"),
    ])
    .await;

    let first = reconciler_over(Arc::clone(&backend)).run().await.unwrap();
    assert!(!first.report.is_all_kept());

    let publisher = CatalogPublisher::new(Arc::clone(&backend) as Arc<dyn StorageBackend>);
    let (applied, summary) = publisher.apply(&first, "flowers/").await.unwrap();
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.deleted, 1);

    // Storage now holds only canonical `{entity}/{code}.webp` paths.
    let second = reconciler_over(Arc::clone(&backend))
        .with_prior(applied.clone())
        .run()
        .await
        .unwrap();

    assert!(second.report.is_all_kept(), "second pass: {:?}", second.report);
    assert_eq!(second.index, applied);
    assert_eq!(second.index.len(), 3);

    let entity = AliasResolver::flower_entities().canonicalize("rose");
    let color = ColorVocabulary::flower_default().resolve("화이트");
    assert_eq!(
        second.index.get(&entity, &color).unwrap().origin_path,
        "flowers/rose/wh.webp"
    );
}

#[tokio::test]
async fn prior_snapshot_pins_the_duplicate_representative() {
    // Two identical copies; the one the prior index already knows wins even
    // though its path sorts second.
    let backend = seeded_backend(&[
        ("flowers/rose/화이트.webp", b"white-rose"),
        ("flowers/튤립/화이트.webp", b"white-rose"),
    ])
    .await;

    let entities = AliasResolver::flower_entities();
    let vocab = ColorVocabulary::flower_default();

    let baseline = reconciler_over(Arc::clone(&backend)).run().await.unwrap();
    // Sanity: without a prior, the smaller path is representative.
    assert!(baseline
        .index
        .get(&entities.canonicalize("rose"), &vocab.resolve("화이트"))
        .is_some());

    let mut prior = flora_catalog::CatalogIndex::new();
    prior
        .upsert(flora_catalog::AssetRecord {
            entity: entities.canonicalize("튤립"),
            color: vocab.resolve("화이트"),
            fingerprint: flora_catalog::Fingerprint::of(b"white-rose"),
            byte_len: 10,
            origin_path: "flowers/튤립/화이트.webp".to_string(),
        })
        .unwrap();

    let outcome = reconciler_over(backend).with_prior(prior).run().await.unwrap();
    let record = outcome
        .index
        .get(&entities.canonicalize("튤립"), &vocab.resolve("화이트"))
        .expect("prior key should stay the representative");
    assert_eq!(record.origin_path, "flowers/튤립/화이트.webp");
}

#[tokio::test]
async fn empty_tree_yields_empty_outcome() {
    let backend = seeded_backend(&[]).await;
    let outcome = reconciler_over(backend).run().await.unwrap();

    assert!(outcome.index.is_empty());
    assert_eq!(outcome.report.discovered, 0);
    assert!(outcome.report.actions.is_empty());
    assert!(outcome.report.is_all_kept());
}
