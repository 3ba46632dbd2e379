//! Reconcile command - run a reconciliation pass over an asset tree.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use owo_colors::OwoColorize;
use tracing::Instrument;

use flora_catalog::{
    ApplySummary, CatalogPublisher, ConflictPolicy, ReconcileAction, ReconcileOptions,
    ReconcileOutcome, Reconciler, StorageAssetSource,
};
use flora_core::{reconcile_span, LocalFsBackend, ObjectStoreBackend, StorageBackend};

use crate::OutputFormat;

/// Conflict resolution policy flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ConflictPolicyArg {
    /// Keep the first asset seen (smallest origin path).
    #[default]
    KeepFirstSeen,
    /// Keep the largest asset by byte length.
    KeepLargest,
}

impl From<ConflictPolicyArg> for ConflictPolicy {
    fn from(value: ConflictPolicyArg) -> Self {
        match value {
            ConflictPolicyArg::KeepFirstSeen => Self::KeepFirstSeen,
            ConflictPolicyArg::KeepLargest => Self::KeepLargest,
        }
    }
}

/// Arguments for the reconcile command.
#[derive(Debug, Args)]
pub struct ReconcileArgs {
    /// Local asset directory to reconcile.
    #[arg(long, env = "FLORA_ASSET_ROOT", conflicts_with = "bucket")]
    pub root: Option<PathBuf>,

    /// Object-storage bucket to reconcile (`s3://...` or `gs://...`).
    #[arg(long, env = "FLORA_STORAGE_BUCKET")]
    pub bucket: Option<String>,

    /// Key prefix of the asset tree within the store.
    #[arg(long, default_value = "")]
    pub prefix: String,

    /// Bound on concurrent read+fingerprint tasks.
    #[arg(long, default_value = "8")]
    pub concurrency: usize,

    /// Key conflict resolution policy.
    #[arg(long, value_enum, default_value_t = ConflictPolicyArg::KeepFirstSeen)]
    pub conflict_policy: ConflictPolicyArg,

    /// Apply the outcome: delete dropped assets and rewrite survivors to
    /// their canonical paths. Without this flag the pass is a dry run.
    #[arg(long)]
    pub apply: bool,

    /// Publish the resulting index snapshot after the pass.
    #[arg(long)]
    pub publish: bool,

    /// Object key of the catalog snapshot.
    #[arg(
        long,
        env = "FLORA_CATALOG_SNAPSHOT",
        default_value = "flora/catalog.json"
    )]
    pub snapshot: String,

    /// Use the existing snapshot as the prior index for stable tie-breaks.
    #[arg(long)]
    pub prior: bool,

    /// Exit non-zero unless every action is `kept`.
    #[arg(long)]
    pub check: bool,
}

/// Result of one CLI reconcile invocation.
#[derive(Debug)]
pub struct ReconcileRun {
    /// The pass outcome (index reflects the apply step when requested).
    pub outcome: ReconcileOutcome,
    /// Apply summary, when `--apply` was given.
    pub applied: Option<ApplySummary>,
}

/// Execute the reconcile command.
///
/// # Errors
///
/// Returns an error when no asset location is configured, discovery fails,
/// or `--check` finds non-`kept` actions.
pub async fn execute(args: ReconcileArgs, format: OutputFormat) -> Result<()> {
    let run = run(&args).await?;
    render(&run, format)?;

    if args.check && !run.outcome.report.is_all_kept() {
        anyhow::bail!("catalog is not converged: non-kept actions were required");
    }
    Ok(())
}

/// Runs the pass (and optional apply/publish) without rendering.
pub async fn run(args: &ReconcileArgs) -> Result<ReconcileRun> {
    let (backend, location) = build_backend(args)?;
    let source = StorageAssetSource::new(Arc::clone(&backend), args.prefix.clone());

    let options = ReconcileOptions {
        concurrency: args.concurrency,
        conflict_policy: args.conflict_policy.into(),
        ..ReconcileOptions::default()
    };
    let mut reconciler = Reconciler::new(Arc::new(source)).with_options(options);

    if args.prior {
        if let Some(prior) = flora_catalog::load_snapshot(&backend, &args.snapshot)
            .await
            .context("failed to load prior snapshot")?
        {
            tracing::info!(path = %args.snapshot, records = prior.len(), "using prior snapshot");
            reconciler = reconciler.with_prior(prior);
        } else {
            tracing::warn!(path = %args.snapshot, "no prior snapshot found; running without one");
        }
    }

    let span = reconcile_span("full_pass", &location);
    let mut outcome = reconciler.run().instrument(span).await?;

    let publisher = CatalogPublisher::new(Arc::clone(&backend));
    let applied = if args.apply {
        let (index, summary) = publisher.apply(&outcome, &normalized_prefix(&args.prefix)).await?;
        outcome.index = index;
        Some(summary)
    } else {
        None
    };

    if args.publish {
        publisher
            .publish_snapshot(&outcome.index, &args.snapshot)
            .await
            .context("failed to publish catalog snapshot")?;
        tracing::info!(path = %args.snapshot, records = outcome.index.len(), "snapshot published");
    }

    Ok(ReconcileRun { outcome, applied })
}

fn build_backend(args: &ReconcileArgs) -> Result<(Arc<dyn StorageBackend>, String)> {
    if let Some(root) = &args.root {
        let location = root.display().to_string();
        return Ok((Arc::new(LocalFsBackend::new(root.clone())), location));
    }
    if let Some(bucket) = &args.bucket {
        let backend = ObjectStoreBackend::from_bucket(bucket)
            .with_context(|| format!("failed to open bucket '{bucket}'"))?;
        return Ok((Arc::new(backend), bucket.clone()));
    }
    anyhow::bail!("an asset location is required: set --root/FLORA_ASSET_ROOT or --bucket/FLORA_STORAGE_BUCKET")
}

fn normalized_prefix(prefix: &str) -> String {
    if prefix.is_empty() || prefix.ends_with('/') {
        prefix.to_string()
    } else {
        format!("{prefix}/")
    }
}

fn render(run: &ReconcileRun, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let body = serde_json::json!({
                "report": run.outcome.report,
                "records": run.outcome.index.len(),
                "applied": run.applied.map(|s| serde_json::json!({
                    "rewritten": s.rewritten,
                    "deleted": s.deleted,
                    "failed": s.failed,
                })),
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        OutputFormat::Text => render_text(run),
    }
    Ok(())
}

fn render_text(run: &ReconcileRun) {
    let report = &run.outcome.report;
    let counts = report.counts();

    println!(
        "Reconciled {} assets into {} records: {} kept, {} merged, {} renamed, {} dropped ({} skipped)",
        report.discovered,
        run.outcome.index.len(),
        counts.kept.green(),
        counts.merged.yellow(),
        counts.renamed.yellow(),
        counts.dropped.red(),
        report.skipped.len(),
    );

    for action in &report.actions {
        match action {
            ReconcileAction::Kept { .. } => {}
            ReconcileAction::MergedDuplicate {
                kept_path,
                dropped_path,
                ..
            } => {
                println!("  {} {dropped_path} -> {kept_path}", "merged ".yellow());
            }
            ReconcileAction::RenamedAlias {
                entity,
                color,
                path,
                raw_entity_label,
                raw_color_label,
            } => {
                println!(
                    "  {} {path} ({raw_entity_label}/{raw_color_label} -> {entity}/{color})",
                    "renamed".yellow()
                );
            }
            ReconcileAction::DroppedConflict {
                kept_path,
                dropped_path,
                ..
            } => {
                println!("  {} {dropped_path} (kept {kept_path})", "dropped".red());
            }
        }
    }

    for skipped in &report.skipped {
        println!("  {} {} ({:?})", "skipped".red(), skipped.path, skipped.reason);
    }

    if let Some(summary) = &run.applied {
        println!(
            "Applied: {} rewritten, {} deleted, {} failed",
            summary.rewritten, summary.deleted, summary.failed
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_for_root(root: &std::path::Path) -> ReconcileArgs {
        ReconcileArgs {
            root: Some(root.to_path_buf()),
            bucket: None,
            prefix: String::new(),
            concurrency: 4,
            conflict_policy: ConflictPolicyArg::KeepFirstSeen,
            apply: false,
            publish: false,
            snapshot: "flora/catalog.json".to_string(),
            prior: false,
            check: false,
        }
    }

    fn seed(dir: &std::path::Path, path: &str, contents: &[u8]) {
        let full = dir.join(path);
        std::fs::create_dir_all(full.parent().expect("parent")).expect("mkdir");
        std::fs::write(full, contents).expect("write");
    }

    #[tokio::test]
    async fn dry_run_over_local_tree() {
        let dir = tempfile::tempdir().expect("tempdir");
        seed(dir.path(), "rose/화이트.webp", b"white-rose");
        seed(dir.path(), "rosejpg/흰색.jpg", b"white-rose");

        let run = run(&args_for_root(dir.path())).await.expect("run should succeed");
        assert_eq!(run.outcome.index.len(), 1);
        assert_eq!(run.outcome.report.counts().merged, 1);
        assert!(run.applied.is_none());

        // Dry run leaves the tree untouched.
        assert!(dir.path().join("rosejpg/흰색.jpg").exists());
    }

    #[tokio::test]
    async fn apply_converges_the_tree() {
        let dir = tempfile::tempdir().expect("tempdir");
        seed(dir.path(), "rose/화이트.webp", b"white-rose");
        seed(dir.path(), "rosejpg/흰색.jpg", b"white-rose");

        let mut args = args_for_root(dir.path());
        args.apply = true;
        args.publish = true;

        let run = run(&args).await.expect("run should succeed");
        let summary = run.applied.expect("apply summary");
        assert_eq!(summary.deleted, 1);
        assert_eq!(summary.failed, 0);

        assert!(dir.path().join("rose/wh.webp").exists());
        assert!(!dir.path().join("rosejpg/흰색.jpg").exists());
        assert!(dir.path().join("flora/catalog.json").exists());

        // A second pass over the converged tree needs no actions.
        let mut recheck = args_for_root(dir.path());
        recheck.prior = true;
        let second = run_second(&recheck).await;
        assert!(second.outcome.report.is_all_kept());
    }

    async fn run_second(args: &ReconcileArgs) -> ReconcileRun {
        run(args).await.expect("second run should succeed")
    }

    #[tokio::test]
    async fn missing_location_is_an_error() {
        let mut args = args_for_root(std::path::Path::new("/tmp"));
        args.root = None;
        let err = run(&args).await.expect_err("should fail without a location");
        assert!(err.to_string().contains("asset location"));
    }
}
