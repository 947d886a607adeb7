//! CLI command implementations

use anyhow::Context;
use refdelta_core::{
    diff_commits, CommitManifest, CstJsonPlugin, DiffConfig, DiffEngine, LanguagePlugin, ParsedTree,
};
use std::path::Path;

pub fn diff(config: Option<&Path>, before: &Path, after: &Path, json: bool) -> anyhow::Result<()> {
    let engine = engine(config)?;
    let plugin = CstJsonPlugin::new();

    let before_tree = load(&plugin, before)?;
    let after_tree = load(&plugin, after)?;
    tracing::info!(
        "Diffing {} ({} nodes) against {} ({} nodes)",
        before.display(),
        before_tree.len(),
        after.display(),
        after_tree.len()
    );

    let result = engine.compute(&before_tree, &after_tree);
    tracing::info!(
        "Matched {} nodes, {} removed, {} added, {} refactorings",
        result.matches.len(),
        result.unmatched_before.len(),
        result.unmatched_after.len(),
        result.relationships.len()
    );

    if json {
        println!("{}", result.to_json()?);
    } else {
        print!("{result}");
    }
    Ok(())
}

pub fn batch(config: Option<&Path>, manifest: &Path, json: bool) -> anyhow::Result<()> {
    let engine = engine(config)?;
    let manifest = CommitManifest::load(manifest)
        .with_context(|| format!("Failed to read manifest {}", manifest.display()))?;
    tracing::info!("Diffing {} commits", manifest.commits.len());

    let pairs = manifest.resolve(&CstJsonPlugin::new())?;
    let diffs = diff_commits(&engine, &pairs);

    if json {
        println!("{}", serde_json::to_string_pretty(&diffs)?);
    } else {
        for diff in &diffs {
            println!("commit {}", diff.commit);
            for description in diff.result.descriptions() {
                println!("  {description}");
            }
        }
    }
    Ok(())
}

pub fn inspect(snapshot: &Path) -> anyhow::Result<()> {
    let tree = load(&CstJsonPlugin::new(), snapshot)?;

    for node in tree.nodes() {
        let indent = "  ".repeat(tree.depth(node.id));
        let supertypes: Vec<String> = tree
            .supertypes(node.id)
            .into_iter()
            .map(|sup| tree[sup].qualified_name.clone())
            .collect();
        if supertypes.is_empty() {
            println!("{indent}{:?} {}", node.kind, node.display_name());
        } else {
            println!("{indent}{:?} {} : {}", node.kind, node.display_name(), supertypes.join(", "));
        }
    }
    Ok(())
}

fn engine(config: Option<&Path>) -> anyhow::Result<DiffEngine> {
    let config = match config {
        Some(path) => DiffConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => DiffConfig::default(),
    };
    Ok(DiffEngine::new(config)?)
}

/// Build a snapshot's tree, logging the files that had to be skipped.
fn load(plugin: &dyn LanguagePlugin, snapshot: &Path) -> anyhow::Result<refdelta_core::Tree> {
    let ParsedTree { tree, warnings } = plugin
        .load_snapshot(snapshot)
        .with_context(|| format!("Failed to load snapshot {}", snapshot.display()))?;
    for warning in &warnings {
        tracing::warn!("Skipped: {}", warning);
    }
    Ok(tree)
}
