//! Parser-plugin boundary: file snapshots in, structural trees out
//!
//! Language front ends live outside the core. They implement
//! [`LanguagePlugin`] and may skip files they cannot analyze, reporting them
//! as warnings next to a partial tree. [`CstJsonPlugin`] reads trees that a
//! front end has already extracted into `*.cst.json` files.

use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::error::{DiffError, ParseError, Result};
use crate::model::{Location, NodeId, NodeKind, Signature};
use crate::tree::{NodeSpec, Tree, TreeBuilder};

/// Suffix of pre-extracted structural tree files.
pub const CST_SUFFIX: &str = ".cst.json";

/// Source files of one snapshot, keyed by path relative to the snapshot root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    files: BTreeMap<PathBuf, String>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.files.insert(path.into(), content.into());
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Files in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.files.iter().map(|(path, content)| (path.as_path(), content.as_str()))
    }

    /// Load a snapshot from a single file or a directory tree, keeping the
    /// files `accept` selects. Hidden entries are skipped.
    pub fn load(root: &Path, accept: impl Fn(&Path) -> bool) -> Result<Self> {
        let mut files = FileSet::new();

        if root.is_file() {
            let name = root.file_name().map(PathBuf::from).unwrap_or_else(|| root.to_path_buf());
            files.insert(name, read(root)?);
            return Ok(files);
        }

        let mut queue = VecDeque::from([root.to_path_buf()]);
        while let Some(dir) = queue.pop_front() {
            trace!("Scanning directory: {}", dir.display());
            let entries = fs::read_dir(&dir).map_err(|source| DiffError::Io {
                path: dir.clone(),
                source,
            })?;

            for entry in entries {
                let entry = entry.map_err(|source| DiffError::Io {
                    path: dir.clone(),
                    source,
                })?;
                if entry.file_name().to_string_lossy().starts_with('.') {
                    continue;
                }
                let path = entry.path();
                if path.is_dir() {
                    queue.push_back(path);
                } else if path.is_file() && accept(&path) {
                    let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
                    files.insert(relative, read(&path)?);
                }
            }
        }

        debug!(files = files.len(), "Loaded snapshot from {}", root.display());
        Ok(files)
    }
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| DiffError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// A tree built from a snapshot plus the files that had to be skipped.
#[derive(Debug, Clone, Default)]
pub struct ParsedTree {
    pub tree: Tree,
    pub warnings: Vec<ParseError>,
}

/// A language front end.
pub trait LanguagePlugin: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this plugin analyzes the file at `path`.
    fn accepts(&self, path: &Path) -> bool;

    /// Build one tree for the whole snapshot. Unanalyzable files become
    /// warnings unless the plugin is configured to fail on them.
    fn build_tree(&self, files: &FileSet) -> Result<ParsedTree>;

    /// Load `root` and build its tree.
    fn load_snapshot(&self, root: &Path) -> Result<ParsedTree> {
        let files = FileSet::load(root, |path| self.accepts(path))?;
        self.build_tree(&files)
    }
}

/// One `*.cst.json` file: the declarations of a single source file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CstFile {
    /// Package or module of the file's top-level declarations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default)]
    pub declarations: Vec<CstDeclaration>,
}

/// A declaration as written by a front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CstDeclaration {
    pub kind: NodeKind,
    pub name: String,
    /// Index of the enclosing declaration within the same file. Containers
    /// precede their members.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<usize>,
    /// Parameter types of a method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<String>>,
    #[serde(default)]
    pub body: Vec<String>,
    /// Qualified names of declared supertypes, resolved across the snapshot.
    #[serde(default)]
    pub supertypes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_start: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_end: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub byte_start: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub byte_end: Option<u32>,
}

/// Reads pre-extracted structural trees from `*.cst.json` files.
#[derive(Debug, Clone, Default)]
pub struct CstJsonPlugin {
    strict: bool,
}

impl CstJsonPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail on the first unreadable file instead of skipping it.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    fn parse_file(path: &Path, content: &str) -> std::result::Result<CstFile, ParseError> {
        let file: CstFile =
            serde_json::from_str(content).map_err(|e| ParseError::new(path, e.to_string()))?;

        for (position, declaration) in file.declarations.iter().enumerate() {
            if let Some(container) = declaration.container {
                if container >= position {
                    return Err(ParseError::new(
                        path,
                        format!(
                            "declaration {position} ({}) names container {container}, which does not precede it",
                            declaration.name
                        ),
                    ));
                }
            }
            if declaration.name.is_empty() {
                return Err(ParseError::new(path, format!("declaration {position} has no name")));
            }
        }
        Ok(file)
    }
}

impl LanguagePlugin for CstJsonPlugin {
    fn name(&self) -> &'static str {
        "cst-json"
    }

    fn accepts(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(CST_SUFFIX))
    }

    fn build_tree(&self, files: &FileSet) -> Result<ParsedTree> {
        let mut builder = TreeBuilder::new();
        let mut warnings = Vec::new();
        let mut pending_supertypes: Vec<(NodeId, String)> = Vec::new();

        for (path, content) in files.iter() {
            if !self.accepts(path) {
                continue;
            }
            let file = match Self::parse_file(path, content) {
                Ok(file) => file,
                Err(error) if self.strict => return Err(error.into()),
                Err(error) => {
                    warn!("{error}");
                    warnings.push(error);
                    continue;
                }
            };

            let offset = builder.len();
            for declaration in file.declarations {
                let mut spec = NodeSpec::new(declaration.kind, declaration.name).with_body(declaration.body);
                spec.location = Location {
                    file_path: path.to_path_buf(),
                    line_start: declaration.line_start,
                    line_end: declaration.line_end,
                    byte_start: declaration.byte_start,
                    byte_end: declaration.byte_end,
                };
                match declaration.container {
                    Some(local) => spec.container = Some(NodeId::from(offset + local)),
                    None => spec.namespace = file.namespace.clone(),
                }
                if declaration.kind == NodeKind::Method {
                    spec.signature = Some(Signature(declaration.params.unwrap_or_default()));
                }

                let id = builder.add(spec);
                pending_supertypes.extend(declaration.supertypes.into_iter().map(|name| (id, name)));
            }
        }

        // First declaration wins when several types share a qualified name.
        let mut types: BTreeMap<String, NodeId> = BTreeMap::new();
        for id in (0..builder.len()).map(NodeId::from) {
            if builder.kind(id).is_some_and(NodeKind::is_type) {
                if let Some(name) = builder.qualified_name(id) {
                    types.entry(name).or_insert(id);
                }
            }
        }

        for (sub, name) in pending_supertypes {
            let sub_is_type = builder.kind(sub).is_some_and(NodeKind::is_type);
            match types.get(&name) {
                Some(&sup) if sub_is_type && sup != sub => {
                    builder.add_supertype(sub, sup);
                }
                _ => trace!(%sub, supertype = %name, "Dropping external supertype"),
            }
        }

        let tree = builder.build()?;
        debug!(
            plugin = self.name(),
            nodes = tree.len(),
            warnings = warnings.len(),
            "Built tree"
        );
        Ok(ParsedTree { tree, warnings })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHAPES: &str = r#"{
        "namespace": "geo",
        "declarations": [
            {"kind": "Type", "name": "Shape"},
            {"kind": "Method", "name": "area", "container": 0, "params": [], "body": ["return", "0"]},
            {"kind": "Type", "name": "Circle", "supertypes": ["geo.Shape", "java.io.Serializable"]},
            {"kind": "Field", "name": "radius", "container": 2, "line_start": 4, "line_end": 4}
        ]
    }"#;

    #[test]
    fn test_builds_tree_with_resolved_supertypes() {
        let mut files = FileSet::new();
        files.insert("geo/Shapes.cst.json", SHAPES);
        files.insert("README.md", "not a tree");

        let parsed = CstJsonPlugin::new().build_tree(&files).unwrap();
        let tree = &parsed.tree;
        assert!(parsed.warnings.is_empty());
        assert_eq!(tree.len(), 4);
        assert_eq!(tree[NodeId(1)].display_name(), "geo.Shape.area()");
        assert_eq!(tree[NodeId(3)].qualified_name, "geo.Circle.radius");
        assert_eq!(tree[NodeId(3)].location.line_start, Some(4));
        assert_eq!(tree.supertypes(NodeId(2)), vec![NodeId(0)]);
        assert_eq!(tree.subtypes(NodeId(0)), vec![NodeId(2)]);
    }

    #[test]
    fn test_supertypes_resolve_across_files() {
        let mut files = FileSet::new();
        files.insert("a.cst.json", r#"{"declarations": [{"kind": "Type", "name": "Sub", "supertypes": ["Base"]}]}"#);
        files.insert("b.cst.json", r#"{"declarations": [{"kind": "Type", "name": "Base"}]}"#);

        let parsed = CstJsonPlugin::new().build_tree(&files).unwrap();
        assert_eq!(parsed.tree.supertypes(NodeId(0)), vec![NodeId(1)]);
    }

    #[test]
    fn test_unparsable_files_become_warnings() {
        let mut files = FileSet::new();
        files.insert("good.cst.json", SHAPES);
        files.insert("broken.cst.json", "{ not json");
        files.insert(
            "forward.cst.json",
            r#"{"declarations": [{"kind": "Field", "name": "x", "container": 1}, {"kind": "Type", "name": "T"}]}"#,
        );

        let parsed = CstJsonPlugin::new().build_tree(&files).unwrap();
        assert_eq!(parsed.tree.len(), 4);
        let mut skipped: Vec<_> = parsed.warnings.iter().map(|w| w.file.clone()).collect();
        skipped.sort();
        assert_eq!(skipped, vec![PathBuf::from("broken.cst.json"), PathBuf::from("forward.cst.json")]);

        let strict = CstJsonPlugin::new().strict(true).build_tree(&files);
        assert!(matches!(strict, Err(DiffError::Parse(_))));
    }

    #[test]
    fn test_load_directory_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("geo")).unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join("geo/Shapes.cst.json"), SHAPES).unwrap();
        fs::write(dir.path().join(".git/ignored.cst.json"), SHAPES).unwrap();
        fs::write(dir.path().join("notes.txt"), "skip me").unwrap();

        let plugin = CstJsonPlugin::new();
        let files = FileSet::load(dir.path(), |path| plugin.accepts(path)).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files.iter().next().unwrap().0, Path::new("geo/Shapes.cst.json"));

        let parsed = plugin.load_snapshot(dir.path()).unwrap();
        assert_eq!(parsed.tree.len(), 4);

        let single = plugin.load_snapshot(&dir.path().join("geo/Shapes.cst.json")).unwrap();
        assert_eq!(single.tree.len(), 4);
    }

    #[test]
    fn test_missing_snapshot_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = CstJsonPlugin::new().load_snapshot(&dir.path().join("absent"));
        assert!(matches!(result, Err(DiffError::Io { .. })));
    }
}
