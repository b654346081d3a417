use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::warn;

/// Derived views appended after the real categories from the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Synthetic {
    Favorites,
    Recent,
}

#[derive(Debug, Clone)]
pub struct Category {
    pub display_name: String,
    pub storage_key: String,
    pub synthetic: Option<Synthetic>,
}

/// Round-trippable reference to an action, serialized as `<category_key>|<unit_stem>`.
/// This is the form stored in the favorites and recent files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRef {
    pub category_key: String,
    pub unit_stem: String,
}

impl ActionRef {
    #[must_use]
    pub fn serialize(&self) -> String {
        format!("{}|{}", self.category_key, self.unit_stem)
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let (key, stem) = s.trim().split_once('|')?;
        if key.is_empty() || stem.is_empty() {
            return None;
        }
        Some(Self {
            category_key: key.to_string(),
            unit_stem: stem.to_string(),
        })
    }
}

impl std::fmt::Display for ActionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}|{}", self.category_key, self.unit_stem)
    }
}

/// One loaded unit. Immutable; lists are rebuilt on every category change.
#[derive(Debug, Clone)]
pub struct Action {
    pub description: String,
    pub source_file: PathBuf,
    pub destructive: bool,
    pub dependencies: Vec<String>,
    pub long_description: String,
    pub reference: ActionRef,
}

impl Action {
    /// Shell invocation for the unit's `run` entry point. The unit is sourced
    /// and only `run` is called; no other symbol is relied upon.
    #[must_use]
    pub fn entry_command(&self) -> String {
        format!(". '{}' && run", self.source_file.display())
    }
}

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    categories: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    name: String,
    key: String,
}

pub const RECENT_CAP: usize = 10;

const MANIFEST_FILE: &str = "categories.toml";
const UNIT_EXT: &str = "sh";

/// Directory-backed store for categories, actions, favorites, recent and config.
#[derive(Debug, Clone)]
pub struct Catalog {
    root: PathBuf,
}

impl Catalog {
    /// Opens the store rooted at `root`, writing a minimal scaffold (manifest
    /// plus sample units) if no manifest exists yet.
    ///
    /// # Errors
    /// Returns error if the directory tree or scaffold cannot be created.
    pub fn open(root: PathBuf) -> Result<Self> {
        let catalog = Self { root };
        fs::create_dir_all(catalog.actions_dir())
            .with_context(|| format!("creating {}", catalog.actions_dir().display()))?;
        if !catalog.manifest_path().exists() {
            catalog.scaffold()?;
        }
        Ok(catalog)
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn actions_dir(&self) -> PathBuf {
        self.root.join("actions")
    }

    fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    fn favorites_path(&self) -> PathBuf {
        self.root.join("favorites")
    }

    fn recent_path(&self) -> PathBuf {
        self.root.join("recent")
    }

    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.root.join("config")
    }

    #[must_use]
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Manifest categories in file order, with the synthetic Favorites and
    /// Recent views appended.
    ///
    /// # Errors
    /// Returns error if the manifest cannot be read or parsed.
    pub fn load_categories(&self) -> Result<Vec<Category>> {
        let raw = fs::read_to_string(self.manifest_path())
            .with_context(|| format!("reading {}", self.manifest_path().display()))?;
        let manifest: Manifest = toml::from_str(&raw)
            .with_context(|| format!("parsing {}", self.manifest_path().display()))?;
        let mut out: Vec<Category> = manifest
            .categories
            .into_iter()
            .map(|e| Category {
                display_name: e.name,
                storage_key: e.key,
                synthetic: None,
            })
            .collect();
        out.push(Category {
            display_name: "Favorites".to_string(),
            storage_key: "favorites".to_string(),
            synthetic: Some(Synthetic::Favorites),
        });
        out.push(Category {
            display_name: "Recent".to_string(),
            storage_key: "recent".to_string(),
            synthetic: Some(Synthetic::Recent),
        });
        Ok(out)
    }

    /// Actions for one category. Synthetic categories resolve their stored
    /// references; stale references are dropped silently. A missing category
    /// directory yields an empty list, and a unit that fails to parse is
    /// skipped without aborting the rest.
    #[must_use]
    pub fn load_actions(&self, category: &Category) -> Vec<Action> {
        match category.synthetic {
            Some(Synthetic::Favorites) => self.resolve_refs(&self.favorites()),
            Some(Synthetic::Recent) => self.resolve_refs(&self.recent()),
            None => self.load_unit_dir(&category.storage_key),
        }
    }

    fn resolve_refs(&self, refs: &[ActionRef]) -> Vec<Action> {
        refs.iter().filter_map(|r| self.load_action(r)).collect()
    }

    fn load_unit_dir(&self, storage_key: &str) -> Vec<Action> {
        let dir = self.actions_dir().join(storage_key);
        let entries = match fs::read_dir(&dir) {
            Ok(e) => e,
            Err(_) => return Vec::new(),
        };
        let mut files: Vec<PathBuf> = entries
            .filter_map(std::result::Result::ok)
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(UNIT_EXT))
            .collect();
        // Stable order across repeated loads within one run.
        files.sort();
        let mut out = Vec::with_capacity(files.len());
        for path in files {
            match self.load_unit(storage_key, &path) {
                Some(action) => out.push(action),
                None => warn!(unit = %path.display(), "skipping unparsable unit file"),
            }
        }
        out
    }

    /// Resolves a stored reference back to a live action, or `None` if the
    /// unit no longer exists or no longer parses.
    #[must_use]
    pub fn load_action(&self, reference: &ActionRef) -> Option<Action> {
        let path = self
            .actions_dir()
            .join(&reference.category_key)
            .join(format!("{}.{UNIT_EXT}", reference.unit_stem));
        self.load_unit(&reference.category_key, &path)
    }

    fn load_unit(&self, storage_key: &str, path: &Path) -> Option<Action> {
        let stem = path.file_stem()?.to_str()?.to_string();
        let meta = parse_unit(path)?;
        Some(Action {
            description: meta.description,
            source_file: path.to_path_buf(),
            destructive: meta.destructive,
            dependencies: meta.dependencies,
            long_description: meta.long_description,
            reference: ActionRef {
                category_key: storage_key.to_string(),
                unit_stem: stem,
            },
        })
    }

    #[must_use]
    pub fn favorites(&self) -> Vec<ActionRef> {
        read_ref_file(&self.favorites_path())
    }

    #[must_use]
    pub fn is_favorite(&self, reference: &ActionRef) -> bool {
        self.favorites().contains(reference)
    }

    /// Removes the reference if present, appends it otherwise. Returns whether
    /// the action is favorited afterwards.
    ///
    /// # Errors
    /// Returns error if the favorites file cannot be rewritten.
    pub fn toggle_favorite(&self, reference: &ActionRef) -> Result<bool> {
        let mut refs = self.favorites();
        let now_favorite = if let Some(pos) = refs.iter().position(|r| r == reference) {
            refs.remove(pos);
            false
        } else {
            refs.push(reference.clone());
            true
        };
        write_ref_file(&self.favorites_path(), &refs)?;
        Ok(now_favorite)
    }

    #[must_use]
    pub fn recent(&self) -> Vec<ActionRef> {
        read_ref_file(&self.recent_path())
    }

    /// Moves the reference to the front of the recent list, de-duplicating and
    /// capping at [`RECENT_CAP`] entries.
    ///
    /// # Errors
    /// Returns error if the recent file cannot be rewritten.
    pub fn record_recent(&self, reference: &ActionRef) -> Result<()> {
        let mut refs = self.recent();
        refs.retain(|r| r != reference);
        refs.insert(0, reference.clone());
        refs.truncate(RECENT_CAP);
        write_ref_file(&self.recent_path(), &refs)
    }

    /// Sample categories and units written on first run so the menu is never
    /// empty.
    fn scaffold(&self) -> Result<()> {
        let manifest = "\
[[categories]]
name = \"System\"
key = \"system\"

[[categories]]
name = \"Cleanup\"
key = \"cleanup\"
";
        fs::write(self.manifest_path(), manifest)
            .with_context(|| format!("writing {}", self.manifest_path().display()))?;

        let system = self.actions_dir().join("system");
        fs::create_dir_all(&system)?;
        fs::write(
            system.join("show_info.sh"),
            "\
DESCRIPTION=\"Show system information\"
DESTRUCTIVE=false
DEPENDENCIES=\"uname df\"
LONG_DESCRIPTION=\"Kernel, uptime and disk usage at a glance.\"

run() {
    uname -a
    uptime
    df -h
}
",
        )?;

        let cleanup = self.actions_dir().join("cleanup");
        fs::create_dir_all(&cleanup)?;
        fs::write(
            cleanup.join("clear_user_cache.sh"),
            "\
DESCRIPTION=\"Clear user cache directory\"
DESTRUCTIVE=true
DEPENDENCIES=\"rm du\"
LONG_DESCRIPTION=\"Removes everything under ~/.cache. Applications rebuild their caches on demand.\"

run() {
    du -sh \"$HOME/.cache\" 2>/dev/null
    rm -rf \"$HOME/.cache\"/*
    echo \"cache cleared\"
}
",
        )?;
        Ok(())
    }
}

/// All actions across real categories whose description contains `term` as a
/// case-sensitive substring. An empty term matches nothing, not everything.
#[must_use]
pub fn search_actions(catalog: &Catalog, categories: &[Category], term: &str) -> Vec<Action> {
    if term.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::new();
    for category in categories.iter().filter(|c| c.synthetic.is_none()) {
        for action in catalog.load_actions(category) {
            if action.description.contains(term) {
                out.push(action);
            }
        }
    }
    out
}

#[derive(Debug, Default)]
struct UnitMeta {
    description: String,
    destructive: bool,
    dependencies: Vec<String>,
    long_description: String,
}

/// Extracts unit metadata by scanning top-level `KEY=value` lines. The file is
/// never evaluated; scanning stops at the `run()` definition so bindings inside
/// the function body are ignored. Returns `None` when `DESCRIPTION` is missing
/// or empty, which callers treat as "skip this unit".
fn parse_unit(path: &Path) -> Option<UnitMeta> {
    let raw = fs::read_to_string(path).ok()?;
    let mut meta = UnitMeta::default();
    let mut has_run = false;
    for line in raw.lines() {
        let line = line.trim();
        if line.starts_with("run()") || line.starts_with("run ()") {
            has_run = true;
            break;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = unquote(value);
        match key {
            "DESCRIPTION" => meta.description = value,
            "DESTRUCTIVE" => meta.destructive = parse_bool(&value),
            "DEPENDENCIES" => {
                meta.dependencies = value.split_whitespace().map(str::to_string).collect();
            }
            "LONG_DESCRIPTION" => meta.long_description = value,
            _ => {}
        }
    }
    if !has_run || meta.description.is_empty() {
        return None;
    }
    Some(meta)
}

fn unquote(value: &str) -> String {
    let v = value.trim();
    let v = v
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| v.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
        .unwrap_or(v);
    v.to_string()
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "true" | "yes" | "1" | "y"
    )
}

fn read_ref_file(path: &Path) -> Vec<ActionRef> {
    let Ok(raw) = fs::read_to_string(path) else {
        return Vec::new();
    };
    raw.lines().filter_map(ActionRef::parse).collect()
}

/// Whole-file rewrite through a temp file + rename so a crash mid-write leaves
/// either the old or the new contents, never a torn file.
fn write_ref_file(path: &Path, refs: &[ActionRef]) -> Result<()> {
    let mut body = String::new();
    for r in refs {
        body.push_str(&r.serialize());
        body.push('\n');
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, body).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}
