//! WorkItemSet / DirectoryFilter
//!
//! repo config から得られる「directory → workspace 一覧」と、
//! allow-list によるディレクトリの絞り込み。

use std::collections::BTreeMap;

/// directory → 宣言済み workspace 名（宣言順）のマッピング
///
/// # 設計原則
/// - 実行中は immutable（両パスに `&WorkItemSet` で渡す）
/// - BTreeMap なので directory はソート済みで列挙される
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkItemSet {
    items: BTreeMap<String, Vec<String>>,
}

impl WorkItemSet {
    pub fn new() -> Self {
        Self {
            items: BTreeMap::new(),
        }
    }

    /// Add a workspace under `directory`. Duplicate names are ignored and
    /// declaration order is kept.
    pub fn insert(&mut self, directory: impl Into<String>, workspace: impl Into<String>) {
        let workspace = workspace.into();
        let workspaces = self.items.entry(directory.into()).or_default();
        if !workspaces.contains(&workspace) {
            workspaces.push(workspace);
        }
    }

    pub fn workspaces(&self, directory: &str) -> &[String] {
        self.items
            .get(directory)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Directories in lexicographic order.
    pub fn sorted_directories(&self) -> Vec<String> {
        self.items.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.items.iter()
    }

    pub fn total_workspaces(&self) -> usize {
        self.items.values().map(Vec::len).sum()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<D, W> FromIterator<(D, W)> for WorkItemSet
where
    D: Into<String>,
    W: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (D, W)>>(iter: I) -> Self {
        let mut set = WorkItemSet::new();
        for (directory, workspace) in iter {
            set.insert(directory, workspace);
        }
        set
    }
}

/// Substring allow-list over directory paths.
///
/// An empty allow-list processes every directory.
#[derive(Debug, Clone, Default)]
pub struct DirectoryFilter {
    allowlist: Vec<String>,
}

impl DirectoryFilter {
    pub fn new(allowlist: Vec<String>) -> Self {
        Self { allowlist }
    }

    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn should_skip(&self, directory: &str) -> bool {
        if self.allowlist.is_empty() {
            return false;
        }
        !self
            .allowlist
            .iter()
            .any(|pattern| directory.contains(pattern.as_str()))
    }
}
