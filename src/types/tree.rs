use crate::error::{Error, Result};
use crate::types::{ByteRange, FileRecord};

/// id of the root directory
pub const ROOT_ID: u16 = 0;

/// directory ids are 12 bits wide in name-table records
pub const MAX_DIRECTORIES: usize = 0x1000;

/// longest name a record length byte can describe
pub const MAX_NAME_LEN: usize = 0x7F;

/// a file inside a directory
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    /// allocation id; assigned during layout for scanned trees
    pub id: u32,
    pub range: ByteRange,
}

impl FileEntry {
    pub fn new(name: impl Into<String>, id: u32, range: ByteRange) -> Self {
        Self {
            name: name.into(),
            id,
            range,
        }
    }
}

/// a directory of the virtual tree
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectoryNode {
    pub id: u16,
    /// parent directory id; the root is its own parent
    pub parent: u16,
    /// empty for the root
    pub name: String,
    /// files in record order
    pub files: Vec<FileEntry>,
    /// child directory ids in record order
    pub children: Vec<u16>,
}

impl DirectoryNode {
    pub(crate) fn new(id: u16, parent: u16, name: impl Into<String>) -> Self {
        Self {
            id,
            parent,
            name: name.into(),
            files: vec![],
            children: vec![],
        }
    }

    pub fn is_root(&self) -> bool {
        self.id == ROOT_ID
    }
}

/// directory tree stored as an arena indexed by directory id
///
/// ids are dense: a tree with `n` directories uses exactly `0..n`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectoryTree {
    nodes: Vec<DirectoryNode>,
}

impl Default for DirectoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectoryTree {
    /// create a tree holding only the root directory
    pub fn new() -> Self {
        Self {
            nodes: vec![DirectoryNode::new(ROOT_ID, ROOT_ID, "")],
        }
    }

    /// wrap nodes whose links were already validated
    pub(crate) fn from_nodes(nodes: Vec<DirectoryNode>) -> Self {
        debug_assert!(nodes.iter().enumerate().all(|(i, n)| n.id as usize == i));
        Self { nodes }
    }

    pub fn root(&self) -> &DirectoryNode {
        &self.nodes[ROOT_ID as usize]
    }

    pub fn get(&self, id: u16) -> Option<&DirectoryNode> {
        self.nodes.get(id as usize)
    }

    pub(crate) fn get_mut(&mut self, id: u16) -> Option<&mut DirectoryNode> {
        self.nodes.get_mut(id as usize)
    }

    /// number of directories, root included
    pub fn directory_count(&self) -> usize {
        self.nodes.len()
    }

    /// number of files in the whole tree
    pub fn file_count(&self) -> usize {
        self.nodes.iter().map(|n| n.files.len()).sum()
    }

    /// nodes in id order
    pub fn nodes(&self) -> &[DirectoryNode] {
        &self.nodes
    }

    /// add a subdirectory under `parent`, assigning it the next free id
    pub fn add_child(&mut self, parent: u16, name: impl Into<String>) -> Result<u16> {
        let name = name.into();
        validate_entry_name(&name)?;
        if self.get(parent).is_none() {
            return Err(Error::InvalidEntryName(format!(
                "parent directory {} does not exist for {}",
                parent, name
            )));
        }
        if self.contains_name(parent, &name) {
            return Err(Error::DuplicateEntryName(self.entry_path(parent, &name)));
        }
        if self.nodes.len() >= MAX_DIRECTORIES {
            return Err(Error::TooManyDirectories(MAX_DIRECTORIES));
        }

        let id = self.nodes.len() as u16;
        self.nodes.push(DirectoryNode::new(id, parent, name));
        self.nodes[parent as usize].children.push(id);
        Ok(id)
    }

    /// add a file to directory `dir`
    pub fn add_file(&mut self, dir: u16, name: impl Into<String>, range: ByteRange) -> Result<()> {
        let name = name.into();
        validate_entry_name(&name)?;
        if self.contains_name(dir, &name) {
            return Err(Error::DuplicateEntryName(self.entry_path(dir, &name)));
        }
        let node = self.nodes.get_mut(dir as usize).ok_or_else(|| {
            Error::InvalidEntryName(format!("directory {} does not exist for {}", dir, name))
        })?;
        node.files.push(FileEntry::new(name, 0, range));
        Ok(())
    }

    /// whether directory `dir` already has a file or subdirectory called `name`
    pub fn contains_name(&self, dir: u16, name: &str) -> bool {
        let Some(node) = self.get(dir) else {
            return false;
        };
        node.files.iter().any(|f| f.name == name)
            || node
                .children
                .iter()
                .filter_map(|&id| self.get(id))
                .any(|child| child.name == name)
    }

    fn entry_path(&self, dir: u16, name: &str) -> String {
        join_path(&self.path_of(dir), name)
    }

    /// pre-order traversal: a directory, then (through the caller) its files,
    /// then each child directory's subtree in record order
    ///
    /// this order assigns file ids, lays out payloads and emits sub-tables.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            tree: self,
            stack: vec![ROOT_ID],
        }
    }

    /// ids in traversal order
    pub fn walk_ids(&self) -> Vec<u16> {
        self.walk().map(|n| n.id).collect()
    }

    /// `/`-separated path of a directory relative to the root; empty for the root
    pub fn path_of(&self, id: u16) -> String {
        let mut parts = Vec::new();
        let mut current = id;
        // bounded by the node count so a malformed parent chain cannot loop
        for _ in 0..self.nodes.len() {
            let node = match self.get(current) {
                Some(node) if !node.is_root() => node,
                _ => break,
            };
            parts.push(node.name.as_str());
            current = node.parent;
        }
        parts.reverse();
        parts.join("/")
    }

    /// every file with its full path, in traversal order
    pub fn files(&self) -> Vec<FileRecord> {
        let mut records = Vec::with_capacity(self.file_count());
        for node in self.walk() {
            let prefix = self.path_of(node.id);
            for file in &node.files {
                records.push(FileRecord::new(
                    join_path(&prefix, &file.name),
                    file.id,
                    file.range,
                ));
            }
        }
        records
    }

    /// every non-root directory path, in traversal order
    pub fn directory_paths(&self) -> Vec<String> {
        self.walk()
            .filter(|n| !n.is_root())
            .map(|n| self.path_of(n.id))
            .collect()
    }
}

/// pre-order iterator driven by an explicit stack
pub struct Walk<'a> {
    tree: &'a DirectoryTree,
    stack: Vec<u16>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a DirectoryNode;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = self.tree.get(id)?;
        // reversed so the first child is visited first
        self.stack.extend(node.children.iter().rev().copied());
        Some(node)
    }
}

pub(crate) fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

/// validate a file or directory name
pub fn validate_entry_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidEntryName("empty name".to_string()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(Error::NameTooLong(name.to_string()));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(Error::InvalidEntryName(format!(
            "name contains a path separator: {}",
            name
        )));
    }
    if name.contains('\0') {
        return Err(Error::InvalidEntryName(format!(
            "name contains null byte: {}",
            name
        )));
    }
    if name == "." || name == ".." {
        return Err(Error::InvalidEntryName(format!("reserved name: {}", name)));
    }
    Ok(())
}
