//! Merkle-Patricia trie over a hash-addressed node store

use crate::account::BLANK_ROOT_HASH;
use crate::error::{DbError, DbResult};
use crate::traits::{KeyValueRead, KeyValueWrite};
use pyrite_crypto::keccak256;
use pyrite_primitives::H256;
use rlp::{Rlp, RlpStream};

/// Reference from a parent node to a child
#[derive(Clone, Debug, Default, PartialEq, Eq)]
enum ChildRef {
    #[default]
    Empty,
    /// Child stored in the node store under its keccak hash
    Hash(H256),
    /// Child whose encoding is shorter than 32 bytes, embedded in the parent
    Inline(Vec<u8>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Node {
    Blank,
    Leaf {
        path: Vec<u8>,
        value: Vec<u8>,
    },
    Extension {
        path: Vec<u8>,
        child: ChildRef,
    },
    Branch {
        children: [ChildRef; 16],
        value: Option<Vec<u8>>,
    },
}

fn bytes_to_nibbles(bytes: &[u8]) -> Vec<u8> {
    let mut nibbles = Vec::with_capacity(bytes.len() * 2);
    for byte in bytes {
        nibbles.push(byte >> 4);
        nibbles.push(byte & 0x0f);
    }
    nibbles
}

/// Hex-prefix encoding of a nibble path
fn encode_path(nibbles: &[u8], is_leaf: bool) -> Vec<u8> {
    let flag: u8 = if is_leaf { 2 } else { 0 };
    let mut out = Vec::with_capacity(nibbles.len() / 2 + 1);
    let rest = if nibbles.len() % 2 == 1 {
        out.push(((flag | 1) << 4) | nibbles[0]);
        &nibbles[1..]
    } else {
        out.push(flag << 4);
        nibbles
    };
    for pair in rest.chunks(2) {
        out.push((pair[0] << 4) | pair[1]);
    }
    out
}

fn decode_path(encoded: &[u8]) -> DbResult<(Vec<u8>, bool)> {
    let (first, rest) = encoded
        .split_first()
        .ok_or_else(|| DbError::Decode("empty hex-prefix path".into()))?;
    let flag = first >> 4;
    if flag > 3 {
        return Err(DbError::Decode(format!("bad hex-prefix flag {flag}")));
    }
    let mut nibbles = Vec::with_capacity(rest.len() * 2 + 1);
    if flag & 1 == 1 {
        nibbles.push(first & 0x0f);
    }
    nibbles.extend(bytes_to_nibbles(rest));
    Ok((nibbles, flag & 2 == 2))
}

fn common_prefix(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

fn append_child(stream: &mut RlpStream, child: &ChildRef) {
    match child {
        ChildRef::Empty => {
            stream.append_empty_data();
        }
        ChildRef::Hash(hash) => {
            stream.append(hash);
        }
        ChildRef::Inline(raw) => {
            stream.append_raw(raw, 1);
        }
    }
}

fn decode_child(item: &Rlp<'_>) -> DbResult<ChildRef> {
    if item.is_list() {
        return Ok(ChildRef::Inline(item.as_raw().to_vec()));
    }
    let data = item.data()?;
    match data.len() {
        0 => Ok(ChildRef::Empty),
        32 => Ok(ChildRef::Hash(H256::from_slice(data)?)),
        n => Err(DbError::Decode(format!("bad child reference length {n}"))),
    }
}

impl Node {
    fn encode(&self) -> Vec<u8> {
        match self {
            Node::Blank => rlp::NULL_RLP.to_vec(),
            Node::Leaf { path, value } => {
                let mut stream = RlpStream::new_list(2);
                stream.append(&encode_path(path, true));
                stream.append(value);
                stream.out().to_vec()
            }
            Node::Extension { path, child } => {
                let mut stream = RlpStream::new_list(2);
                stream.append(&encode_path(path, false));
                append_child(&mut stream, child);
                stream.out().to_vec()
            }
            Node::Branch { children, value } => {
                let mut stream = RlpStream::new_list(17);
                for child in children {
                    append_child(&mut stream, child);
                }
                match value {
                    Some(value) => stream.append(value),
                    None => stream.append_empty_data(),
                };
                stream.out().to_vec()
            }
        }
    }

    fn decode(raw: &[u8]) -> DbResult<Node> {
        let rlp = Rlp::new(raw);
        if !rlp.is_list() {
            return match rlp.data()? {
                [] => Ok(Node::Blank),
                _ => Err(DbError::Decode("trie node is not a list".into())),
            };
        }
        match rlp.item_count()? {
            2 => {
                let (path, is_leaf) = decode_path(rlp.at(0)?.data()?)?;
                if is_leaf {
                    Ok(Node::Leaf {
                        path,
                        value: rlp.at(1)?.data()?.to_vec(),
                    })
                } else {
                    Ok(Node::Extension {
                        path,
                        child: decode_child(&rlp.at(1)?)?,
                    })
                }
            }
            17 => {
                let mut children: [ChildRef; 16] = Default::default();
                for (i, child) in children.iter_mut().enumerate() {
                    *child = decode_child(&rlp.at(i)?)?;
                }
                let value = rlp.at(16)?.data()?;
                Ok(Node::Branch {
                    children,
                    value: (!value.is_empty()).then(|| value.to_vec()),
                })
            }
            n => Err(DbError::Decode(format!("trie node with {n} items"))),
        }
    }
}

/// Hexary Merkle-Patricia trie.
///
/// Nodes are stored in `db` under the keccak hash of their RLP encoding; nodes whose
/// encoding is shorter than 32 bytes are embedded in their parent. Old nodes are never
/// removed, so any earlier root stays readable.
#[derive(Debug)]
pub struct HexaryTrie<D> {
    db: D,
    root: H256,
}

impl<D> HexaryTrie<D> {
    /// Open the trie rooted at `root`
    pub fn new(db: D, root: H256) -> Self {
        Self { db, root }
    }

    /// Open an empty trie
    pub fn empty(db: D) -> Self {
        Self::new(db, BLANK_ROOT_HASH)
    }

    /// Current root hash
    pub fn root_hash(&self) -> H256 {
        self.root
    }

    /// Point the trie at another root
    pub fn set_root_hash(&mut self, root: H256) {
        self.root = root;
    }

    /// The node store
    pub fn db(&self) -> &D {
        &self.db
    }

    /// The node store, mutably
    pub fn db_mut(&mut self) -> &mut D {
        &mut self.db
    }
}

impl<D: KeyValueRead> HexaryTrie<D> {
    fn load_hash(&self, hash: &H256) -> DbResult<Node> {
        if *hash == BLANK_ROOT_HASH {
            return Ok(Node::Blank);
        }
        let raw = self
            .db
            .get(hash.as_bytes())?
            .ok_or(DbError::MissingTrieNode(*hash))?;
        Node::decode(&raw)
    }

    fn load(&self, child: &ChildRef) -> DbResult<Node> {
        match child {
            ChildRef::Empty => Ok(Node::Blank),
            ChildRef::Hash(hash) => self.load_hash(hash),
            ChildRef::Inline(raw) => Node::decode(raw),
        }
    }

    /// Look up `key`
    pub fn get(&self, key: &[u8]) -> DbResult<Option<Vec<u8>>> {
        let path = bytes_to_nibbles(key);
        let mut rest = path.as_slice();
        let mut node = self.load_hash(&self.root)?;
        loop {
            match node {
                Node::Blank => return Ok(None),
                Node::Leaf { path, value } => {
                    return Ok((path == rest).then_some(value));
                }
                Node::Extension { path, child } => {
                    if !rest.starts_with(&path) {
                        return Ok(None);
                    }
                    rest = &rest[path.len()..];
                    node = self.load(&child)?;
                }
                Node::Branch { children, value } => match rest.split_first() {
                    None => return Ok(value),
                    Some((index, tail)) => {
                        node = self.load(&children[*index as usize])?;
                        rest = tail;
                    }
                },
            }
        }
    }

    /// Whether `key` is present
    pub fn exists(&self, key: &[u8]) -> DbResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}

impl<D: KeyValueRead + KeyValueWrite> HexaryTrie<D> {
    /// Insert or replace `key`. An empty value deletes the key.
    pub fn set(&mut self, key: &[u8], value: Vec<u8>) -> DbResult<()> {
        if value.is_empty() {
            return self.delete(key);
        }
        let root = self.load_hash(&self.root)?;
        let updated = self.insert(root, &bytes_to_nibbles(key), value)?;
        self.root = self.store_root(updated)?;
        Ok(())
    }

    /// Remove `key`; removing an absent key leaves the root unchanged
    pub fn delete(&mut self, key: &[u8]) -> DbResult<()> {
        let root = self.load_hash(&self.root)?;
        let updated = self.remove(root, &bytes_to_nibbles(key))?;
        self.root = self.store_root(updated)?;
        Ok(())
    }

    fn store(&mut self, node: Node) -> DbResult<ChildRef> {
        if node == Node::Blank {
            return Ok(ChildRef::Empty);
        }
        let encoded = node.encode();
        if encoded.len() < 32 {
            return Ok(ChildRef::Inline(encoded));
        }
        let hash = keccak256(&encoded);
        self.db.set(hash.as_bytes(), encoded)?;
        Ok(ChildRef::Hash(hash))
    }

    // The root is always stored by hash, however short its encoding.
    fn store_root(&mut self, node: Node) -> DbResult<H256> {
        if node == Node::Blank {
            return Ok(BLANK_ROOT_HASH);
        }
        let encoded = node.encode();
        let hash = keccak256(&encoded);
        self.db.set(hash.as_bytes(), encoded)?;
        Ok(hash)
    }

    fn insert(&mut self, node: Node, path: &[u8], value: Vec<u8>) -> DbResult<Node> {
        match node {
            Node::Blank => Ok(Node::Leaf {
                path: path.to_vec(),
                value,
            }),
            Node::Leaf {
                path: leaf_path,
                value: leaf_value,
            } => {
                let common = common_prefix(&leaf_path, path);
                if common == leaf_path.len() && common == path.len() {
                    return Ok(Node::Leaf {
                        path: leaf_path,
                        value,
                    });
                }
                let mut children: [ChildRef; 16] = Default::default();
                let mut branch_value = None;
                if common == leaf_path.len() {
                    branch_value = Some(leaf_value);
                } else {
                    children[leaf_path[common] as usize] = self.store(Node::Leaf {
                        path: leaf_path[common + 1..].to_vec(),
                        value: leaf_value,
                    })?;
                }
                if common == path.len() {
                    branch_value = Some(value);
                } else {
                    children[path[common] as usize] = self.store(Node::Leaf {
                        path: path[common + 1..].to_vec(),
                        value,
                    })?;
                }
                self.wrap_in_extension(&path[..common], Node::Branch {
                    children,
                    value: branch_value,
                })
            }
            Node::Extension {
                path: ext_path,
                child,
            } => {
                let common = common_prefix(&ext_path, path);
                if common == ext_path.len() {
                    let child_node = self.load(&child)?;
                    let updated = self.insert(child_node, &path[common..], value)?;
                    return Ok(Node::Extension {
                        path: ext_path,
                        child: self.store(updated)?,
                    });
                }
                let mut children: [ChildRef; 16] = Default::default();
                let remainder = &ext_path[common + 1..];
                children[ext_path[common] as usize] = if remainder.is_empty() {
                    child
                } else {
                    self.store(Node::Extension {
                        path: remainder.to_vec(),
                        child,
                    })?
                };
                let mut branch_value = None;
                if common == path.len() {
                    branch_value = Some(value);
                } else {
                    children[path[common] as usize] = self.store(Node::Leaf {
                        path: path[common + 1..].to_vec(),
                        value,
                    })?;
                }
                self.wrap_in_extension(&path[..common], Node::Branch {
                    children,
                    value: branch_value,
                })
            }
            Node::Branch {
                mut children,
                value: branch_value,
            } => match path.split_first() {
                None => Ok(Node::Branch {
                    children,
                    value: Some(value),
                }),
                Some((index, tail)) => {
                    let slot = *index as usize;
                    let child_node = self.load(&children[slot])?;
                    let updated = self.insert(child_node, tail, value)?;
                    children[slot] = self.store(updated)?;
                    Ok(Node::Branch {
                        children,
                        value: branch_value,
                    })
                }
            },
        }
    }

    fn wrap_in_extension(&mut self, prefix: &[u8], branch: Node) -> DbResult<Node> {
        if prefix.is_empty() {
            return Ok(branch);
        }
        Ok(Node::Extension {
            path: prefix.to_vec(),
            child: self.store(branch)?,
        })
    }

    fn remove(&mut self, node: Node, path: &[u8]) -> DbResult<Node> {
        match node {
            Node::Blank => Ok(Node::Blank),
            Node::Leaf {
                path: leaf_path,
                value,
            } => {
                if leaf_path == path {
                    Ok(Node::Blank)
                } else {
                    Ok(Node::Leaf {
                        path: leaf_path,
                        value,
                    })
                }
            }
            Node::Extension {
                path: ext_path,
                child,
            } => {
                if !path.starts_with(&ext_path) {
                    return Ok(Node::Extension {
                        path: ext_path,
                        child,
                    });
                }
                let child_node = self.load(&child)?;
                let updated = self.remove(child_node, &path[ext_path.len()..])?;
                self.normalize_extension(ext_path, updated)
            }
            Node::Branch {
                mut children,
                mut value,
            } => {
                match path.split_first() {
                    None => value = None,
                    Some((index, tail)) => {
                        let slot = *index as usize;
                        let child_node = self.load(&children[slot])?;
                        let updated = self.remove(child_node, tail)?;
                        children[slot] = self.store(updated)?;
                    }
                }
                self.normalize_branch(children, value)
            }
        }
    }

    fn normalize_extension(&mut self, mut path: Vec<u8>, child: Node) -> DbResult<Node> {
        match child {
            Node::Blank => Ok(Node::Blank),
            Node::Leaf {
                path: child_path,
                value,
            } => {
                path.extend(child_path);
                Ok(Node::Leaf { path, value })
            }
            Node::Extension {
                path: child_path,
                child,
            } => {
                path.extend(child_path);
                Ok(Node::Extension { path, child })
            }
            branch @ Node::Branch { .. } => Ok(Node::Extension {
                path,
                child: self.store(branch)?,
            }),
        }
    }

    fn normalize_branch(
        &mut self,
        children: [ChildRef; 16],
        value: Option<Vec<u8>>,
    ) -> DbResult<Node> {
        let used: Vec<usize> = children
            .iter()
            .enumerate()
            .filter(|(_, child)| **child != ChildRef::Empty)
            .map(|(i, _)| i)
            .collect();
        match (used.as_slice(), value) {
            ([], None) => Ok(Node::Blank),
            ([], Some(value)) => Ok(Node::Leaf {
                path: Vec::new(),
                value,
            }),
            ([only], None) => {
                let child = self.load(&children[*only])?;
                self.normalize_extension(vec![*only as u8], child)
            }
            (_, value) => Ok(Node::Branch { children, value }),
        }
    }
}

impl<D: KeyValueRead> KeyValueRead for HexaryTrie<D> {
    fn get(&self, key: &[u8]) -> DbResult<Option<Vec<u8>>> {
        HexaryTrie::get(self, key)
    }
}

impl<D: KeyValueRead + KeyValueWrite> KeyValueWrite for HexaryTrie<D> {
    fn set(&mut self, key: &[u8], value: Vec<u8>) -> DbResult<()> {
        HexaryTrie::set(self, key, value)
    }

    fn delete(&mut self, key: &[u8]) -> DbResult<()> {
        HexaryTrie::delete(self, key)
    }
}

/// Trie view that keys every entry by the keccak hash of the caller's key.
#[derive(Debug)]
pub struct SecureTrie<D> {
    trie: HexaryTrie<D>,
}

impl<D> SecureTrie<D> {
    /// Open the secure trie rooted at `root`
    pub fn new(db: D, root: H256) -> Self {
        Self {
            trie: HexaryTrie::new(db, root),
        }
    }

    /// Current root hash
    pub fn root_hash(&self) -> H256 {
        self.trie.root_hash()
    }

    /// Point the trie at another root
    pub fn set_root_hash(&mut self, root: H256) {
        self.trie.set_root_hash(root);
    }

    /// The underlying trie
    pub fn trie(&self) -> &HexaryTrie<D> {
        &self.trie
    }

    /// The underlying trie, mutably
    pub fn trie_mut(&mut self) -> &mut HexaryTrie<D> {
        &mut self.trie
    }
}

impl<D: KeyValueRead> KeyValueRead for SecureTrie<D> {
    fn get(&self, key: &[u8]) -> DbResult<Option<Vec<u8>>> {
        self.trie.get(keccak256(key).as_bytes())
    }
}

impl<D: KeyValueRead + KeyValueWrite> KeyValueWrite for SecureTrie<D> {
    fn set(&mut self, key: &[u8], value: Vec<u8>) -> DbResult<()> {
        self.trie.set(keccak256(key).as_bytes(), value)
    }

    fn delete(&mut self, key: &[u8]) -> DbResult<()> {
        self.trie.delete(keccak256(key).as_bytes())
    }
}
