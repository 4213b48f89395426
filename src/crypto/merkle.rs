//! Merkle tree implementation for anchored artifact verification
//!
//! A registered artifact is a leaf of a binary hash tree whose root is
//! published on chain. This module folds an ordered proof path from a leaf
//! up to a root, and builds trees and paths for producers and tests.

use serde::{Deserialize, Serialize};

use super::hash::HashFunction;

/// Which side of the running hash the sibling sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    /// Sibling is concatenated before the running hash
    Left,
    /// Sibling is concatenated after the running hash
    Right,
}

impl Position {
    /// Parse the proof-file spelling (`"left"` / `"right"`)
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "left" => Some(Position::Left),
            "right" => Some(Position::Right),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Left => "left",
            Position::Right => "right",
        }
    }

    /// The other side
    pub fn flipped(&self) -> Self {
        match self {
            Position::Left => Position::Right,
            Position::Right => Position::Left,
        }
    }
}

/// One step of a Merkle proof path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProofStep {
    pub position: Position,
    pub sibling: Vec<u8>,
}

impl MerkleProofStep {
    pub fn new(position: Position, sibling: Vec<u8>) -> Self {
        Self { position, sibling }
    }

    /// Combine the running hash with this step's sibling
    fn apply(&self, current: &[u8], hash: HashFunction) -> Vec<u8> {
        let mut data = Vec::with_capacity(current.len() + self.sibling.len());
        match self.position {
            Position::Left => {
                data.extend_from_slice(&self.sibling);
                data.extend_from_slice(current);
            }
            Position::Right => {
                data.extend_from_slice(current);
                data.extend_from_slice(&self.sibling);
            }
        }
        hash.digest(&data)
    }
}

/// Folds proof paths against an expected root.
///
/// Stateless apart from the configured hash function, so one verifier can
/// be shared across concurrent verifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct MerkleVerifier {
    hash: HashFunction,
}

impl MerkleVerifier {
    pub fn new(hash: HashFunction) -> Self {
        Self { hash }
    }

    /// Compute the root implied by a leaf and an ordered path
    pub fn compute_root(&self, leaf_hash: &[u8], steps: &[MerkleProofStep]) -> Vec<u8> {
        steps
            .iter()
            .fold(leaf_hash.to_vec(), |current, step| step.apply(&current, self.hash))
    }

    /// Verify a leaf against a root.
    ///
    /// Steps are applied in the order given; an empty path means the leaf
    /// itself must equal the root.
    pub fn verify(&self, leaf_hash: &[u8], steps: &[MerkleProofStep], expected_root: &[u8]) -> bool {
        self.compute_root(leaf_hash, steps) == expected_root
    }
}

/// Verify a path with the default SHA-256 combiner
pub fn verify_merkle_path(leaf_hash: &[u8], steps: &[MerkleProofStep], expected_root: &[u8]) -> bool {
    MerkleVerifier::default().verify(leaf_hash, steps, expected_root)
}

/// A complete Merkle tree over a list of leaf hashes.
///
/// Levels with an odd number of nodes pair the last node with itself.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    /// levels[0] are the leaves, the last level holds the root
    levels: Vec<Vec<Vec<u8>>>,
    hash: HashFunction,
}

impl MerkleTree {
    /// Build a tree with the default SHA-256 combiner
    pub fn from_leaves(leaves: &[Vec<u8>]) -> Option<Self> {
        Self::with_hash(leaves, HashFunction::default())
    }

    /// Build a tree bottom-up. Returns `None` for an empty leaf set.
    pub fn with_hash(leaves: &[Vec<u8>], hash: HashFunction) -> Option<Self> {
        if leaves.is_empty() {
            return None;
        }

        let mut levels = vec![leaves.to_vec()];

        while levels.last().map_or(0, Vec::len) > 1 {
            let current = levels.last().map(Vec::as_slice).unwrap_or_default();
            let mut next_level = Vec::with_capacity((current.len() + 1) / 2);

            for chunk in current.chunks(2) {
                let right = chunk.get(1).unwrap_or(&chunk[0]);
                let mut data = chunk[0].clone();
                data.extend_from_slice(right);
                next_level.push(hash.digest(&data));
            }

            levels.push(next_level);
        }

        Some(Self { levels, hash })
    }

    pub fn root(&self) -> &[u8] {
        self.levels
            .last()
            .and_then(|level| level.first())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    pub fn hash_function(&self) -> HashFunction {
        self.hash
    }

    /// Proof path for the leaf at `index`, ordered leaf-to-root
    pub fn proof(&self, index: usize) -> Option<Vec<MerkleProofStep>> {
        if index >= self.leaf_count() {
            return None;
        }

        let mut steps = Vec::with_capacity(self.levels.len() - 1);
        let mut idx = index;

        for level in &self.levels[..self.levels.len() - 1] {
            let step = if idx % 2 == 0 {
                // Odd tail pairs with itself
                let sibling = level.get(idx + 1).unwrap_or(&level[idx]);
                MerkleProofStep::new(Position::Right, sibling.clone())
            } else {
                MerkleProofStep::new(Position::Left, level[idx - 1].clone())
            };
            steps.push(step);
            idx /= 2;
        }

        Some(steps)
    }
}
