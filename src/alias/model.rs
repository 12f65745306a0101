//! The alias-set model derived from a signature's annotations.
//!
//! Inputs and outputs are laid out in one slot space: input `i` is slot `i`,
//! output `j` is slot `num_inputs + j`. Slots sharing a concrete label, or
//! inputs whose attached values share a tensor storage, are merged into one
//! set with a union-find; a set is written when any of its members is.
use super::annotation::AliasAnnotation;
use crate::schema::SchemaSignature;
use petgraph::unionfind::UnionFind;
use smallvec::{smallvec, SmallVec};
use std::collections::HashMap;
use tracing::trace;

#[derive(Debug, Clone)]
pub struct AliasModel {
    num_inputs: usize,
    annotations: Vec<Option<AliasAnnotation>>,
    /// Concrete-label sets, also joined by storage sharing.
    sets: UnionFind<usize>,
    /// Storage sharing among inputs only, from attached values.
    storage: UnionFind<usize>,
    /// Indexed by set representative.
    written: Vec<bool>,
    wildcards: SmallVec<[usize; 2]>,
}

impl AliasModel {
    /// Builds the model from annotations alone.
    pub fn new(signature: &SchemaSignature) -> Self {
        Self::with_shared_storage(signature, &[])
    }

    /// Builds the model, additionally treating each pair of input positions
    /// in `shared_storage` as backed by the same storage.
    pub fn with_shared_storage(
        signature: &SchemaSignature,
        shared_storage: &[(usize, usize)],
    ) -> Self {
        let num_inputs = signature.inputs.len();
        let annotations: Vec<Option<AliasAnnotation>> =
            signature.inputs.iter().chain(&signature.outputs).map(|a| a.alias).collect();
        let slot_count = annotations.len();

        let mut sets = UnionFind::new(slot_count);
        let mut first_with_label: HashMap<char, usize> = HashMap::new();
        let mut wildcards = SmallVec::new();

        for (slot, annotation) in annotations.iter().enumerate() {
            match annotation {
                Some(AliasAnnotation::Concrete { label, .. }) => {
                    let first = *first_with_label.entry(*label).or_insert(slot);
                    sets.union(first, slot);
                }
                Some(AliasAnnotation::Wildcard { .. }) => wildcards.push(slot),
                None => {}
            }
        }

        let mut storage = UnionFind::new(num_inputs);
        for &(a, b) in shared_storage {
            if a < num_inputs && b < num_inputs {
                storage.union(a, b);
                sets.union(a, b);
            }
        }

        let mut written = vec![false; slot_count];
        for (slot, annotation) in annotations.iter().enumerate() {
            match annotation {
                Some(AliasAnnotation::Concrete { is_write: true, .. }) => {
                    written[sets.find(slot)] = true;
                }
                // `a! -> *` writes through its root label as well as the wildcard.
                Some(AliasAnnotation::Wildcard { from_label, is_write: true }) => {
                    written[sets.find(slot)] = true;
                    if let Some(&root) = first_with_label.get(from_label) {
                        written[sets.find(root)] = true;
                    }
                }
                _ => {}
            }
        }

        // A wildcard may point at any annotated storage, so it is written as
        // soon as anything annotated in the signature is.
        let any_write = annotations.iter().flatten().any(|a| a.is_write());
        if any_write {
            for &slot in &wildcards {
                written[sets.find(slot)] = true;
            }
        }

        trace!(slots = slot_count, wildcards = wildcards.len(), any_write, "built alias model");

        Self { num_inputs, annotations, sets, storage, written, wildcards }
    }

    pub fn slot_count(&self) -> usize {
        self.annotations.len()
    }

    pub fn annotation(&self, slot: usize) -> Option<AliasAnnotation> {
        self.annotations.get(slot).copied().flatten()
    }

    pub fn has_wildcard(&self) -> bool {
        !self.wildcards.is_empty()
    }

    /// Whether the storage reachable through `slot` is written by the call.
    pub fn is_written(&self, slot: usize) -> bool {
        slot < self.slot_count() && self.written[self.sets.find(slot)]
    }

    /// Whether two inputs were given values backed by the same storage.
    pub fn shares_storage(&self, a: usize, b: usize) -> bool {
        a < self.num_inputs && b < self.num_inputs && self.storage.equiv(a, b)
    }

    /// Conservative may-alias relation between two slots. Each side stands
    /// for every input its storage is shared with.
    pub fn may_alias(&self, a: usize, b: usize) -> bool {
        if a == b {
            return true;
        }
        let others = self.storage_class(b);
        self.storage_class(a)
            .iter()
            .any(|&x| others.iter().any(|&y| self.annotations_alias(x, y)))
    }

    /// `slot` plus every input backed by the same storage.
    fn storage_class(&self, slot: usize) -> SmallVec<[usize; 4]> {
        if slot >= self.num_inputs {
            return smallvec![slot];
        }
        (0..self.num_inputs).filter(|&i| self.storage.equiv(slot, i)).collect()
    }

    fn annotations_alias(&self, a: usize, b: usize) -> bool {
        if a == b {
            return true;
        }
        match (self.annotation(a), self.annotation(b)) {
            (None, _) | (_, None) => false,
            (
                Some(AliasAnnotation::Concrete { label: x, .. }),
                Some(AliasAnnotation::Concrete { label: y, .. }),
            ) => x == y,
            _ => true,
        }
    }
}
