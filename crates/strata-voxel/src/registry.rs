//! Block registry: maps compact [`BlockId`] values to [`BlockDef`] metadata and
//! resolves wildcard code patterns to sets of ids.
//!
//! The registry is built once during world-generation startup. Air is always ID 0
//! so that zero-initialized chunk memory represents empty space.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::wildcard;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Compact identifier stored inside every voxel cell (2 bytes).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockId(pub u16);

impl BlockId {
    /// The empty block.
    pub const AIR: Self = Self(0);
}

/// Full descriptor for a block type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockDef {
    /// Unique block code, e.g. `rock-granite` or `ore-rich-copper-granite`.
    pub code: String,
    /// Whether the top face is solid enough to carry another block.
    pub side_solid_up: bool,
    /// Soil fertility (0 = barren).
    pub fertility: u8,
}

impl BlockDef {
    /// A solid, infertile block, the common case for rock and ore.
    pub fn solid(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            side_solid_up: true,
            fertility: 0,
        }
    }

    /// A block whose top face cannot carry anything (loose items, plants).
    pub fn non_solid(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            side_solid_up: false,
            fertility: 0,
        }
    }
}

/// Errors that can occur during block registration.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A block with the same code has already been registered.
    #[error("duplicate block code: {0}")]
    DuplicateCode(String),
    /// All 65 535 user-defined slots have been consumed.
    #[error("block registry is full (max 65536 blocks)")]
    RegistryFull,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Maps [`BlockId`] → [`BlockDef`] with O(1) lookup by index and O(1) reverse
/// lookup by code.
#[derive(Debug)]
pub struct BlockRegistry {
    /// Dense array where `index == BlockId.0`.
    blocks: Vec<BlockDef>,
    /// Reverse lookup: code → ID.
    code_to_id: FxHashMap<String, BlockId>,
}

impl BlockRegistry {
    /// Creates a new registry with Air pre-registered as ID 0.
    pub fn new() -> Self {
        let mut code_to_id = FxHashMap::default();
        code_to_id.insert("air".to_string(), BlockId::AIR);

        Self {
            blocks: vec![BlockDef::non_solid("air")],
            code_to_id,
        }
    }

    /// Registers a new block and returns its assigned ID.
    ///
    /// IDs are assigned sequentially starting from 1 (0 is Air).
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateCode`] if a block with the same code
    /// already exists, or [`RegistryError::RegistryFull`] if all slots are consumed.
    pub fn register(&mut self, def: BlockDef) -> Result<BlockId, RegistryError> {
        if self.code_to_id.contains_key(&def.code) {
            return Err(RegistryError::DuplicateCode(def.code));
        }
        if self.blocks.len() > u16::MAX as usize {
            return Err(RegistryError::RegistryFull);
        }

        let id = BlockId(self.blocks.len() as u16);
        tracing::trace!(code = %def.code, id = id.0, "registered block");
        self.code_to_id.insert(def.code.clone(), id);
        self.blocks.push(def);
        Ok(id)
    }

    /// Returns the definition for a given ID.
    ///
    /// # Panics
    ///
    /// Panics if `id` is out of range. IDs are only produced by the registry
    /// itself, so this indicates a programming error.
    pub fn get(&self, id: BlockId) -> &BlockDef {
        &self.blocks[id.0 as usize]
    }

    /// Returns the definition for a given ID, or `None` for unknown IDs.
    pub fn try_get(&self, id: BlockId) -> Option<&BlockDef> {
        self.blocks.get(id.0 as usize)
    }

    /// Returns the ID for a block code, or `None` if not found.
    pub fn lookup_by_code(&self, code: &str) -> Option<BlockId> {
        self.code_to_id.get(code).copied()
    }

    /// Returns every block whose code matches `pattern`, in registration order.
    ///
    /// A pattern without `*` is an exact lookup.
    pub fn search(&self, pattern: &str) -> Vec<BlockId> {
        if !pattern.contains('*') {
            return self.lookup_by_code(pattern).into_iter().collect();
        }
        self.blocks
            .iter()
            .enumerate()
            .filter(|(_, def)| wildcard::matches(pattern, &def.code))
            .map(|(index, _)| BlockId(index as u16))
            .collect()
    }

    /// Returns `true` if the block's top face is solid. Unknown IDs are not solid.
    pub fn is_side_solid_up(&self, id: BlockId) -> bool {
        self.try_get(id).is_some_and(|def| def.side_solid_up)
    }

    /// Returns the total number of registered blocks (including Air).
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns `true` if only Air is registered.
    pub fn is_empty(&self) -> bool {
        self.blocks.len() <= 1
    }
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn rock_registry() -> BlockRegistry {
        let mut registry = BlockRegistry::new();
        for code in ["rock-granite", "rock-basalt", "soil-medium", "ore-poor-copper-granite"] {
            registry.register(BlockDef::solid(code)).unwrap();
        }
        registry
    }

    #[test]
    fn test_air_is_id_zero() {
        let registry = BlockRegistry::new();
        let air = registry.get(BlockId::AIR);
        assert_eq!(air.code, "air");
        assert!(!air.side_solid_up);
    }

    #[test]
    fn test_register_returns_sequential_ids() {
        let mut registry = BlockRegistry::new();
        let id1 = registry.register(BlockDef::solid("rock-granite")).unwrap();
        let id2 = registry.register(BlockDef::solid("rock-basalt")).unwrap();
        assert_eq!(id1, BlockId(1));
        assert_eq!(id2, BlockId(2));
    }

    #[test]
    fn test_duplicate_code_rejected() {
        let mut registry = BlockRegistry::new();
        registry.register(BlockDef::solid("rock-granite")).unwrap();
        let result = registry.register(BlockDef::solid("rock-granite"));
        assert!(matches!(result, Err(RegistryError::DuplicateCode(_))));
    }

    #[test]
    fn test_search_wildcard_in_registration_order() {
        let registry = rock_registry();
        assert_eq!(registry.search("rock-*"), vec![BlockId(1), BlockId(2)]);
        assert_eq!(registry.search("*-granite"), vec![BlockId(1), BlockId(4)]);
    }

    #[test]
    fn test_search_exact_and_missing() {
        let registry = rock_registry();
        assert_eq!(registry.search("soil-medium"), vec![BlockId(3)]);
        assert!(registry.search("rock-marble").is_empty());
        assert!(registry.search("gravel-*").is_empty());
    }

    #[test]
    fn test_unknown_id_is_not_solid() {
        let registry = rock_registry();
        assert!(registry.is_side_solid_up(BlockId(1)));
        assert!(!registry.is_side_solid_up(BlockId::AIR));
        assert!(!registry.is_side_solid_up(BlockId(999)));
    }

    #[test]
    fn test_len() {
        let mut registry = BlockRegistry::new();
        assert_eq!(registry.len(), 1); // Air
        assert!(registry.is_empty());
        registry.register(BlockDef::solid("rock-granite")).unwrap();
        assert_eq!(registry.len(), 2);
    }
}
