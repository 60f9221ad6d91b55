//! Block templates referenced by deposit attributes and their resolution
//! against the block registry.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use strata_voxel::{BlockId, BlockRegistry, wildcard};

use crate::error::DepositWarning;

/// A block code template, possibly containing `*` and `{name}` placeholders.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DepositBlock {
    /// Wildcard code pattern.
    pub code: String,
    /// Capture key: dependent templates refer to this block's wildcard value
    /// as `{name}`.
    pub name: Option<String>,
    /// Accepted wildcard values, in ascending grade order.
    pub allowed_variants: Option<Vec<String>>,
    /// Accepted wildcard values per mother block code.
    pub allowed_variants_by_in_block: Option<HashMap<String, Vec<String>>>,
    /// Number of grades a deposit picks from.
    pub max_grade: i32,
}

impl Default for DepositBlock {
    fn default() -> Self {
        Self {
            code: String::new(),
            name: None,
            allowed_variants: None,
            allowed_variants_by_in_block: None,
            max_grade: 1,
        }
    }
}

/// Grade-ordered blocks resolved for one mother block. Index 0 is the lowest grade.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedDepositBlock {
    pub blocks: Vec<BlockId>,
}

/// A registry block accepted as mother rock, with its wildcard capture.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MotherMatch {
    pub id: BlockId,
    pub code: String,
    /// Text captured by the first `*` of the mother pattern.
    pub value: Option<String>,
}

impl DepositBlock {
    /// Searches `blocks` for every mother block this template admits.
    ///
    /// A pattern that matches nothing at all pushes exactly one warning.
    pub fn resolve_mothers(
        &self,
        file: &str,
        blocks: &BlockRegistry,
        warnings: &mut Vec<DepositWarning>,
    ) -> Vec<MotherMatch> {
        let found = blocks.search(&self.code);
        if found.is_empty() {
            warnings.push(DepositWarning::NoMatchingBlocks {
                file: file.to_string(),
                code: self.code.clone(),
            });
            return Vec::new();
        }

        found
            .into_iter()
            .filter_map(|id| {
                let code = &blocks.try_get(id)?.code;
                self.admits_mother(code).then(|| MotherMatch {
                    id,
                    code: code.clone(),
                    value: wildcard::wildcard_value(&self.code, code).map(str::to_string),
                })
            })
            .collect()
    }

    /// Returns `true` if a block with `code`, matched by this template used as
    /// a mother pattern, passes the allowed-variant filters.
    pub fn admits_mother(&self, code: &str) -> bool {
        if let Some(allowed) = &self.allowed_variants
            && !wildcard::matches_with_variants(&self.code, code, allowed)
        {
            return false;
        }
        if let Some(by_in_block) = &self.allowed_variants_by_in_block
            && !by_in_block.contains_key(code)
        {
            return false;
        }
        true
    }

    /// Resolves this template for the mother block `mother_code`.
    ///
    /// `{key}` in the code is replaced by `value` before searching `blocks`.
    /// An empty result pushes a warning; the deposit then never places for
    /// this mother.
    pub fn resolve(
        &self,
        file: &str,
        blocks: &BlockRegistry,
        mother_code: &str,
        key: Option<&str>,
        value: Option<&str>,
        warnings: &mut Vec<DepositWarning>,
    ) -> ResolvedDepositBlock {
        let pattern = match (key, value) {
            (Some(key), Some(value)) => self.code.replace(&format!("{{{key}}}"), value),
            _ => self.code.clone(),
        };

        let mut found: Vec<(usize, BlockId)> = blocks
            .search(&pattern)
            .into_iter()
            .filter_map(|id| {
                let code = &blocks.try_get(id)?.code;
                let rank = self.grade_rank(&pattern, code)?;
                self.allowed_for_mother(&pattern, code, mother_code)
                    .then_some((rank, id))
            })
            .collect();

        if found.is_empty() {
            warnings.push(DepositWarning::NoMatchingBlocks {
                file: file.to_string(),
                code: pattern,
            });
            return ResolvedDepositBlock::default();
        }

        // Stable: without an allowed list every rank is 0 and registry order stays.
        found.sort_by_key(|&(rank, _)| rank);
        ResolvedDepositBlock {
            blocks: found.into_iter().map(|(_, id)| id).collect(),
        }
    }

    /// Grade position of `code`, or `None` when the allowed list rejects it.
    fn grade_rank(&self, pattern: &str, code: &str) -> Option<usize> {
        let Some(allowed) = &self.allowed_variants else {
            return Some(0);
        };
        let value = wildcard::wildcard_value(pattern, code)?;
        allowed.iter().position(|a| a == value)
    }

    fn allowed_for_mother(&self, pattern: &str, code: &str, mother_code: &str) -> bool {
        let Some(by_in_block) = &self.allowed_variants_by_in_block else {
            return true;
        };
        let Some(allowed) = by_in_block.get(mother_code) else {
            return false;
        };
        wildcard::wildcard_value(pattern, code).is_some_and(|value| allowed.iter().any(|a| a == value))
    }
}
