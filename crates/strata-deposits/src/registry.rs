//! Generator factories keyed by the `generator` tag of a deposit variant.

use std::sync::Arc;

use hashbrown::HashMap;
use strata_voxel::BlockRegistry;

use crate::child::PointCloudGenerator;
use crate::disc::DiscDepositGenerator;
use crate::error::DepositError;
use crate::generator::{DepositGenerator, WorldDimensions};
use crate::placement::PlacementMode;
use crate::variant::DepositVariant;

/// Builds an uninitialised generator from a variant and its attributes blob.
pub type GeneratorFactory = Box<
    dyn Fn(Arc<DepositVariant>, &serde_json::Value) -> Result<Box<dyn DepositGenerator>, DepositError> + Send + Sync,
>;

/// Tag → factory table, built once at startup and passed to whoever loads
/// deposit definitions.
#[derive(Default)]
pub struct DepositGeneratorRegistry {
    factories: HashMap<String, GeneratorFactory>,
}

impl DepositGeneratorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in generator. Factories capture `dims` and
    /// `blocks`.
    pub fn with_defaults(dims: WorldDimensions, blocks: Arc<BlockRegistry>) -> Self {
        let mut registry = Self::new();

        for mode in PlacementMode::ALL {
            let blocks = Arc::clone(&blocks);
            registry.register(mode.tag(), move |variant, attributes| {
                let generator = DiscDepositGenerator::from_attributes(mode, variant, attributes, dims, Arc::clone(&blocks))?;
                Ok(Box::new(generator) as Box<dyn DepositGenerator>)
            });
        }

        registry.register("childdeposit-pointcloud", move |variant, attributes| {
            let generator = PointCloudGenerator::from_attributes(variant, attributes, dims, Arc::clone(&blocks))?;
            Ok(Box::new(generator) as Box<dyn DepositGenerator>)
        });

        registry
    }

    /// Registers `factory` under `tag`, replacing any previous factory.
    pub fn register<F>(&mut self, tag: impl Into<String>, factory: F)
    where
        F: Fn(Arc<DepositVariant>, &serde_json::Value) -> Result<Box<dyn DepositGenerator>, DepositError>
            + Send
            + Sync
            + 'static,
    {
        let tag = tag.into();
        tracing::trace!(tag = %tag, "registered deposit generator");
        self.factories.insert(tag, Box::new(factory));
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.factories.contains_key(tag)
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    /// Creates and initialises a generator for `tag`.
    ///
    /// Returns `Ok(None)` when no factory is registered for `tag`. Init
    /// warnings are logged, not returned as errors.
    ///
    /// # Errors
    ///
    /// Returns [`DepositError::InvalidAttributes`] when the attributes blob
    /// does not fit the generator.
    pub fn create(
        &self,
        tag: &str,
        variant: Arc<DepositVariant>,
        attributes: &serde_json::Value,
    ) -> Result<Option<Box<dyn DepositGenerator>>, DepositError> {
        let Some(factory) = self.factories.get(tag) else {
            return Ok(None);
        };
        let mut generator = factory(variant, attributes)?;
        generator.init();
        Ok(Some(generator))
    }
}

#[cfg(test)]
mod tests {
    use strata_voxel::BlockDef;

    use super::*;

    fn registry() -> DepositGeneratorRegistry {
        let mut blocks = BlockRegistry::new();
        blocks.register(BlockDef::solid("rock-granite")).unwrap();
        blocks.register(BlockDef::solid("ore-granite")).unwrap();
        DepositGeneratorRegistry::with_defaults(WorldDimensions::default(), Arc::new(blocks))
    }

    fn variant(generator: &str) -> Arc<DepositVariant> {
        Arc::new(DepositVariant {
            code: "ore".into(),
            from_file: "ore.json".into(),
            generator: generator.into(),
            tries_per_chunk: 1.0,
            ..Default::default()
        })
    }

    #[test]
    fn test_defaults_cover_every_tag() {
        assert_eq!(
            registry().tags(),
            vec![
                "childdeposit-pointcloud",
                "disc-anywhere",
                "disc-followsealevel",
                "disc-followsurface",
                "disc-followsurfacebelow",
            ]
        );
    }

    #[test]
    fn test_unknown_tag_is_none() {
        let result = registry().create("disc-sideways", variant("disc-sideways"), &serde_json::json!({}));
        assert!(matches!(result, Ok(None)));
    }

    #[test]
    fn test_create_initialises_generator() {
        let attributes = serde_json::json!({
            "inBlock": { "code": "rock-*", "name": "rock" },
            "placeBlock": { "code": "ore-{rock}" },
            "radius": { "avg": 5, "var": 1 },
            "depth": { "avg": 0.3 }
        });
        let generator = registry()
            .create("disc-anywhere", variant("disc-anywhere"), &attributes)
            .unwrap()
            .unwrap();
        assert_eq!(generator.bearing_blocks().len(), 1);
        assert!((generator.max_radius() - 7.8).abs() < 1e-4);
        assert_eq!(generator.variant().code, "ore");
    }

    #[test]
    fn test_bad_attributes_name_the_file() {
        let result = registry().create(
            "disc-followsurface",
            variant("disc-followsurface"),
            &serde_json::json!({ "maxYRoughness": "steep" }),
        );
        match result {
            Err(DepositError::InvalidAttributes { file, .. }) => assert_eq!(file, "ore.json"),
            other => panic!("expected InvalidAttributes, got {:?}", other.map(|g| g.is_some())),
        }
    }

    #[test]
    fn test_custom_factory() {
        let mut registry = registry();
        registry.register("disc-custom", |variant, attributes| {
            let generator = PointCloudGenerator::from_attributes(
                variant,
                attributes,
                WorldDimensions::default(),
                Arc::new(BlockRegistry::new()),
            )?;
            Ok(Box::new(generator) as Box<dyn DepositGenerator>)
        });
        assert!(registry.contains("disc-custom"));
        let created = registry
            .create("disc-custom", variant("disc-custom"), &serde_json::json!({}))
            .unwrap();
        assert!(created.is_some());
    }
}
