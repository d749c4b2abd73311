use serde_json::{Map, Value};

use crate::types::WorldPolygon;

/// A world-space polygon with free-form attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geometry: WorldPolygon,
    pub properties: Map<String, Value>,
}

impl Feature {
    pub fn new(geometry: WorldPolygon) -> Self {
        Self {
            geometry,
            properties: Map::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// One feature per polygon, same order, empty attributes.
pub fn features_from_polygons(polygons: Vec<WorldPolygon>) -> Vec<Feature> {
    polygons.into_iter().map(Feature::new).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::polygon;

    #[test]
    fn test_one_feature_per_polygon_in_order() {
        let polygons = vec![
            polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)],
            polygon![(x: 5.0, y: 5.0), (x: 6.0, y: 5.0), (x: 6.0, y: 6.0)],
        ];
        let features = features_from_polygons(polygons.clone());

        assert_eq!(features.len(), 2);
        for (feature, polygon) in features.iter().zip(&polygons) {
            assert_eq!(&feature.geometry, polygon);
            assert!(feature.properties.is_empty());
        }
    }

    #[test]
    fn test_properties_are_an_extension_point() {
        let feature = Feature::new(polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)])
            .with_property("class", "building");
        assert_eq!(feature.properties["class"], Value::from("building"));
    }
}
