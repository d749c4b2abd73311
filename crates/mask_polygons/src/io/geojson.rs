use geo::orient::{Direction, Orient};
use geojson::{FeatureCollection, Geometry, Value};

use crate::{error::Result, io::Feature, traits::FeatureSerializer};

/// RFC 7946 FeatureCollection writer.
///
/// Exteriors are written counter-clockwise and holes clockwise.
#[derive(Debug, Clone, Default)]
pub struct GeoJsonSerializer {
    pub pretty: bool,
}

impl GeoJsonSerializer {
    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    pub fn to_feature_collection(&self, features: &[Feature]) -> FeatureCollection {
        let features = features
            .iter()
            .map(|feature| {
                let oriented = feature.geometry.orient(Direction::Default);
                geojson::Feature {
                    bbox: None,
                    geometry: Some(Geometry::new(Value::from(&oriented))),
                    id: None,
                    properties: Some(feature.properties.clone()),
                    foreign_members: None,
                }
            })
            .collect();

        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }
}

impl FeatureSerializer for GeoJsonSerializer {
    fn serialize(&self, features: &[Feature]) -> Result<String> {
        let collection = self.to_feature_collection(features);
        let text = if self.pretty {
            serde_json::to_string_pretty(&collection)?
        } else {
            serde_json::to_string(&collection)?
        };
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{LineString, Polygon};

    fn clockwise_square_with_hole() -> Feature {
        // Clockwise exterior in a y-up frame.
        let exterior: LineString<f64> =
            vec![(0.0, 0.0), (0.0, 4.0), (4.0, 4.0), (4.0, 0.0), (0.0, 0.0)].into();
        let hole: LineString<f64> =
            vec![(1.0, 1.0), (2.0, 1.0), (2.0, 2.0), (1.0, 2.0), (1.0, 1.0)].into();
        Feature::new(Polygon::new(exterior, vec![hole]))
    }

    #[test]
    fn test_feature_collection_shape() {
        let text = GeoJsonSerializer::default()
            .serialize(&[clockwise_square_with_hole()])
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(json["type"], "FeatureCollection");
        let features = json["features"].as_array().unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0]["type"], "Feature");
        assert_eq!(features[0]["properties"], serde_json::json!({}));
        assert_eq!(features[0]["geometry"]["type"], "Polygon");
        assert_eq!(features[0]["geometry"]["coordinates"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_rings_follow_right_hand_rule() {
        use geo::Winding;

        let collection =
            GeoJsonSerializer::default().to_feature_collection(&[clockwise_square_with_hole()]);
        let geometry = collection.features[0].geometry.clone().unwrap();
        let polygon: Polygon<f64> = geometry.value.try_into().unwrap();

        assert!(polygon.exterior().is_ccw());
        assert!(polygon.interiors()[0].is_cw());
    }

    #[test]
    fn test_empty_collection() {
        let text = GeoJsonSerializer::pretty().serialize(&[]).unwrap();
        let collection: FeatureCollection =
            text.parse::<geojson::GeoJson>().unwrap().try_into().unwrap();
        assert!(collection.features.is_empty());
    }
}
