//! Point-in-country lookup, the offline counterpart of hovering the map.

use crate::aggregate::Aggregate;
use crate::render::tooltip_text;
use crate::types::CountryFeature;
use geo::algorithm::bounding_rect::BoundingRect;
use geo::algorithm::contains::Contains;
use geo::Point;
use rstar::{RTree, RTreeObject, AABB};
use tracing::debug;

// Bounding box of one feature, pointing back into the feature list.
struct FeatureIndex {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for FeatureIndex {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LookupHit {
    pub name: String,
    pub value: Option<f64>,
}

impl LookupHit {
    pub fn tooltip(&self) -> String {
        tooltip_text(&self.name, self.value)
    }
}

pub struct CountryLocator<'a> {
    features: &'a [CountryFeature],
    tree: RTree<FeatureIndex>,
}

impl<'a> CountryLocator<'a> {
    pub fn new(features: &'a [CountryFeature]) -> Self {
        let items: Vec<FeatureIndex> = features
            .iter()
            .enumerate()
            .filter_map(|(i, feature)| {
                let rect = feature.geometry.bounding_rect()?;
                Some(FeatureIndex {
                    index: i,
                    aabb: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
                })
            })
            .collect();

        debug!("Built spatial index over {} features", items.len());
        Self {
            features,
            tree: RTree::bulk_load(items),
        }
    }

    pub fn locate(&self, lon: f64, lat: f64) -> Option<&'a CountryFeature> {
        let point = Point::new(lon, lat);
        let envelope = AABB::from_point([lon, lat]);

        // Lowest index wins when boundaries overlap, matching draw order.
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .filter_map(|candidate| self.features.get(candidate.index).map(|f| (candidate.index, f)))
            .filter(|(_, feature)| feature.geometry.contains(&point))
            .min_by_key(|(i, _)| *i)
            .map(|(_, feature)| feature)
    }

    pub fn lookup(&self, aggregate: &Aggregate, lon: f64, lat: f64) -> Option<LookupHit> {
        self.locate(lon, lat).map(|feature| LookupHit {
            name: feature.name.clone(),
            value: aggregate.value(&feature.name),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{aggregate, AliasTable, InvalidValuePolicy};
    use crate::types::AqiRecord;
    use geo::{polygon, MultiPolygon};

    fn square(name: &str, x0: f64, y0: f64, size: f64) -> CountryFeature {
        let p = polygon![
            (x: x0, y: y0),
            (x: x0 + size, y: y0),
            (x: x0 + size, y: y0 + size),
            (x: x0, y: y0 + size)
        ];
        CountryFeature {
            name: name.to_string(),
            geometry: MultiPolygon::new(vec![p]),
        }
    }

    #[test]
    fn test_lookup_reports_containing_country() {
        let features = vec![square("France", 0.0, 42.0, 8.0), square("Germany", 8.0, 47.0, 7.0)];
        let records = vec![AqiRecord::from_raw("France", "33.333")];
        let agg = aggregate(&records, InvalidValuePolicy::Skip, &AliasTable::default()).unwrap();
        let locator = CountryLocator::new(&features);

        let hit = locator.lookup(&agg, 2.35, 45.0).unwrap();
        assert_eq!(hit.name, "France");
        assert_eq!(hit.tooltip(), "France: AQI 33.33");

        let hit = locator.lookup(&agg, 13.4, 52.5).unwrap();
        assert_eq!(hit.name, "Germany");
        assert_eq!(hit.value, None);
        assert!(hit.tooltip().contains("No data"));
    }

    #[test]
    fn test_lookup_in_open_water() {
        let features = vec![square("France", 0.0, 42.0, 8.0)];
        let locator = CountryLocator::new(&features);
        assert!(locator.lookup(&Aggregate::default(), -30.0, 40.0).is_none());
    }

    #[test]
    fn test_overlap_prefers_first_feature() {
        let features = vec![square("A", 0.0, 0.0, 10.0), square("B", 5.0, 5.0, 10.0)];
        let locator = CountryLocator::new(&features);
        assert_eq!(locator.locate(7.0, 7.0).unwrap().name, "A");
        assert_eq!(locator.locate(12.0, 12.0).unwrap().name, "B");
    }
}
