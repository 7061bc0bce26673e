use crate::config::InputConfig;
use crate::types::{AqiRecord, CountryFeature};
use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;
use geo::MultiPolygon;
use shapefile::Reader;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info, warn};

pub fn load_records(input: &InputConfig) -> Result<Vec<AqiRecord>> {
    let file = File::open(&input.data_csv)
        .with_context(|| format!("Failed to open CSV file: {:?}", input.data_csv))?;
    let records = read_records(file, &input.country_column, &input.value_column)
        .with_context(|| format!("Failed to read CSV file: {:?}", input.data_csv))?;
    info!("Loaded {} AQI rows from {:?}", records.len(), input.data_csv);
    Ok(records)
}

pub fn read_records<R: Read>(reader: R, country_column: &str, value_column: &str) -> Result<Vec<AqiRecord>> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.byte_headers()?.clone();

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| String::from_utf8_lossy(h).trim() == name)
            .ok_or_else(|| anyhow!("Column '{}' not found in CSV", name))
    };
    let country_idx = column(country_column)?;
    let value_idx = column(value_column)?;

    // Byte records so one badly encoded cell does not abort the whole file.
    let field = |row: &csv::ByteRecord, idx: usize| {
        row.get(idx)
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .unwrap_or_default()
    };

    let mut records = Vec::new();
    for result in rdr.byte_records() {
        let row = result?;
        records.push(AqiRecord::from_raw(field(&row, country_idx), field(&row, value_idx)));
    }

    Ok(records)
}

/// Numeric coercion of an AQI cell. Blank or non-numeric text yields `None`.
pub fn parse_aqi(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn load_boundaries(input: &InputConfig) -> Result<Vec<CountryFeature>> {
    let path = &input.boundaries;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s: &str| s.to_lowercase())
        .ok_or_else(|| anyhow!("Boundary file has no extension: {:?}", path))?;

    let features = match extension.as_str() {
        "shp" => load_shapefile(path, &input.name_property)?,
        "json" | "geojson" => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open GeoJSON file: {:?}", path))?;
            read_geojson(BufReader::new(file), &input.name_property)
                .with_context(|| format!("Failed to load GeoJSON file: {:?}", path))?
        }
        _ => return Err(anyhow!("Unsupported boundary format: {}", extension)),
    };

    info!("Loaded {} country features from {:?}", features.len(), path);
    Ok(features)
}

pub fn read_geojson<R: Read>(reader: R, name_property: &str) -> Result<Vec<CountryFeature>> {
    use geojson::GeoJson;

    // Loads the whole document into memory.
    let geojson = GeoJson::from_reader(reader).context("Failed to parse GeoJSON")?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("GeoJSON must be a FeatureCollection")),
    };

    let mut features = Vec::new();

    for (i, feature) in collection.features.into_iter().enumerate() {
        let name = match feature.properties.as_ref().and_then(|props| props.get(name_property)) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => {
                warn!("Feature {} has no '{}' property, skipping", i, name_property);
                continue;
            }
        };

        let geometry = match feature.geometry {
            Some(geom) => {
                let geo_geom: geo::Geometry<f64> = geom
                    .value
                    .try_into()
                    .map_err(|e| anyhow!("Failed to convert geometry of '{}': {:?}", name, e))?;

                match geo_geom {
                    geo::Geometry::MultiPolygon(mp) => mp,
                    geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    _ => {
                        debug!("Feature '{}' is not a polygon, skipping", name);
                        continue;
                    }
                }
            }
            None => {
                debug!("Feature '{}' has no geometry, skipping", name);
                continue;
            }
        };

        features.push(CountryFeature { name, geometry });
    }

    Ok(features)
}

fn load_shapefile(path: &Path, name_property: &str) -> Result<Vec<CountryFeature>> {
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("Failed to open Shapefile: {:?}", path))?;

    let mut features = Vec::new();

    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result?;

        let name_value = record
            .get(name_property)
            .ok_or_else(|| anyhow!("Field '{}' not found in Shapefile", name_property))?;

        let name = match name_value {
            shapefile::dbase::FieldValue::Character(Some(s)) => s.trim().to_string(),
            shapefile::dbase::FieldValue::Character(None) => continue,
            _ => return Err(anyhow!("Shapefile field '{}' must be a string", name_property)),
        };

        let geometry: MultiPolygon<f64> = match shape {
            shapefile::Shape::Polygon(polygon) => polygon
                .try_into()
                .map_err(|e| anyhow!("Failed to convert polygon of '{}': {:?}", name, e))?,
            shapefile::Shape::PolygonM(polygon) => polygon
                .try_into()
                .map_err(|e| anyhow!("Failed to convert polygonM of '{}': {:?}", name, e))?,
            shapefile::Shape::PolygonZ(polygon) => polygon
                .try_into()
                .map_err(|e| anyhow!("Failed to convert polygonZ of '{}': {:?}", name, e))?,
            _ => continue,
        };

        features.push(CountryFeature { name, geometry });
    }

    Ok(features)
}
