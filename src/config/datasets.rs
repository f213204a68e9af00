//! Built-in dataset registry: one declarative spec per ingested dataset,
//! indexed by key. Field projections and geometry sources live here, not
//! in code paths.

use crate::domain::model::{ApiFlavor, ColumnType, DatasetSpec, FieldMapping, PairOrder};
use crate::utils::error::{EtlError, Result};

pub fn builtin_specs() -> Vec<DatasetSpec> {
    vec![panels(), bike_counters(), commerces(), events(), zti()]
}

/// Resolves a key filter against the registry; an empty filter selects
/// everything, an unknown key is a configuration error.
pub fn select(keys: &[String]) -> Result<Vec<DatasetSpec>> {
    let all = builtin_specs();
    if keys.is_empty() {
        return Ok(all);
    }
    keys.iter()
        .map(|key| {
            all.iter()
                .find(|spec| spec.key == *key)
                .cloned()
                .ok_or_else(|| EtlError::ConfigError {
                    message: format!("unknown dataset key: {}", key),
                })
        })
        .collect()
}

fn panels() -> DatasetSpec {
    DatasetSpec {
        key: "panels".to_string(),
        remote_name: "panneaux_d_affichage_associatifs".to_string(),
        table: "panels".to_string(),
        flavor: ApiFlavor::Explore,
        field_map: vec![
            FieldMapping::new(
                "location_desc",
                "localisation_des_panneaux_d_affichage",
                ColumnType::Text,
            ),
            FieldMapping::new("precision", "precision", ColumnType::Text),
            FieldMapping::new("format_1m2", "format_1m2", ColumnType::Boolean),
            FieldMapping::new("format_2m2", "format_2m2", ColumnType::Boolean),
        ],
        geometry_candidates: vec!["coordonnees".to_string(), "coordinates".to_string()],
        pair_order: PairOrder::LatLon,
        // a panel row without a position is useless to every consumer
        requires_geometry: true,
    }
}

fn bike_counters() -> DatasetSpec {
    DatasetSpec {
        key: "bike_counters".to_string(),
        remote_name: "comptage-velo-donnees-compteurs".to_string(),
        table: "bike_counters".to_string(),
        flavor: ApiFlavor::Search,
        field_map: vec![
            FieldMapping::new("id_compteur", "id_compteur", ColumnType::Text),
            FieldMapping::new("nom_compteur", "nom_compteur", ColumnType::Text),
            FieldMapping::new("id_site", "id_site", ColumnType::Integer),
            FieldMapping::new("nom_site", "nom_site", ColumnType::Text),
            FieldMapping::new("comptage", "comptage", ColumnType::Integer),
            FieldMapping::new("date", "date", ColumnType::Text),
            FieldMapping::new("heure", "heure", ColumnType::Text),
            FieldMapping::new("date_install", "date_install", ColumnType::Text),
            FieldMapping::new("photo_lien", "photo_lien", ColumnType::Text),
        ],
        geometry_candidates: vec!["geo_point_2d".to_string(), "geo_shape".to_string()],
        pair_order: PairOrder::LatLon,
        requires_geometry: false,
    }
}

fn commerces() -> DatasetSpec {
    DatasetSpec {
        key: "commerces".to_string(),
        remote_name: "commerces-eau-de-paris".to_string(),
        table: "commerces".to_string(),
        flavor: ApiFlavor::Search,
        field_map: vec![
            FieldMapping::new("nom_du_commerce", "nom_du_commerce", ColumnType::Text),
            FieldMapping::new("adresse", "adresse", ColumnType::Text),
            FieldMapping::new(
                "type_de_distribution",
                "type_de_distribution",
                ColumnType::Text,
            ),
            FieldMapping::new("horaires", "horaires", ColumnType::Text),
            FieldMapping::new("contact", "contact", ColumnType::Text),
        ],
        geometry_candidates: vec!["geo_point_2d".to_string(), "geo_shape".to_string()],
        pair_order: PairOrder::LatLon,
        requires_geometry: false,
    }
}

fn events() -> DatasetSpec {
    DatasetSpec {
        key: "events".to_string(),
        remote_name: "que-faire-a-paris-".to_string(),
        table: "events".to_string(),
        flavor: ApiFlavor::Search,
        field_map: vec![
            FieldMapping::new("title", "title", ColumnType::Text),
            FieldMapping::new("description", "description", ColumnType::Text),
            FieldMapping::new("date_start", "date_start", ColumnType::Text),
            FieldMapping::new("date_end", "date_end", ColumnType::Text),
            FieldMapping::new("tags", "tags", ColumnType::Json),
            FieldMapping::new("placename", "placename", ColumnType::Text),
            FieldMapping::new("address", "address", ColumnType::Text),
            FieldMapping::new("price", "price", ColumnType::Text),
            FieldMapping::new("url", "url", ColumnType::Text),
        ],
        geometry_candidates: vec!["lat_lon".to_string(), "geo_point_2d".to_string()],
        pair_order: PairOrder::LatLon,
        requires_geometry: false,
    }
}

fn zti() -> DatasetSpec {
    DatasetSpec {
        key: "zti".to_string(),
        remote_name: "zones-touristiques-internationales".to_string(),
        table: "zti".to_string(),
        flavor: ApiFlavor::Search,
        field_map: vec![
            FieldMapping::new("nom_zone", "nom_zone", ColumnType::Text),
            FieldMapping::new("type_zone", "type_zone", ColumnType::Text),
        ],
        geometry_candidates: vec!["zone_geom".to_string(), "geo_shape".to_string()],
        pair_order: PairOrder::LatLon,
        requires_geometry: false,
    }
}
