use std::sync::{Arc, RwLock};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{
    invalid_input_error, unexpected_error, unknown_service_error, unknown_vehicle_error, Error,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VehicleClass {
    pub id: String,
    pub name: String,
    /// Price per mile before any night or service adjustment.
    pub base_rate: Decimal,
    pub min_charge: Decimal,
    pub admin_fee: Decimal,
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServiceTier {
    pub id: String,
    pub name: String,
    pub multiplier: Decimal,
    pub active: bool,
}

/// Read-only snapshot of the vehicles and services a quote can be priced with.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub vehicles: Vec<VehicleClass>,
    pub services: Vec<ServiceTier>,
}

impl Catalog {
    pub fn from_json(data: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(data)?)
    }

    pub fn vehicle(&self, id: &str) -> Result<&VehicleClass, Error> {
        self.vehicles
            .iter()
            .find(|v| v.id == id && v.active)
            .ok_or_else(unknown_vehicle_error)
    }

    pub fn service(&self, id: &str) -> Result<&ServiceTier, Error> {
        self.services
            .iter()
            .find(|s| s.id == id && s.active)
            .ok_or_else(unknown_service_error)
    }

    pub fn active(&self) -> Self {
        Self {
            vehicles: self.vehicles.iter().filter(|v| v.active).cloned().collect(),
            services: self.services.iter().filter(|s| s.active).cloned().collect(),
        }
    }

    /// Rates and fees must not be negative; multipliers must be positive.
    pub fn validate(&self) -> Result<(), Error> {
        let vehicles_ok = self.vehicles.iter().all(|v| {
            !v.id.is_empty()
                && v.base_rate >= Decimal::ZERO
                && v.min_charge >= Decimal::ZERO
                && v.admin_fee >= Decimal::ZERO
        });
        let services_ok = self
            .services
            .iter()
            .all(|s| !s.id.is_empty() && s.multiplier > Decimal::ZERO);

        if !vehicles_ok || !services_ok {
            return Err(invalid_input_error());
        }

        Ok(())
    }
}

impl Catalog {
    pub fn builtin() -> Self {
        let vehicle = |id: &str, name: &str, base_rate, min_charge, admin_fee| VehicleClass {
            id: id.into(),
            name: name.into(),
            base_rate,
            min_charge,
            admin_fee,
            active: true,
        };
        let service = |id: &str, name: &str, multiplier| ServiceTier {
            id: id.into(),
            name: name.into(),
            multiplier,
            active: true,
        };

        Self {
            vehicles: vec![
                vehicle("small_van", "Small Van", dec!(1.35), dec!(45), dec!(15)),
                vehicle("medium_van", "Medium Van", dec!(1.55), dec!(55), dec!(15)),
                vehicle("large_van", "Large Van", dec!(1.75), dec!(65), dec!(15)),
                vehicle("luton_van", "Luton Van", dec!(2.05), dec!(85), dec!(20)),
            ],
            services: vec![
                service("standard", "Standard", dec!(1.0)),
                service("priority", "Priority", dec!(1.5)),
                service("direct", "Dedicated Direct", dec!(2.0)),
            ],
        }
    }
}

/// Shared, swappable catalog. Readers take a snapshot; a replacement never
/// changes a snapshot already handed out.
#[derive(Debug, Default)]
pub struct CatalogHandle {
    current: RwLock<Arc<Catalog>>,
}

impl CatalogHandle {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            current: RwLock::new(Arc::new(catalog)),
        }
    }

    /// Reads `path` when given, otherwise falls back to the built-in catalog.
    pub fn load(path: Option<&str>) -> Result<Self, Error> {
        let catalog = match path {
            Some(path) => Catalog::from_json(&std::fs::read_to_string(path)?)?,
            None => Catalog::builtin(),
        };
        catalog.validate()?;

        Ok(Self::new(catalog))
    }

    pub fn snapshot(&self) -> Result<Arc<Catalog>, Error> {
        let current = self.current.read().map_err(unexpected_error)?;

        Ok(current.clone())
    }

    pub fn replace(&self, catalog: Catalog) -> Result<(), Error> {
        let mut current = self.current.write().map_err(unexpected_error)?;
        *current = Arc::new(catalog);

        Ok(())
    }
}

#[test]
fn inactive_records_are_unknown() {
    let mut catalog = Catalog::builtin();
    catalog.vehicles[0].active = false;
    catalog.services[2].active = false;

    assert!(catalog.vehicle("small_van").unwrap_err().is_unknown_vehicle_error());
    assert!(catalog.vehicle("hovercraft").unwrap_err().is_unknown_vehicle_error());
    assert!(catalog.service("direct").unwrap_err().is_unknown_service_error());
    assert!(catalog.service("standard").is_ok());

    let active = catalog.active();
    assert_eq!(active.vehicles.len(), 3);
    assert_eq!(active.services.len(), 2);
}

#[test]
fn loads_from_json() {
    let catalog = Catalog::from_json(
        r#"{
            "vehicles": [{"id": "bike", "name": "Bike", "base_rate": "0.90", "min_charge": "12", "admin_fee": "5", "active": true}],
            "services": [{"id": "standard", "name": "Standard", "multiplier": 1.0, "active": true}]
        }"#,
    )
    .unwrap();

    assert_eq!(catalog.vehicle("bike").unwrap().base_rate, dec!(0.90));
    assert_eq!(catalog.service("standard").unwrap().multiplier, dec!(1));
}

#[test]
fn replacing_keeps_old_snapshots_intact() {
    let handle = CatalogHandle::new(Catalog::builtin());
    let before = handle.snapshot().unwrap();

    let mut next = Catalog::builtin();
    next.vehicles.retain(|v| v.id == "luton_van");
    handle.replace(next).unwrap();

    assert_eq!(before.vehicles.len(), 4);
    assert_eq!(handle.snapshot().unwrap().vehicles.len(), 1);
}

#[test]
fn rejects_non_positive_multipliers() {
    let mut catalog = Catalog::builtin();
    assert!(catalog.validate().is_ok());

    catalog.services[0].multiplier = Decimal::ZERO;
    assert!(catalog.validate().unwrap_err().is_invalid_input_error());
}

#[test]
fn loading_refuses_an_invalid_catalog_file() {
    let path = std::env::temp_dir().join(format!("catalog-{}.json", uuid::Uuid::new_v4()));
    std::fs::write(
        &path,
        r#"{
            "vehicles": [{"id": "bike", "name": "Bike", "base_rate": "0.90", "min_charge": "12", "admin_fee": "5", "active": true}],
            "services": [{"id": "standard", "name": "Standard", "multiplier": 0, "active": true}]
        }"#,
    )
    .unwrap();

    let loaded = CatalogHandle::load(path.to_str());
    std::fs::remove_file(&path).unwrap();

    assert!(loaded.err().unwrap().is_invalid_input_error());
    assert!(CatalogHandle::load(None).is_ok());
}
