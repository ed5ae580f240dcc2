//! Registry access seam.
//!
//! The engine reads through [`RegistryGateway`] while building the context;
//! only [`crate::Remediation::apply`] calls the mutators. Every mutator must
//! be atomic for its row.

use calcert_core::tag::registry_key;
use calcert_core::{InstrumentRecord, Numeric};

use crate::error::GatewayError;

pub trait RegistryGateway {
    fn find_by_tag(&self, tag: &str) -> Result<Option<InstrumentRecord>, GatewayError>;

    fn find_by_instrument_serial(
        &self,
        serial: &str,
    ) -> Result<Option<InstrumentRecord>, GatewayError>;

    fn insert(&mut self, record: &InstrumentRecord) -> Result<(), GatewayError>;

    fn update_instrument_serial(&mut self, tag: &str, serial: &str) -> Result<(), GatewayError>;

    fn update_sensor_serial(&mut self, tag: &str, serial: &str) -> Result<(), GatewayError>;

    /// Rename the record keyed by its instrument serial.
    fn update_tag(&mut self, serial: &str, new_tag: &str) -> Result<(), GatewayError>;

    fn update_range(&mut self, tag: &str, min: f64, max: f64) -> Result<(), GatewayError>;
}

/// In-process registry, used by tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    records: Vec<InstrumentRecord>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<InstrumentRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[InstrumentRecord] {
        &self.records
    }

    fn by_tag_mut(&mut self, tag: &str) -> Result<&mut InstrumentRecord, GatewayError> {
        let key = registry_key(tag);
        self.records
            .iter_mut()
            .find(|r| registry_key(&r.tag) == key)
            .ok_or_else(|| GatewayError::NotFound {
                key: "tag",
                value: tag.to_string(),
            })
    }
}

impl RegistryGateway for MemoryRegistry {
    fn find_by_tag(&self, tag: &str) -> Result<Option<InstrumentRecord>, GatewayError> {
        let key = registry_key(tag);
        Ok(self.records.iter().find(|r| registry_key(&r.tag) == key).cloned())
    }

    fn find_by_instrument_serial(
        &self,
        serial: &str,
    ) -> Result<Option<InstrumentRecord>, GatewayError> {
        let serial = serial.trim();
        Ok(self
            .records
            .iter()
            .find(|r| r.serial_instrument.as_deref().map(str::trim) == Some(serial))
            .cloned())
    }

    fn insert(&mut self, record: &InstrumentRecord) -> Result<(), GatewayError> {
        self.records.push(record.clone());
        Ok(())
    }

    fn update_instrument_serial(&mut self, tag: &str, serial: &str) -> Result<(), GatewayError> {
        self.by_tag_mut(tag)?.serial_instrument = Some(serial.to_string());
        Ok(())
    }

    fn update_sensor_serial(&mut self, tag: &str, serial: &str) -> Result<(), GatewayError> {
        self.by_tag_mut(tag)?.serial_sensor = Some(serial.to_string());
        Ok(())
    }

    fn update_tag(&mut self, serial: &str, new_tag: &str) -> Result<(), GatewayError> {
        let serial = serial.trim();
        let record = self
            .records
            .iter_mut()
            .find(|r| r.serial_instrument.as_deref().map(str::trim) == Some(serial))
            .ok_or_else(|| GatewayError::NotFound {
                key: "serial",
                value: serial.to_string(),
            })?;
        record.tag = new_tag.to_string();
        Ok(())
    }

    fn update_range(&mut self, tag: &str, min: f64, max: f64) -> Result<(), GatewayError> {
        let record = self.by_tag_mut(tag)?;
        record.min_range = Some(Numeric::Value(min));
        record.max_range = Some(Numeric::Value(max));
        Ok(())
    }
}
