use calcert_core::tag::{registry_key, tag_base};
use calcert_core::{CalibrationPoint, CertificateFields, InstrumentRecord};

use crate::error::GatewayError;
use crate::gateway::RegistryGateway;

/// Everything the rules look at for one certificate.
///
/// Rules may write back into it: the range rule stores normalized bounds,
/// the tag rule raises `is_family_substitution`, the location rule records
/// the identified installation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationContext {
    pub fields: CertificateFields,
    /// Registry record with the certificate's tag.
    pub by_tag: Option<InstrumentRecord>,
    /// Registry record with the certificate's instrument serial.
    pub by_serial: Option<InstrumentRecord>,
    pub tag_base: Option<String>,
    pub serial_tag_base: Option<String>,
    pub points: Vec<CalibrationPoint>,
    pub is_family_substitution: bool,
    pub installation: Option<String>,
}

impl ValidationContext {
    /// Build a context from already-fetched registry records.
    pub fn new(
        mut fields: CertificateFields,
        by_tag: Option<InstrumentRecord>,
        by_serial: Option<InstrumentRecord>,
        points: Vec<CalibrationPoint>,
    ) -> Self {
        fields.tag = fields.tag.as_deref().map(registry_key);
        let tag_base = fields.tag.as_deref().map(|t| tag_base(t).to_string());
        let serial_tag_base = by_serial
            .as_ref()
            .map(|r| calcert_core::tag::tag_base(&registry_key(&r.tag)).to_string());

        Self {
            fields,
            by_tag,
            by_serial,
            tag_base,
            serial_tag_base,
            points,
            is_family_substitution: false,
            installation: None,
        }
    }

    /// Normalize the tag and run both registry lookups.
    pub fn lookup(
        fields: CertificateFields,
        points: Vec<CalibrationPoint>,
        gateway: &dyn RegistryGateway,
    ) -> Result<Self, GatewayError> {
        let by_tag = match fields.tag.as_deref() {
            Some(tag) => gateway.find_by_tag(&registry_key(tag))?,
            None => None,
        };
        let by_serial = match fields.serial_instrument.as_deref() {
            Some(serial) if !serial.trim().is_empty() => {
                gateway.find_by_instrument_serial(serial)?
            }
            _ => None,
        };
        Ok(Self::new(fields, by_tag, by_serial, points))
    }

    pub fn tag(&self) -> Option<&str> {
        self.fields.tag.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MemoryRegistry;

    #[test]
    fn lookup_normalizes_and_computes_bases() {
        let registry = MemoryRegistry::with_records(vec![InstrumentRecord {
            tag: "FIT-100-PT".into(),
            serial_instrument: Some("SN1".into()),
            ..Default::default()
        }]);
        let fields = CertificateFields {
            tag: Some(" fit-100-dpt ".into()),
            serial_instrument: Some("SN1".into()),
            ..Default::default()
        };
        let ctx = ValidationContext::lookup(fields, Vec::new(), &registry).unwrap();

        assert_eq!(ctx.tag(), Some("FIT-100-DPT"));
        assert!(ctx.by_tag.is_none());
        assert_eq!(ctx.by_serial.as_ref().map(|r| r.tag.as_str()), Some("FIT-100-PT"));
        assert_eq!(ctx.tag_base.as_deref(), Some("FIT-100"));
        assert_eq!(ctx.serial_tag_base.as_deref(), Some("FIT-100"));
        assert!(!ctx.is_family_substitution);
    }
}
