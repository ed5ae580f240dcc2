//! Certificate field parser.
//!
//! Pattern-matches normalized certificate text (Portuguese or English) into
//! [`CertificateFields`]. Each field is matched on its own; a missing section
//! leaves that field `None` and never affects the others.

use lazy_static::lazy_static;
use regex::Regex;

use calcert_core::{parse_decimal, CertificateFields, Numeric};

lazy_static! {
    static ref TAG_RE: Regex = Regex::new(
        r"TAG:\s*([0-9A-Za-z]+(?:\s*[-\x{2010}\x{2011}\x{2012}\x{2013}\x{2014}\x{2015}]\s*[0-9A-Za-z]+)+)"
    )
    .expect("tag pattern");
    static ref HYPHEN_RE: Regex =
        Regex::new(r"[\x{2010}\x{2011}\x{2012}\x{2013}\x{2014}\x{2015}]").expect("hyphen pattern");
    static ref HYPHEN_SPACING_RE: Regex = Regex::new(r"\s*-\s*").expect("hyphen spacing pattern");
    static ref SERIAL_RE: Regex =
        Regex::new(r"(?:SN|Num\.?\s*de\s*Série|Serial\s*Number):\s*(\S+)").expect("serial pattern");
    static ref CERT_RE: Regex = Regex::new(r"N[º°]\s*([^\n]+)").expect("certificate pattern");
    static ref CALIBRATION_DATE_RE: Regex =
        Regex::new(r"(?:Calibration Date|Data da Calibração):\s*([0-9]{2}/[0-9]{2}/[0-9]{4})")
            .expect("calibration date pattern");
    static ref REPORT_DATE_RE: Regex =
        Regex::new(r"(?:Report Date|Data do Relatório):\s*([0-9]{2}/[0-9]{2}/[0-9]{4})")
            .expect("report date pattern");
    static ref LOCATION_BLOCK_RE: Regex = Regex::new(
        r"(?s)(?:CALIBRATION LOCATION|LOCAL DA CALIBRAÇÃO):(.*?)(?:CALIBRATED ITEM DESCRIPTION|DESCRIÇÃO DO ITEM CALIBRADO|CLIENT INFORMATION|INFORMAÇÕES DO CLIENTE|$)"
    )
    .expect("location block pattern");
    static ref LOCATION_VALUE_RE: Regex =
        Regex::new(r"(?:Name|Address|Nome|Endereço):\s*([\p{L}\p{N} \-_/]+)").expect("location pattern");
    static ref DESCRIPTION_START_RE: Regex =
        Regex::new(r"(?:System Description|Descrição do Sistema):\s*").expect("description pattern");
    static ref DESCRIPTION_END_RE: Regex = Regex::new(
        r"\n(?:Name:|Address:|Calibrated|Classification|Classificação|Periodicidade|Periodicity|Next Calibration|Próxima Calibração|LOCAL ENVIRONMENTAL|CONDIÇÕES AMBIENTAIS|REFERENCE STANDARDS|PADRÕES DE REFERÊNCIA|ITEM|TAG|SN)"
    )
    .expect("description end pattern");
    static ref DESCRIPTION_TRAILER_RE: Regex =
        Regex::new(r"Periodicity:|Periodicidade:|Classificação:|Classification:").expect("trailer pattern");
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").expect("whitespace pattern");
    static ref CALIBRATED_RANGE_RE: Regex = Regex::new(
        r"(?is)(?:Calibration\s*Range|Faixa\s*(?:de\s*)?Calibra(?:da|ção)).*?Min[: ]*([-+]?[0-9.,]+).*?Max[: ]*([-+]?[0-9.,]+)"
    )
    .expect("calibrated range pattern");
    static ref INDICATED_RANGE_RE: Regex = Regex::new(
        r"(?is)(?:Indicat(?:ed|ion)\s*Range|Faixa\s*(?:de\s*)?Indica(?:da|ção)).*?Min[: ]*([-+]?[0-9.,]+).*?Max[: ]*([-+]?[0-9.,]+)"
    )
    .expect("indicated range pattern");
    static ref ROD_RE: Regex =
        Regex::new(r"(?i)(?:Rod\s*length|Comprimento\s*da\s*Haste):\s*([\d,.]+)").expect("rod pattern");
    static ref PROBE_RE: Regex = Regex::new(
        r"(?i)(?:Probe\s*diameter|Di[aâ]metro\s*da\s*(?:Haste|Sonda)):\s*([\d,.]+)"
    )
    .expect("probe pattern");
    static ref METROLOGY_RE: Regex = Regex::new(
        r"(?i)METROLOGICAL\s+CHARACTERISTICS|CARACTER[IÍ]STICAS\s+METROL[OÓ]GICAS"
    )
    .expect("metrology pattern");
    static ref PERCENT_RE: Regex =
        Regex::new(r"([-+]?\d+(?:[.,]\d+)?)\s*%").expect("percent pattern");
}

/// Parse certificate text into fields. Pure; never fails.
pub fn parse(text: &str) -> CertificateFields {
    let (serial_instrument, serial_sensor) = extract_serials(text);
    let (min_range, max_range) = extract_range(&CALIBRATED_RANGE_RE, text);
    let (indicated_min_range, indicated_max_range) = extract_range(&INDICATED_RANGE_RE, text);
    let (fiducial_error, uncertainty) = extract_metrology(text);

    CertificateFields {
        tag: extract_tag(text),
        serial_instrument,
        serial_sensor,
        certificate_number: extract_certificate_number(text),
        calibration_date: capture(&CALIBRATION_DATE_RE, text),
        report_date: capture(&REPORT_DATE_RE, text),
        location: extract_location(text),
        system_description: extract_system_description(text),
        min_range,
        max_range,
        indicated_min_range,
        indicated_max_range,
        rod_length: capture(&ROD_RE, text).map(|raw| Numeric::from_raw(&raw)),
        probe_diameter: capture(&PROBE_RE, text).map(|raw| Numeric::from_raw(&raw)),
        fiducial_error,
        uncertainty,
        serial_updated: false,
        range_updated: false,
    }
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Tag after `TAG:`, with every Unicode hyphen variant folded to `-` and the
/// spacing around hyphens removed. At least two segments are required.
pub fn extract_tag(text: &str) -> Option<String> {
    let raw = capture(&TAG_RE, text)?;
    let ascii = HYPHEN_RE.replace_all(raw.trim(), "-");
    Some(HYPHEN_SPACING_RE.replace_all(&ascii, "-").into_owned())
}

/// First digit-bearing serial is the instrument's, the second the sensor's.
pub fn extract_serials(text: &str) -> (Option<String>, Option<String>) {
    let mut valid = SERIAL_RE
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|s| s.chars().any(|c| c.is_ascii_digit()))
        .map(str::to_string);

    let instrument = valid.next();
    let sensor = valid.next();
    (instrument, sensor)
}

/// Text after `Nº` up to end of line. Only leading whitespace is removed.
fn extract_certificate_number(text: &str) -> Option<String> {
    capture(&CERT_RE, text).map(|s| s.trim_start().to_string())
}

fn extract_location(text: &str) -> Option<String> {
    let block = LOCATION_BLOCK_RE.captures(text)?.get(1)?.as_str();
    let value = LOCATION_VALUE_RE.captures(block)?.get(1)?.as_str().trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Free text between the description label and the next section label.
/// Without a following section label the description is unknown.
fn extract_system_description(text: &str) -> Option<String> {
    let start = DESCRIPTION_START_RE.find(text)?.end();
    let first = text[start..].chars().next()?;
    let search_from = start + first.len_utf8();
    let end = search_from + DESCRIPTION_END_RE.find(&text[search_from..])?.start();

    let body = text[start..end].trim();
    let body = DESCRIPTION_TRAILER_RE
        .split(body)
        .next()
        .unwrap_or_default()
        .trim();
    let collapsed = WHITESPACE_RE.replace_all(body, " ").into_owned();
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// `Min … Max …` pair after a section label. Both bounds or neither.
fn extract_range(re: &Regex, text: &str) -> (Option<f64>, Option<f64>) {
    let Some(caps) = re.captures(text) else {
        return (None, None);
    };
    let min = caps.get(1).and_then(|m| parse_decimal(m.as_str()));
    let max = caps.get(2).and_then(|m| parse_decimal(m.as_str()));
    match (min, max) {
        (Some(min), Some(max)) => (Some(min), Some(max)),
        _ => (None, None),
    }
}

/// Metrological characteristics row: repeatability, hysteresis, fiducial
/// error, uncertainty (all percent). Only the last two are kept.
fn extract_metrology(text: &str) -> (Option<f64>, Option<f64>) {
    let Some(section) = METROLOGY_RE.find(text) else {
        return (None, None);
    };

    for line in text[section.end()..].lines() {
        let values: Vec<Option<f64>> = PERCENT_RE
            .captures_iter(line)
            .map(|c| c.get(1).and_then(|m| parse_decimal(m.as_str())))
            .collect();
        if values.len() == 4 {
            return (values[2], values[3]);
        }
    }
    (None, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const CERTIFICATE: &str = "\
CALIBRATION CERTIFICATE Nº 25 - ODS - 0412
Calibration Date: 28/09/2025
Report Date: 30/09/2025
CLIENT INFORMATION
Name: Operadora Offshore Ltda
CALIBRATION LOCATION:
Name: FPSO FRADE
Address: Bacia de Campos
CALIBRATED ITEM DESCRIPTION
TAG: FIT – 1231010 ‑ PT
SN: N/A
SN: 4471A
Num. de Série: S-0098
System Description: Medição de gás
combustível do turbogerador
Periodicity: 12 months
Calibration Range: Min: 0,00 kPa Max: 250,5 kPa
Indicated Range: Min -10 Max 260
Rod length: 250,0
Probe diameter: 6,35
METROLOGICAL CHARACTERISTICS
Repeatability  Hysteresis  Fiducial error  Uncertainty
0,01 %  0,02 %  0,05 %  0,12 %
";

    #[test]
    fn parses_full_certificate() {
        let f = parse(CERTIFICATE);
        assert_eq!(f.tag.as_deref(), Some("FIT-1231010-PT"));
        assert_eq!(f.serial_instrument.as_deref(), Some("4471A"));
        assert_eq!(f.serial_sensor.as_deref(), Some("S-0098"));
        assert_eq!(f.certificate_number.as_deref(), Some("25 - ODS - 0412"));
        assert_eq!(f.calibration_date.as_deref(), Some("28/09/2025"));
        assert_eq!(f.report_date.as_deref(), Some("30/09/2025"));
        assert_eq!(f.location.as_deref(), Some("FPSO FRADE"));
        assert_eq!(
            f.system_description.as_deref(),
            Some("Medição de gás combustível do turbogerador")
        );
        assert_eq!(f.range(), Some((0.0, 250.5)));
        assert_eq!(f.indicated_min_range, Some(-10.0));
        assert_eq!(f.indicated_max_range, Some(260.0));
        assert_eq!(f.rod_length, Some(Numeric::Value(250.0)));
        assert_eq!(f.probe_diameter, Some(Numeric::Value(6.35)));
        assert_eq!(f.fiducial_error, Some(0.05));
        assert_eq!(f.uncertainty, Some(0.12));
        assert!(!f.serial_updated);
        assert!(!f.range_updated);
    }

    #[test]
    fn empty_text_is_all_unknown() {
        assert_eq!(parse(""), CertificateFields::default());
    }

    #[test]
    fn certificate_number_keeps_trailing_whitespace() {
        let f = parse("Nº   123 45  \nnext line");
        assert_eq!(f.certificate_number.as_deref(), Some("123 45  "));
    }

    #[test]
    fn bare_tag_without_separator_is_rejected() {
        assert_eq!(extract_tag("TAG: FIT100\n"), None);
    }

    #[test]
    fn portuguese_labels() {
        let text = "\
Data da Calibração: 01/02/2025
Data do Relatório: 03/02/2025
LOCAL DA CALIBRAÇÃO:
Endereço: Plataforma POLVO Bacia de Campos
DESCRIÇÃO DO ITEM CALIBRADO
Faixa Calibrada: Min 4,5 Max 20
Comprimento da Haste: 300
";
        let f = parse(text);
        assert_eq!(f.calibration_date.as_deref(), Some("01/02/2025"));
        assert_eq!(f.report_date.as_deref(), Some("03/02/2025"));
        assert_eq!(f.location.as_deref(), Some("Plataforma POLVO Bacia de Campos"));
        assert_eq!(f.range(), Some((4.5, 20.0)));
        assert_eq!(f.rod_length, Some(Numeric::Value(300.0)));
        assert_eq!(f.probe_diameter, None);
    }

    #[test]
    fn range_with_unparsable_bound_is_absent() {
        let f = parse("Calibration Range: Min: ., Max: 10\n");
        assert_eq!(f.min_range, None);
        assert_eq!(f.max_range, None);
    }

    #[test]
    fn description_needs_a_following_section() {
        assert_eq!(parse("System Description: dangling text").system_description, None);
    }

    #[test]
    fn metrology_requires_four_columns() {
        let text = "METROLOGICAL CHARACTERISTICS\nFiducial error 0,05 % Uncertainty 0,12 %\n";
        let f = parse(text);
        assert_eq!(f.fiducial_error, None);
        assert_eq!(f.uncertainty, None);
    }

    #[test]
    fn unparsable_geometry_is_kept_as_text() {
        let f = parse("Rod length: 1.200,5\n");
        assert_eq!(f.rod_length, Some(Numeric::Text("1.200,5".into())));
    }

    const HYPHENS: [&str; 7] = ["-", "\u{2010}", "\u{2011}", "\u{2012}", "\u{2013}", "\u{2014}", "\u{2015}"];

    proptest! {
        #[test]
        fn tag_normalization_is_idempotent(
            segments in prop::collection::vec("[A-Z0-9]{1,5}", 2..5),
            hyphens in prop::collection::vec(0usize..7, 4),
            pads in prop::collection::vec(0usize..3, 8),
        ) {
            let mut raw = segments[0].clone();
            for (i, seg) in segments.iter().enumerate().skip(1) {
                raw.push_str(&" ".repeat(pads[2 * i - 2]));
                raw.push_str(HYPHENS[hyphens[i - 1]]);
                raw.push_str(&" ".repeat(pads[2 * i - 1]));
                raw.push_str(seg);
            }

            let first = extract_tag(&format!("TAG: {raw}\n")).expect("tag");
            let second = extract_tag(&format!("TAG: {first}\n")).expect("tag");
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first, segments.join("-"));
        }

        #[test]
        fn serial_order_ignores_digitless_matches(
            noise in prop::collection::vec("[A-Z/]{1,6}", 0..4),
            instrument in "[A-Z]{0,3}[0-9]{1,6}",
            sensor in "[0-9]{1,6}[A-Z]{0,3}",
        ) {
            let mut text = String::new();
            for n in &noise {
                text.push_str(&format!("SN: {n}\n"));
            }
            text.push_str(&format!("SN: {instrument}\n"));
            for n in &noise {
                text.push_str(&format!("SN: {n}\n"));
            }
            text.push_str(&format!("SN: {sensor}\n"));

            let (first, second) = extract_serials(&text);
            prop_assert_eq!(first, Some(instrument));
            prop_assert_eq!(second, Some(sensor));
        }

        #[test]
        fn range_is_both_or_nothing(
            min in "[0-9]{1,3}(,[0-9]{1,2})?",
            junk in "[.,]{1,3}",
            junk_first in any::<bool>(),
        ) {
            let text = if junk_first {
                format!("Calibration Range: Min: {junk} Max: {min}\n")
            } else {
                format!("Calibration Range: Min: {min} Max: {junk}\n")
            };
            let f = parse(&text);
            prop_assert!(f.min_range.is_none());
            prop_assert!(f.max_range.is_none());
        }
    }
}
