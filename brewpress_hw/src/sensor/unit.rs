use brewpress_api::notify::Notification;
use brewpress_api::sensor::PressureUnit;
use tracing::{event, Level};

pub const KPA_PER_PSI: f64 = 6.89476;
pub const PSI_PER_BAR: f64 = 14.5038;

/// Convert a raw (PSI scale) pressure into `unit`.
///
/// kPa is rounded to a whole number and Bar to three decimals, both half to even.
pub fn convert(raw_pressure: f64, unit: PressureUnit) -> f64 {
    match unit {
        PressureUnit::Raw | PressureUnit::Psi => raw_pressure,
        PressureUnit::KPa => (raw_pressure * KPA_PER_PSI).round_ties_even(),
        PressureUnit::Bar => (raw_pressure / PSI_PER_BAR * 1000.0).round_ties_even() / 1000.0,
    }
}

/// Display unit of one sensor together with its additive offset.
///
/// The offset is in display units and added after conversion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UnitConverter {
    unit: PressureUnit,
    offset: f64,
}

impl UnitConverter {
    pub fn new(unit: PressureUnit, offset: f64) -> Self {
        Self { unit, offset }
    }

    pub fn unit(&self) -> PressureUnit {
        self.unit
    }

    pub fn convert(&self, raw_pressure: f64) -> f64 {
        convert(raw_pressure, self.unit) + self.offset
    }
}

/// Pick the display unit from the sensor's own setting, falling back to the process default.
///
/// When neither names a known unit the result is kPa together with a warning for the user.
pub fn resolve_unit(
    explicit: Option<&str>,
    default: Option<&str>,
) -> (PressureUnit, Option<Notification>) {
    let candidates = [explicit, default]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    for candidate in candidates {
        match candidate.parse::<PressureUnit>() {
            Ok(unit) => return (unit, None),
            Err(_) => event!(Level::WARN, "unknown pressure unit `{}`", candidate),
        }
    }

    (PressureUnit::KPa, Some(unresolved_unit(PressureUnit::KPa)))
}

fn unresolved_unit(unit: PressureUnit) -> Notification {
    Notification::warning(
        "Pressure Sensor Init Problem",
        format!(
            "Cant read config value: PRESSURE_UNIT. Unit set to {}",
            unit
        ),
    )
}
