pub mod remote {
    use crate::notify::Notification;
    use crate::sensor::SensorReading;
    use serde::{Deserialize, Serialize};
    use std::collections::BTreeMap;

    /// Everything a sensor hands to the host process.
    #[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
    pub enum HostEvent {
        /// Latest value for live display
        Live(SensorReading),
        /// Value to append to the historical log
        History(SensorReading),
        Notify(Notification),
    }

    /// Latest reading of every sensor that has published at least once, keyed by sensor id.
    #[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
    pub struct Snapshot {
        pub readings: BTreeMap<String, SensorReading>,
    }
}

pub mod notify {
    use serde::{Deserialize, Serialize};
    use strum::Display;

    #[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
    pub enum Severity {
        Warning,
        Error,
    }

    /// A message meant for the user rather than the log.
    #[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
    pub struct Notification {
        pub title: String,
        pub message: String,
        pub severity: Severity,
    }

    impl Notification {
        pub fn new(title: &str, message: String, severity: Severity) -> Self {
            Self {
                title: title.to_owned(),
                message,
                severity,
            }
        }

        pub fn warning(title: &str, message: String) -> Self {
            Self::new(title, message, Severity::Warning)
        }

        pub fn error(title: &str, message: String) -> Self {
            Self::new(title, message, Severity::Error)
        }
    }
}

pub mod sensor {
    use serde::{Deserialize, Serialize};
    use std::time::{SystemTime, UNIX_EPOCH};
    use strum::{Display, EnumString};

    /// Unit a pressure value is published in.
    ///
    /// `Raw` and `PSI` carry the transducer scale unchanged, the rated pressure of the
    /// transducer is configured in PSI.
    #[derive(
        Clone, Copy, Debug, Default, Deserialize, Display, EnumString, Eq, Hash, PartialEq, Serialize,
    )]
    #[strum(ascii_case_insensitive)]
    pub enum PressureUnit {
        #[serde(rename = "raw")]
        #[strum(serialize = "raw")]
        Raw,
        #[serde(rename = "PSI")]
        #[strum(serialize = "PSI")]
        Psi,
        #[default]
        #[serde(rename = "kPa")]
        #[strum(serialize = "kPa")]
        KPa,
        #[serde(rename = "Bar")]
        #[strum(serialize = "Bar")]
        Bar,
    }

    #[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
    pub struct SensorReading {
        /// Id of the sensor that produced the reading
        pub sensor: String,
        pub value: f64,
        pub unit: PressureUnit,
        /// Milliseconds since the unix epoch
        pub timestamp_ms: u64,
    }

    impl SensorReading {
        /// Create a reading stamped with the current system time.
        pub fn new(sensor: &str, value: f64, unit: PressureUnit) -> Self {
            // A clock set before 1970 stamps the reading with 0 rather than losing it
            let timestamp_ms = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or_default();

            Self {
                sensor: sensor.to_owned(),
                value,
                unit,
                timestamp_ms,
            }
        }

        /// Format the reading as a single InfluxDB line protocol entry with millisecond precision.
        ///
        /// `pressure,sensor=<id>,unit=<unit> value=<value> <timestamp_ms>`
        pub fn to_line_protocol(&self) -> String {
            format!(
                "pressure,sensor={},unit={} value={} {}",
                escape_tag(&self.sensor),
                self.unit,
                self.value,
                self.timestamp_ms
            )
        }
    }

    // Commas, equals signs and spaces are significant in tag keys and values
    fn escape_tag(tag: &str) -> String {
        let mut escaped = String::with_capacity(tag.len());
        for c in tag.chars() {
            if matches!(c, ',' | '=' | ' ') {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        escaped
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn unit_names_round_trip_through_strings() {
            assert_eq!(PressureUnit::KPa.to_string(), "kPa");
            assert_eq!(PressureUnit::Psi.to_string(), "PSI");
            assert_eq!("psi".parse::<PressureUnit>(), Ok(PressureUnit::Psi));
            assert_eq!("BAR".parse::<PressureUnit>(), Ok(PressureUnit::Bar));
            assert!("furlongs".parse::<PressureUnit>().is_err());
        }

        #[test]
        fn line_protocol_escapes_tags() {
            let reading = SensorReading {
                sensor: "fermenter 1,left".to_owned(),
                value: 12.5,
                unit: PressureUnit::Psi,
                timestamp_ms: 1_700_000_000_000,
            };

            assert_eq!(
                reading.to_line_protocol(),
                "pressure,sensor=fermenter\\ 1\\,left,unit=PSI value=12.5 1700000000000"
            );
        }
    }
}
