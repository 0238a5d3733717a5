use crate::error::BridgeError;
use strum::{Display, EnumIter, EnumString};

/// Commands the host sends to the device, one per datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
pub enum Command {
    /// Start internal acquisition; the device answers `"1"`.
    #[strum(serialize = "1")]
    StartAcquisition,
    /// Acknowledged, then followed by one reference payload per sensor.
    #[strum(serialize = "request_data")]
    RequestData,
    /// Fire the pump toggle; the device answers its state twice.
    #[strum(serialize = "3")]
    PumpStatus,
}

/// Reply that accepts [`Command::StartAcquisition`].
pub const ACQUISITION_ACCEPTED: &str = "1";

/// Number of reference payloads following a [`Command::RequestData`] acknowledgment.
pub const REFERENCE_PAYLOADS: usize = 3;

/// Number of replies to [`Command::PumpStatus`].
pub const PUMP_STATUS_REPLIES: usize = 2;

impl Command {
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            Command::StartAcquisition => b"1",
            Command::RequestData => b"request_data",
            Command::PumpStatus => b"3",
        }
    }

    /// Parse a received datagram. Trailing line terminators are tolerated.
    pub fn from_datagram(datagram: &[u8]) -> Result<Self, BridgeError> {
        let text = String::from_utf8_lossy(datagram);
        let text = text.trim_end_matches(['\r', '\n', '\0']);
        text.parse()
            .map_err(|_| BridgeError::InvalidCommand(text.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_wire_form_matches_display() {
        for command in Command::iter() {
            assert_eq!(command.as_bytes(), command.to_string().as_bytes());
            assert_eq!(Command::from_datagram(command.as_bytes()).unwrap(), command);
        }
    }

    #[test]
    fn test_parse_tolerates_line_terminator() {
        assert_eq!(
            Command::from_datagram(b"request_data\n").unwrap(),
            Command::RequestData
        );
        assert_eq!(Command::from_datagram(b"3\r\n").unwrap(), Command::PumpStatus);
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(matches!(
            Command::from_datagram(b"2"),
            Err(BridgeError::InvalidCommand(text)) if text == "2"
        ));
        assert!(Command::from_datagram(b"").is_err());
    }
}
