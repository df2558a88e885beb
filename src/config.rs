use embassy_time::Duration;

const NET_RETRY_MS: u64 = 100;
const NET_RETRY_MAX: u8 = 8;

/// Number of outbound packet buffers
pub const NET_PKT: usize = 3;

/// Maximum payload bytes per packet (module id included)
pub const MAX_DATA: usize = 66;

/// Network group used when neither the bootloader nor the caller provides one
pub const DEFAULT_GROUP: u8 = 0xD4;

/// Node id of the gateway to the IP network
pub const GATEWAY_NODE: u8 = 1;

/// Radio operating mode, persisted as a single byte by the `Net` module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum RadioMode {
    /// Full power, fast bit rate
    #[default]
    Normal = 1,
    /// Low TX power and attenuated receiver, for bench testing
    Low = 2,
    /// Full power, slow bit rate for extended range
    Slow = 3,
}

impl RadioMode {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Normal),
            2 => Some(Self::Low),
            3 => Some(Self::Slow),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

/// Transport timing configuration
#[derive(Debug, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NetConfig {
    /// Delay between retransmissions of an unacknowledged packet
    pub retry_interval: Duration,
    /// Total number of transmissions of a packet before it is dropped. The last one goes out
    /// without the ack-request bit.
    pub max_retry: u8,
    /// Ship single-character trace items over the network as LOG packets
    pub trace: bool,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            retry_interval: Duration::from_millis(NET_RETRY_MS),
            max_retry: NET_RETRY_MAX,
            trace: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radio_mode_byte_mapping() {
        for mode in [RadioMode::Normal, RadioMode::Low, RadioMode::Slow] {
            assert_eq!(RadioMode::from_byte(mode.as_byte()), Some(mode));
        }
        assert_eq!(RadioMode::from_byte(0), None);
        assert_eq!(RadioMode::from_byte(0xFF), None);
    }

    #[test]
    fn defaults() {
        let config = NetConfig::default();
        assert_eq!(config.retry_interval.as_millis(), 100);
        assert_eq!(config.max_retry, 8);
        assert!(!config.trace);
    }
}
