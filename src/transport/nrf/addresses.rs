/// On-air address of a network group.
///
/// Every node of a group shares one logical address: a fixed 4 byte base plus a 1 byte prefix
/// that is the group id. Nodes of other groups on the same channel never match it.
///
/// | Field      | Default Value            |
/// | :---       | :---                     |
/// | base       | [0xE7, 0xE7, 0xE7, 0xE7] |
/// | rf_channel | 2                        |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Addresses {
    pub(crate) base: [u8; 4],
    pub(crate) prefix: u8,
    /// Channel to be used by the radio hardware (must be between 0 and 100)
    pub(crate) rf_channel: u8,
}

pub const ADDR_LENGTH: u8 = 4 + 1;

const DEFAULT_BASE: [u8; 4] = [0xE7, 0xE7, 0xE7, 0xE7];
const DEFAULT_CHANNEL: u8 = 2;

impl Addresses {
    /// * `base` - Base address shared by all groups.
    /// * `group` - Network group, used as the address prefix.
    /// * `rf_channel` - Channel to be used by the radio hardware (must be between 0 and 100).
    pub fn new(base: [u8; 4], group: u8, rf_channel: u8) -> Result<Self, &'static str> {
        if rf_channel > 100 {
            return Err("invalid rf_channel");
        }
        Ok(Self {
            base,
            prefix: group,
            rf_channel,
        })
    }

    pub const fn for_group(group: u8) -> Self {
        Self {
            base: DEFAULT_BASE,
            prefix: group,
            rf_channel: DEFAULT_CHANNEL,
        }
    }

    /// BASE0 register value
    pub fn base_reg(&self) -> u32 {
        address_conversion(u32::from_le_bytes(self.base))
    }

    /// PREFIX0 register value, logical address 0 only
    pub fn prefix_reg(&self) -> u32 {
        bytewise_bit_swap(self.prefix as u32)
    }
}

#[inline]
pub fn address_conversion(value: u32) -> u32 {
    value.reverse_bits()
}

/// Reverses the bit order inside each byte, keeping the byte order
#[inline]
pub fn bytewise_bit_swap(value: u32) -> u32 {
    value.reverse_bits().swap_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_swap_stays_within_bytes() {
        assert_eq!(bytewise_bit_swap(0x0000_0001), 0x0000_0080);
        assert_eq!(bytewise_bit_swap(0x0000_D4C2), 0x0000_2B43);
        assert_eq!(address_conversion(0x0000_0001), 0x8000_0000);
    }

    #[test]
    fn group_is_prefix() {
        let a = Addresses::for_group(0xD4);
        assert_eq!(a.prefix_reg(), 0x2B);
        assert_eq!(a.rf_channel, 2);
        assert!(Addresses::new(DEFAULT_BASE, 1, 101).is_err());
    }
}
