use crate::error::GeometryError;

/// Width of the physical-address prefix sent to the device.
///
/// Small devices (e.g. RTC RAM, 2-Kibit EEPROMs) latch a single address
/// byte; larger EEPROM families take two. Not derived automatically, the
/// caller selects it per device family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressWidth {
    OneByte,
    TwoBytes,
}

/// Capacity model of one memory device.
///
/// Logical position 0 maps to physical position `physical_base`; devices
/// like RTC chips reserve their leading registers that way. Set once at
/// construction, immutable afterwards except for the address width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    physical_base: u16,
    capacity: u32,
    page_size: u16,
    pub(crate) address_width: AddressWidth,
}

impl Geometry {
    /// Build a geometry from the device's physical limits.
    ///
    /// `max_position` is the last usable physical position, `min_position`
    /// the physical position backing logical 0. Capacity is what remains
    /// after the reserved prefix region: `max_position - min_position + 1`.
    pub fn new(
        max_position: u16,
        page_size: u16,
        min_position: u16,
    ) -> Result<Geometry, GeometryError> {
        if page_size == 0 {
            return Err(GeometryError::ZeroPageSize);
        }
        if min_position > max_position {
            return Err(GeometryError::BaseBeyondEnd);
        }
        Ok(Geometry {
            physical_base: min_position,
            capacity: u32::from(max_position) - u32::from(min_position) + 1,
            page_size,
            address_width: AddressWidth::TwoBytes,
        })
    }

    /// Usable capacity in bytes, i.e. highest logical position + 1.
    pub fn capacity_bytes(&self) -> u32 {
        self.capacity
    }

    pub fn capacity_bits(&self) -> u32 {
        self.capacity << 3
    }

    /// Truncating; a 56-byte device reports 0 KiB.
    pub fn capacity_kibibytes(&self) -> u32 {
        self.capacity >> 10
    }

    pub fn capacity_kibibits(&self) -> u32 {
        self.capacity_kibibytes() << 3
    }

    /// Largest contiguous run the device accepts in one write transaction.
    pub fn page_size(&self) -> u16 {
        self.page_size
    }

    /// Whole pages in the device, truncating.
    pub fn pages(&self) -> u32 {
        self.capacity / u32::from(self.page_size)
    }

    /// Physical position backing a logical one.
    pub fn physical(&self, logical: u16) -> u16 {
        logical.wrapping_add(self.physical_base)
    }

    pub fn address_width(&self) -> AddressWidth {
        self.address_width
    }

    /// Encode the physical address for `logical` into `buf`, returning the
    /// prefix slice to put on the wire. Big-endian; one-byte mode sends the
    /// low byte only.
    pub(crate) fn encode_physical<'a>(&self, logical: u16, buf: &'a mut [u8; 2]) -> &'a [u8] {
        let physical = self.physical(logical);
        match self.address_width {
            AddressWidth::OneByte => {
                buf[0] = physical as u8;
                &buf[..1]
            }
            AddressWidth::TwoBytes => {
                *buf = physical.to_be_bytes();
                &buf[..]
            }
        }
    }
}
