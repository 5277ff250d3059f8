//! Page-aware addressing and transfer layer for byte-addressable memories
//! (EEPROM, RTC RAM and similar) behind a serial bus.
//!
//! The driver translates logical positions to physical device addresses,
//! validates every span against the configured capacity, and splits writes
//! on page boundaries so an arbitrary-length store looks atomic to the
//! caller. Actual bus traffic goes through a [`Transport`] implementation;
//! bus errors come back to the caller unmodified.

#![no_std]

mod error;
mod geometry;
mod transport;

pub use error::{GeometryError, MemoryError};
pub use geometry::{AddressWidth, Geometry};
pub use transport::Transport;

use log::trace;
use zerocopy::{AsBytes, FromBytes};

/// Stack buffer size for fill bursts. Stores still split per page, so the
/// burst size only bounds stack use, not transaction size.
const FILL_BURST: usize = 256;

/// Handle for one memory device on the bus.
///
/// All transfer operations take `&mut self`; a handle shared across threads
/// must be externally serialized, there is no internal locking.
pub struct Memory<T: Transport> {
    transport: T,
    geometry: Geometry,
}

impl<T: Transport> Memory<T> {
    /// Take ownership of the bus transport and initialize it.
    ///
    /// The transport's own error is propagated unchanged if its
    /// initialization fails.
    pub fn new(transport: T, geometry: Geometry) -> Result<Memory<T>, MemoryError<T::Error>> {
        let mut memory = Memory {
            transport,
            geometry,
        };
        memory.transport.init().map_err(MemoryError::Bus)?;
        Ok(memory)
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Select the physical-address prefix width for subsequent transfers.
    pub fn set_address_width(&mut self, width: AddressWidth) {
        self.geometry.address_width = width;
    }

    /// Release the bus transport.
    pub fn free(self) -> T {
        self.transport
    }

    /// The single gate in front of every transfer. Widened arithmetic so a
    /// span ending near `u16::MAX` cannot wrap past the capacity check.
    fn check_span(&self, position: u16, len: usize) -> Result<(), MemoryError<T::Error>> {
        if len == 0 {
            return Err(MemoryError::Position);
        }
        let end = u64::from(position).saturating_add(len as u64);
        if end > u64::from(self.geometry.capacity_bytes()) {
            return Err(MemoryError::Position);
        }
        Ok(())
    }

    /// Write `data` starting at logical `position`, splitting into one bus
    /// transaction per touched page.
    ///
    /// The first failing transaction aborts the remainder; bytes already
    /// written stay written.
    pub fn store_stream(
        &mut self,
        position: u16,
        data: &[u8],
    ) -> Result<(), MemoryError<T::Error>> {
        self.check_span(position, data.len())?;
        let page = usize::from(self.geometry.page_size());
        let mut position = position;
        let mut data = data;
        while !data.is_empty() {
            let room = page - usize::from(position) % page;
            let chunk = data.len().min(room);
            let mut prefix = [0u8; 2];
            let prefix = self.geometry.encode_physical(position, &mut prefix);
            trace!(
                "store chunk: position {:#x} len {} prefix {:x?}",
                position,
                chunk,
                prefix
            );
            self.transport
                .send_framed(prefix, &data[..chunk], false, true)
                .map_err(MemoryError::Bus)?;
            data = &data[chunk..];
            position = position.wrapping_add(chunk as u16);
        }
        Ok(())
    }

    /// Read `data.len()` bytes from logical `position` in one transaction.
    ///
    /// Reads are not page-chunked; the device streams sequentially across
    /// page boundaries. The address is set with a repeated start so no
    /// other traffic can slip in before the read.
    pub fn retrieve_stream(
        &mut self,
        position: u16,
        data: &mut [u8],
    ) -> Result<(), MemoryError<T::Error>> {
        self.check_span(position, data.len())?;
        let mut prefix = [0u8; 2];
        let prefix = self.geometry.encode_physical(position, &mut prefix);
        trace!(
            "retrieve: position {:#x} len {} prefix {:x?}",
            position,
            data.len(),
            prefix
        );
        self.transport
            .send_raw(prefix, true)
            .map_err(MemoryError::Bus)?;
        self.transport.receive(data).map_err(MemoryError::Bus)
    }

    /// Store a value through its raw in-memory layout.
    ///
    /// No endianness conversion and no padding stripped; the layout on the
    /// device is exactly the layout in memory, so a round-trip on the same
    /// platform reproduces the value bit for bit.
    pub fn store<V: AsBytes>(
        &mut self,
        position: u16,
        value: &V,
    ) -> Result<(), MemoryError<T::Error>> {
        self.store_stream(position, value.as_bytes())
    }

    /// Retrieve a value stored with [`Memory::store`].
    pub fn retrieve<V: AsBytes + FromBytes>(
        &mut self,
        position: u16,
    ) -> Result<V, MemoryError<T::Error>> {
        let mut value = V::new_zeroed();
        self.retrieve_stream(position, value.as_bytes_mut())?;
        Ok(value)
    }

    /// Write `value` to `len` consecutive positions starting at `position`.
    ///
    /// `len` is clamped to the capacity remaining past `position`, so
    /// overshooting the device end fills to the end and succeeds.
    pub fn fill(
        &mut self,
        position: u16,
        len: u16,
        value: u8,
    ) -> Result<(), MemoryError<T::Error>> {
        let available = self
            .geometry
            .capacity_bytes()
            .saturating_sub(u32::from(position));
        let mut remaining = u32::from(len).min(available) as usize;
        self.check_span(position, remaining)?;
        let burst = [value; FILL_BURST];
        let mut position = position;
        while remaining > 0 {
            let n = remaining.min(FILL_BURST);
            self.store_stream(position, &burst[..n])?;
            position = position.wrapping_add(n as u16);
            remaining -= n;
        }
        Ok(())
    }

    /// Fill the whole device with `0xFF`, page by page from logical 0.
    ///
    /// Stops at the first failing page. A trailing partial page (capacity
    /// not a multiple of the page size) is left untouched.
    pub fn erase(&mut self) -> Result<(), MemoryError<T::Error>> {
        let page = self.geometry.page_size();
        let mut position = 0u16;
        for _ in 0..self.geometry.pages() {
            self.fill(position, page, 0xFF)?;
            position = position.wrapping_add(page);
        }
        Ok(())
    }

    /// Read one byte in current-address mode.
    ///
    /// No address transaction is issued; the device's internal pointer,
    /// auto-incremented after each access, decides what comes back.
    pub fn retrieve_current(&mut self) -> Result<u8, MemoryError<T::Error>> {
        let mut byte = [0u8; 1];
        self.transport.receive(&mut byte).map_err(MemoryError::Bus)?;
        Ok(byte[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Transport that accepts everything and counts transactions.
    struct CountingBus {
        sends: usize,
        receives: usize,
    }

    impl CountingBus {
        fn new() -> Self {
            CountingBus {
                sends: 0,
                receives: 0,
            }
        }
    }

    impl Transport for CountingBus {
        type Error = u8;

        fn init(&mut self) -> Result<(), u8> {
            Ok(())
        }

        fn send_framed(
            &mut self,
            _prefix: &[u8],
            _payload: &[u8],
            _repeated_start: bool,
            _stop: bool,
        ) -> Result<(), u8> {
            self.sends += 1;
            Ok(())
        }

        fn send_raw(&mut self, _payload: &[u8], _repeated_start: bool) -> Result<(), u8> {
            self.sends += 1;
            Ok(())
        }

        fn receive(&mut self, buf: &mut [u8]) -> Result<(), u8> {
            buf.fill(0);
            self.receives += 1;
            Ok(())
        }
    }

    fn memory() -> Memory<CountingBus> {
        let geom = Geometry::new(0xFF, 16, 0).unwrap();
        Memory::new(CountingBus::new(), geom).unwrap()
    }

    #[test]
    fn span_inside_capacity_accepted() {
        let mem = memory();
        assert!(mem.check_span(0, 1).is_ok());
        assert!(mem.check_span(0, 256).is_ok());
        assert!(mem.check_span(255, 1).is_ok());
        assert!(mem.check_span(100, 156).is_ok());
    }

    #[test]
    fn span_past_capacity_rejected() {
        let mem = memory();
        assert_eq!(mem.check_span(0, 257), Err(MemoryError::Position));
        assert_eq!(mem.check_span(255, 2), Err(MemoryError::Position));
        assert_eq!(mem.check_span(256, 1), Err(MemoryError::Position));
    }

    #[test]
    fn zero_length_span_rejected() {
        let mem = memory();
        assert_eq!(mem.check_span(0, 0), Err(MemoryError::Position));
    }

    #[test]
    fn span_sum_near_u16_boundary_does_not_wrap() {
        // 0xFFFF + 2 wraps to 1 in u16; must still be rejected.
        let mem = memory();
        assert_eq!(mem.check_span(0xFFFF, 2), Err(MemoryError::Position));
        assert_eq!(
            mem.check_span(0xFFFF, usize::MAX),
            Err(MemoryError::Position)
        );
    }

    #[test]
    fn rejected_store_touches_no_bus() {
        let mut mem = memory();
        let data = [0u8; 4];
        assert_eq!(
            mem.store_stream(0xFD, &data),
            Err(MemoryError::Position)
        );
        assert_eq!(mem.transport.sends, 0);
    }

    #[test]
    fn aligned_store_uses_one_transaction_per_page() {
        let mut mem = memory();
        let data = [0u8; 48];
        mem.store_stream(0, &data).unwrap();
        assert_eq!(mem.transport.sends, 3);
    }

    #[test]
    fn misaligned_store_pays_one_extra_transaction() {
        let mut mem = memory();
        let data = [0u8; 48];
        mem.store_stream(5, &data).unwrap();
        assert_eq!(mem.transport.sends, 4);
    }

    #[test]
    fn retrieve_is_two_transactions_regardless_of_span() {
        let mut mem = memory();
        let mut data = [0u8; 200];
        mem.retrieve_stream(0, &mut data).unwrap();
        assert_eq!(mem.transport.sends, 1);
        assert_eq!(mem.transport.receives, 1);
    }

    #[test]
    fn current_address_read_skips_addressing() {
        let mut mem = memory();
        mem.retrieve_current().unwrap();
        assert_eq!(mem.transport.sends, 0);
        assert_eq!(mem.transport.receives, 1);
    }

    #[test]
    fn failed_init_propagates_bus_error() {
        struct BrokenBus;
        impl Transport for BrokenBus {
            type Error = u8;
            fn init(&mut self) -> Result<(), u8> {
                Err(0x17)
            }
            fn send_framed(&mut self, _: &[u8], _: &[u8], _: bool, _: bool) -> Result<(), u8> {
                Ok(())
            }
            fn send_raw(&mut self, _: &[u8], _: bool) -> Result<(), u8> {
                Ok(())
            }
            fn receive(&mut self, _: &mut [u8]) -> Result<(), u8> {
                Ok(())
            }
        }

        let geom = Geometry::new(0xFF, 16, 0).unwrap();
        match Memory::new(BrokenBus, geom) {
            Err(MemoryError::Bus(code)) => assert_eq!(code, 0x17),
            _ => panic!("init failure must surface the bus error"),
        }
    }
}
