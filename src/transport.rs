/// Bus transaction interface the memory layer is generic over.
///
/// Implementors own connection setup, device addressing, clock speed and
/// the start/stop/repeated-start framing of individual transactions. The
/// memory layer only decides what bytes go on the wire and in what order.
pub trait Transport {
    /// Bus-level error, forwarded to the caller unmodified.
    type Error;

    /// Prepare the bus for traffic.
    fn init(&mut self) -> Result<(), Self::Error>;

    /// Write `payload` preceded by `prefix` in a single transaction.
    ///
    /// `prefix` carries the physical address bytes. With `repeated_start`
    /// the transaction begins with a repeated start instead of a plain
    /// start; with `stop` it is terminated by a stop condition.
    fn send_framed(
        &mut self,
        prefix: &[u8],
        payload: &[u8],
        repeated_start: bool,
        stop: bool,
    ) -> Result<(), Self::Error>;

    /// Write `payload` with no prefix.
    ///
    /// Used to set the device's internal address pointer. A transaction
    /// sent with `repeated_start` must not be followed by unrelated bus
    /// traffic before the follow-up read completes.
    fn send_raw(&mut self, payload: &[u8], repeated_start: bool) -> Result<(), Self::Error>;

    /// Blocking read of exactly `buf.len()` bytes, stop-terminated.
    fn receive(&mut self, buf: &mut [u8]) -> Result<(), Self::Error>;
}
