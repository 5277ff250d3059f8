/// Rejected geometry at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
    /// A page size of zero cannot chunk anything.
    ZeroPageSize,
    /// The reserved prefix region starts past the last usable position.
    BaseBeyondEnd,
}

/// Errors reported by the memory layer.
///
/// `Position` and `Geometry` are raised locally and never reach the bus.
/// `Bus` wraps whatever the transport reported, verbatim; its taxonomy
/// (NACK, timeout, arbitration, ...) is owned by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError<E> {
    /// Offset/length pair outside the configured capacity, or zero length.
    Position,
    /// Invalid geometry.
    Geometry(GeometryError),
    /// Transaction failure surfaced by the bus transport.
    Bus(E),
}

impl<E> From<GeometryError> for MemoryError<E> {
    fn from(e: GeometryError) -> Self {
        MemoryError::Geometry(e)
    }
}
