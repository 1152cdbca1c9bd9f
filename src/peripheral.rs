/// Primitive, non-blocking access to the bus peripheral.
///
/// Every method takes `&self`: the same handle is used from the foreground
/// and from the interrupt handlers, and implementations are expected to be
/// thin register accessors.
///
/// The peripheral raises one notification per byte boundary (start or restart
/// complete, byte transmitted and acknowledge sampled, byte received, ACK/NACK
/// sequence complete). Those are forwarded to
/// [`handle_event_interrupt`](crate::handle_event_interrupt). Collisions go to
/// [`handle_collision_interrupt`](crate::handle_collision_interrupt).
pub trait BusPeripheral {
    /// Issue a start condition. Any notification still pending from an earlier
    /// transaction must be discarded.
    fn issue_start(&self);

    fn issue_restart(&self);

    fn issue_stop(&self);

    /// Load one byte (address or data) into the transmit buffer.
    fn transmit(&self, byte: u8);

    /// Start clocking in one byte from the peer.
    fn begin_receive(&self);

    /// Byte shifted in since the last `begin_receive`, if the receive buffer is
    /// full. Reading it empties the buffer.
    fn take_received(&self) -> Option<u8>;

    fn send_ack(&self);

    fn send_nack(&self);

    /// Acknowledge status of the last transmitted byte.
    fn acknowledged(&self) -> bool;

    /// A start condition has been seen on the bus and no stop followed yet.
    fn transaction_in_progress(&self) -> bool;

    /// Drop the current transaction and release both lines, typically by
    /// toggling the peripheral enable.
    fn abort(&self);

    fn sda_is_high(&self) -> bool;

    /// Detach SCL from the peripheral and drive it as an open-drain output,
    /// released high.
    fn take_scl(&self);

    fn set_scl(&self, high: bool);

    /// Hand SCL back to the peripheral and re-enable it.
    fn restore_scl(&self);

    /// Wait half a bus clock period.
    fn half_bit_delay(&self);
}
