use critical_section::CriticalSection;

use super::{Action, BusPeripheral, Event, Operation, Reason, State, TraceEvent};

pub trait InterruptBridge<P: BusPeripheral> {
    fn bus(&self) -> &P;

    fn get_state(&self) -> State;

    fn set_state(&self, state: State);

    fn with_operation<R>(
        &self,
        cs: CriticalSection,
        f: impl FnOnce(&mut Operation<'static>) -> R,
    ) -> Option<R>;

    fn fail(&self, reason: Reason);

    fn notify(&self, event: TraceEvent);
}

/// Byte-boundary interrupt: start/restart done, byte sent, byte received, or
/// ACK/NACK sequence done.
pub fn handle_event_interrupt<P: BusPeripheral, B: InterruptBridge<P>>(bridge: &B) {
    if bridge.get_state().is_settled() {
        return;
    }

    critical_section::with(|cs| {
        bridge.with_operation(cs, |op| {
            let bus = bridge.bus();

            let received = if op.expects_byte() {
                bus.take_received()
            } else {
                None
            };
            if received.is_some() {
                bridge.notify(TraceEvent::ByteRead);
            }

            let event = Event::ByteBoundary {
                acknowledged: bus.acknowledged(),
                received,
            };
            step(bridge, op, event);
        });
    });
}

/// Bus collision interrupt. Only matters while a transaction is in flight.
pub fn handle_collision_interrupt<P: BusPeripheral, B: InterruptBridge<P>>(bridge: &B) {
    if bridge.get_state().is_settled() {
        return;
    }

    critical_section::with(|cs| {
        bridge.with_operation(cs, |op| step(bridge, op, Event::Collision));
    });
}

fn step<P: BusPeripheral, B: InterruptBridge<P>>(
    bridge: &B,
    op: &mut Operation<'static>,
    event: Event,
) {
    let action = op.advance(event);
    trace!("{} -> {}", op.state(), action);

    let bus = bridge.bus();
    match action {
        Action::Ignore => return,
        Action::Address(byte) | Action::Transmit(byte) => bus.transmit(byte),
        Action::Restart => bus.issue_restart(),
        Action::Stop => bus.issue_stop(),
        Action::BeginReceive => bus.begin_receive(),
        Action::Ack => bus.send_ack(),
        Action::Nack => bus.send_nack(),
        Action::Abort => bus.abort(),
    }

    if let Some(event) = TraceEvent::for_action(action) {
        bridge.notify(event);
    }

    if let (Action::Abort, Err(reason)) = (action, op.outcome()) {
        bridge.fail(reason);
    }

    bridge.set_state(op.state());
}
