use crate::{Direction, Kind, Reason, State};

/// Streaming byte source: called with the number of data bytes already sent,
/// returns the next byte or `None` once the write phase is over.
pub type WriteCallback<'a> = dyn FnMut(usize) -> Option<u8> + Send + 'a;

enum WriteSource<'a> {
    None,
    Bytes(&'a [u8]),
    Stream(&'a mut WriteCallback<'a>),
}

impl WriteSource<'_> {
    fn is_active(&self) -> bool {
        !matches!(self, WriteSource::None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sent {
    Address,
    Data,
}

/// What the peripheral reported when it interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    ByteBoundary {
        acknowledged: bool,
        received: Option<u8>,
    },
    Collision,
}

/// Next thing the peripheral has to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    Ignore,
    Address(u8),
    Transmit(u8),
    Restart,
    Stop,
    BeginReceive,
    Ack,
    Nack,
    Abort,
}

/// The transaction owned by the engine while a blocking call is in flight.
///
/// Buffers are borrowed from the caller; the operation never outlives the
/// call that created it.
pub struct Operation<'a> {
    kind: Kind,
    state: State,
    address: u8,
    source: WriteSource<'a>,
    sink: &'a mut [u8],
    received: usize,
    byte_count: usize,
    pending_ack: Option<Sent>,
    failure: Option<Reason>,
}

impl<'a> Operation<'a> {
    fn new(kind: Kind, address: u8, source: WriteSource<'a>, sink: &'a mut [u8]) -> Self {
        Self {
            kind,
            state: State::WriteAddress,
            address,
            source,
            sink,
            received: 0,
            byte_count: 0,
            pending_ack: None,
            failure: None,
        }
    }

    pub fn write(address: u8, bytes: &'a [u8]) -> Self {
        Self::new(Kind::Write, address, WriteSource::Bytes(bytes), &mut [])
    }

    pub fn read(address: u8, buffer: &'a mut [u8]) -> Self {
        Self::new(Kind::Read, address, WriteSource::None, buffer)
    }

    pub fn write_then_read(address: u8, bytes: &'a [u8], buffer: &'a mut [u8]) -> Self {
        Self::new(
            Kind::WriteThenRead,
            address,
            WriteSource::Bytes(bytes),
            buffer,
        )
    }

    pub fn stream(address: u8, callback: &'a mut WriteCallback<'a>) -> Self {
        Self::new(Kind::Write, address, WriteSource::Stream(callback), &mut [])
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Data bytes transferred so far, in either direction.
    pub fn byte_count(&self) -> usize {
        self.byte_count
    }

    /// Bytes stored into the read buffer so far.
    pub fn received(&self) -> usize {
        self.received
    }

    /// The next notification may carry a received byte.
    pub fn expects_byte(&self) -> bool {
        self.state == State::ReadData
    }

    pub fn outcome(&self) -> Result<(), Reason> {
        match self.failure {
            Some(reason) => Err(reason),
            None => Ok(()),
        }
    }

    /// Advance by exactly one step.
    pub fn advance(&mut self, event: Event) -> Action {
        if self.state.is_settled() {
            return Action::Ignore;
        }

        let received = match event {
            Event::Collision => return self.fail(Reason::ArbitrationLoss),
            Event::ByteBoundary {
                acknowledged,
                received,
            } => {
                if let Some(sent) = self.pending_ack.take() {
                    if !acknowledged {
                        return self.fail(match sent {
                            Sent::Address => Reason::AddressNack,
                            Sent::Data => Reason::DataNack {
                                sent: self.byte_count.saturating_sub(1),
                            },
                        });
                    }
                }
                received
            }
        };

        match self.state {
            State::WriteAddress => self.write_address(),
            State::WriteData => self.write_data(),
            State::ReadData => self.read_data(received),
            State::ReadComplete => self.stop(),
            State::Idle | State::Error => Action::Ignore,
        }
    }

    fn write_address(&mut self) -> Action {
        let direction = if self.source.is_active() {
            Direction::Write
        } else {
            Direction::Read
        };

        self.state = match direction {
            Direction::Write => State::WriteData,
            Direction::Read => State::ReadData,
        };
        self.pending_ack = Some(Sent::Address);

        Action::Address(direction.address_byte(self.address))
    }

    fn write_data(&mut self) -> Action {
        let next = match &mut self.source {
            WriteSource::Stream(callback) => (**callback)(self.byte_count),
            WriteSource::Bytes(bytes) => {
                let remaining: &'a [u8] = *bytes;
                match remaining.split_first() {
                    Some((&byte, rest)) => {
                        *bytes = rest;
                        Some(byte)
                    }
                    None => None,
                }
            }
            WriteSource::None => None,
        };

        match next {
            Some(byte) => {
                self.byte_count += 1;
                self.pending_ack = Some(Sent::Data);
                Action::Transmit(byte)
            }
            None if self.kind == Kind::WriteThenRead => {
                // Read phase: the address goes out again with the read bit.
                self.source = WriteSource::None;
                self.state = State::WriteAddress;
                Action::Restart
            }
            None => self.stop(),
        }
    }

    fn read_data(&mut self, received: Option<u8>) -> Action {
        let byte = match received {
            Some(byte) => byte,
            None if self.received < self.sink.len() => return Action::BeginReceive,
            None => return self.stop(),
        };

        let Some(slot) = self.sink.get_mut(self.received) else {
            return self.stop();
        };
        *slot = byte;
        self.received += 1;
        self.byte_count += 1;

        if self.received < self.sink.len() {
            Action::Ack
        } else {
            self.state = State::ReadComplete;
            Action::Nack
        }
    }

    fn stop(&mut self) -> Action {
        self.state = State::Idle;
        Action::Stop
    }

    fn fail(&mut self, reason: Reason) -> Action {
        self.state = State::Error;
        self.pending_ack = None;
        self.failure = Some(reason);
        Action::Abort
    }
}
