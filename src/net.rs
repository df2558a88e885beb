//! Transport core
//!
//! One packet at a time is in flight: the head of the outbound queue. It is sent as soon as the
//! medium allows, retransmitted every `retry_interval` until an ack naming this node arrives, and
//! sent one last time without the ack-request bit when the retry budget runs out. Inbound data
//! packets that ask for an ack get one, sent ahead of any data retransmission.
//!
//! Everything happens inside [`Net::poll`], which the application calls on every pass through
//! its main loop:
//!
//! ```ignore
//! loop {
//!     if let Some(buf) = net.allocate() {
//!         buf[0] = module_id::OWTEMP;
//!         buf[1] = reading;
//!         net.send(2, true)?;
//!     }
//!     if net.poll().is_some() {
//!         registry::dispatch(&mut modules, net.received())?;
//!     }
//! }
//! ```

use embassy_time::Instant;

use crate::{
    Error,
    clock::{Clock, SystemClock},
    config::{MAX_DATA, NET_PKT, NetConfig, RadioMode},
    header::Header,
    identity::NodeIdentity,
    log::{debug, info, trace, warn},
    packet::Packet,
    queue::OutboundQueue,
    registry::{ConfigWrite, Module, module_id},
    signal::{NoSignal, SignalSource},
    trace::Trace,
    transport::{Recv, Transport},
};

/// An ack waiting for the medium
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PendingAck {
    pub header: Header,
    /// Signal quality of the packet being acked, echoed back as the ack's only payload byte
    pub signal: u8,
}

pub struct Net<T, C = SystemClock, S = NoSignal, const Q: usize = NET_PKT> {
    transport: T,
    clock: C,
    signal: S,
    config: NetConfig,
    identity: NodeIdentity,

    queue: OutboundQueue<Q>,
    /// Transmissions of the head packet so far
    send_cnt: u8,
    /// When the head packet was last transmitted
    send_time: Instant,
    pending_ack: Option<PendingAck>,

    rx: Packet,
    last_ack_signal: u8,
    last_rcv_signal: u8,
    trace: Trace,
}

impl<T, C, S, const Q: usize> Net<T, C, S, Q>
where
    T: Transport,
    C: Clock,
    S: SignalSource,
{
    /// Builds the transport core. The medium is left alone until [`Net::init_radio`] (or the
    /// registry's `apply_config`) runs.
    pub fn new(
        transport: T,
        clock: C,
        signal: S,
        identity: NodeIdentity,
        config: NetConfig,
    ) -> Self {
        Self {
            transport,
            clock,
            signal,
            config,
            identity,
            queue: OutboundQueue::new(),
            send_cnt: 0,
            send_time: Instant::from_ticks(0),
            pending_ack: None,
            rx: Packet::new_empty(),
            last_ack_signal: 0,
            last_rcv_signal: 0,
            trace: Trace::new(config.trace),
        }
    }

    pub fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Number of packets waiting in the outbound queue, the in-flight one included
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Transmissions of the head packet so far
    pub fn send_count(&self) -> u8 {
        self.send_cnt
    }

    pub fn pending_ack(&self) -> Option<PendingAck> {
        self.pending_ack
    }

    /// Signal quality reported back by the last ack that matched a send
    pub fn last_ack_signal(&self) -> u8 {
        self.last_ack_signal
    }

    /// Signal quality sampled when the last packet came in
    pub fn last_rcv_signal(&self) -> u8 {
        self.last_rcv_signal
    }

    /// Payload of the last data packet returned by `poll`, module id first
    pub fn received(&self) -> &[u8] {
        self.rx.payload()
    }

    pub fn received_header(&self) -> Header {
        self.rx.header()
    }

    /// Initializes the medium for this node
    pub fn init_radio(&mut self, mode: RadioMode) {
        if !self.transport.enabled() {
            info!("Net: transport disabled");
            return;
        }
        info!(
            "Net: node_id={} group_id={} mode={:?}",
            self.identity.node().get(),
            self.identity.group(),
            mode
        );
        self.transport.configure(&self.identity, mode);
        self.trace(b'+');
    }

    /// Hands out the payload buffer of the next free queue slot.
    ///
    /// Must be followed by exactly one [`Net::send`], [`Net::broadcast`] or [`Net::send_raw`];
    /// until then the slot isn't reserved and the next `allocate` returns it again.
    pub fn allocate(&mut self) -> Option<&mut [u8; MAX_DATA]> {
        if !self.transport.enabled() {
            return None;
        }
        if self.queue.is_full() {
            warn!("Net: no free packet buffer");
            return None;
        }
        self.queue.allocate()
    }

    /// Queues the allocated buffer for the gateway, optionally asking for an ack
    pub fn send(&mut self, len: u8, ack: bool) -> Result<(), Error> {
        let header = Header::from_node(self.identity.node()).with_ack(ack);
        self.send_raw(len, header)
    }

    /// Queues the allocated buffer as a broadcast. Broadcasts are never acked.
    pub fn broadcast(&mut self, len: u8) -> Result<(), Error> {
        let header = Header::from_node(self.identity.node());
        self.send_raw(len, header)
    }

    /// Queues the allocated buffer with a caller-built header. If nothing else is queued and the
    /// medium is free it goes out right away.
    pub fn send_raw(&mut self, len: u8, header: Header) -> Result<(), Error> {
        if !self.transport.enabled() {
            return Err(Error::Disabled);
        }
        self.queue.push(header, len)?;
        self.trace(b'>');
        if self.queue.len() == 1 {
            if self.transport.can_send() {
                self.do_send();
            } else {
                self.trace(b'-');
            }
        }
        Ok(())
    }

    /// Drives receive and (re)transmission. Call on every pass through the main loop.
    ///
    /// Returns the module id of a data packet that just came in, whose payload is then
    /// available from [`Net::received`] until the next call.
    pub fn poll(&mut self) -> Option<u8> {
        if !self.transport.enabled() {
            return None;
        }
        self.flush_trace(false);

        let delivered = match self.transport.recv_done(&mut self.rx) {
            Recv::Idle => None,
            Recv::CrcFailed => {
                debug!("Net: bad CRC");
                self.trace(b'C');
                None
            }
            Recv::Frame => self.handle_frame(),
        };

        self.retransmit();
        delivered
    }

    /// Polls until every queued packet and ack is out (acked or given up on) or a data packet
    /// arrives, whose module id is returned.
    ///
    /// Always polls at least once, so the receive path gets a chance even with nothing queued.
    pub fn flush(&mut self) -> Option<u8> {
        if !self.busy() {
            return self.poll();
        }
        while self.busy() {
            if let Some(m) = self.poll() {
                return Some(m);
            }
            self.clock.pause();
        }
        None
    }

    /// Like [`Net::flush`], yielding to the executor between polls instead of busy waiting
    pub async fn flush_async(&mut self) -> Option<u8> {
        if !self.busy() {
            return self.poll();
        }
        while self.busy() {
            if let Some(m) = self.poll() {
                return Some(m);
            }
            embassy_futures::yield_now().await;
        }
        None
    }

    /// Sends the trace buffer if it's due, or if `force` and it holds anything
    pub fn flush_trace(&mut self, force: bool) {
        let Some(frame) = self.trace.pending(force) else {
            return;
        };
        if self.transport.can_send() {
            self.transport
                .send_start(Header::from_node(self.identity.node()), frame);
            self.trace.clear();
        }
    }

    fn busy(&self) -> bool {
        !self.queue.is_empty() || self.pending_ack.is_some()
    }

    fn trace(&mut self, c: u8) {
        self.trace.push(c);
        if self.trace.nearly_full() {
            self.flush_trace(false);
        }
    }

    fn trace_depth(&mut self) {
        self.trace(b'0'.wrapping_add(self.queue.len() as u8));
    }

    fn handle_frame(&mut self) -> Option<u8> {
        let header = self.rx.header();
        let me = self.identity.node().get();

        if header.is_directed() && header.node() != me {
            trace!("Net: not for us {:?}", header);
            return None;
        }

        if !header.is_control() {
            // data packet, the ack goes out from retransmit() once the medium is free
            self.last_rcv_signal = self.signal.sample();
            if header.wants_ack() {
                self.queue_ack(header.node());
            }
            let module = self.rx.module_id();
            self.trace(b'R');
            self.trace(b'0'.wrapping_add(module.unwrap_or(0)));
            self.trace_depth();
            return module;
        }

        if header.wants_ack() {
            // CTL and ACK together are unused
            self.trace(b'y');
            return None;
        }

        if header.node() == me && !self.queue.is_empty() && self.send_cnt > 0 {
            self.last_rcv_signal = self.signal.sample();
            self.last_ack_signal = match self.rx.payload() {
                [signal] => *signal,
                _ => 0,
            };
            debug!(
                "Net: ACK after {} sends, signal {}",
                self.send_cnt, self.last_ack_signal
            );
            self.queue.pop();
            self.send_cnt = 0;
            self.trace(b'A');
        } else {
            debug!("Net: unexpected ACK {:?}", header);
            self.trace(b'a');
        }
        self.trace_depth();
        None
    }

    /// Arms the ack for a packet whose node field was `dest`, replacing any unsent one
    fn queue_ack(&mut self, dest: u8) {
        self.pending_ack = Some(PendingAck {
            header: Header::ack_for(dest, self.identity.node()),
            signal: self.last_rcv_signal,
        });
    }

    /// At most one transmission per call: a pending ack first, then a fresh head packet, then a
    /// retransmission once the retry interval has passed.
    fn retransmit(&mut self) {
        if self.pending_ack.is_some() && self.transport.can_send() {
            if let Some(ack) = self.pending_ack.take() {
                self.transport.send_start(ack.header, &[ack.signal]);
            }
        } else if !self.queue.is_empty() && self.send_cnt == 0 {
            if self.transport.can_send() {
                self.do_send();
            }
        } else if !self.queue.is_empty()
            && self.send_cnt > 0
            && self.clock.now() >= self.send_time + self.config.retry_interval
        {
            if self.transport.can_send() {
                debug!("Net: retransmit #{}", self.send_cnt);
                self.trace(b'X');
                self.trace_depth();
                self.do_send();
            }
        }
    }

    /// Transmits the head packet
    fn do_send(&mut self) {
        let Some(packet) = self.queue.head() else {
            return;
        };
        let mut header = packet.header();
        // don't ask for an ACK on the last try
        let last = self.send_cnt.saturating_add(1) >= self.config.max_retry;
        if last {
            header = header.without_ack();
        }
        self.transport.send_start(header, packet.payload());
        debug!(
            "Net: send {:?} #{} module={:?} len={}",
            header,
            self.send_cnt,
            packet.module_id(),
            packet.payload_length()
        );
        if last && packet.header().wants_ack() {
            warn!("Net: giving up on ACK after {} sends", self.config.max_retry);
        }

        if header.wants_ack() {
            self.send_cnt += 1;
            self.send_time = self.clock.now();
        } else {
            self.queue.pop();
            self.send_cnt = 0;
        }
        self.trace(b'S');
        self.trace_depth();
    }
}

impl<T, C, S, const Q: usize> Module for Net<T, C, S, Q>
where
    T: Transport,
    C: Clock,
    S: SignalSource,
{
    fn module_id(&self) -> u8 {
        module_id::NET
    }

    fn config_size(&self) -> usize {
        1
    }

    /// Applies the stored radio mode, or persists the default one, then brings up the medium
    fn apply_config(&mut self, config: Option<&[u8]>, store: &mut dyn ConfigWrite) {
        let stored = config.and_then(|c| c.first().copied().and_then(RadioMode::from_byte));
        let mode = match stored {
            Some(mode) => mode,
            None => {
                let mode = RadioMode::default();
                if let Err(e) = store.write(module_id::NET, &[mode.as_byte()]) {
                    warn!("Net: cannot persist config: {:?}", e);
                }
                mode
            }
        };
        self.init_radio(mode);
    }

    fn receive(&mut self, data: &[u8]) {
        debug!("Net: ignoring {} byte control packet", data.len());
    }
}
