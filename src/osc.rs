//! OSC transport (UDP).
//!
//! Receive and send sockets live on the render thread; the receive socket is
//! nonblocking and drained once per frame from `Engine::update`, so dispatch
//! never races the frame. `reload` is a full teardown and rebuild, which is
//! the only supported way to change ports at runtime.
//!
//! `receive_paused` gates inbound dispatch while a bulk dump is in flight.
//! Without it, a controller that echoes parameter feedback would loop its own
//! dump straight back into the store.

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Context};
use rosc::{OscMessage, OscPacket, OscType};

use crate::config::OscSettings;
use crate::params::ParamStore;
use crate::registry::{Dispatch, Registry};
use crate::{logi, logw};

/// Per-frame drain budget. A stuck controller spamming packets must not
/// stall the frame.
const PUMP_BUDGET: usize = 256;

const RECV_BUF: usize = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Stopped,
    Configuring,
    Running,
}

pub struct OscTransport {
    cfg: OscSettings,
    state: TransportState,
    recv: Option<UdpSocket>,
    send: Option<UdpSocket>,
    send_to: Option<SocketAddr>,
    receive_paused: Arc<AtomicBool>,
}

impl OscTransport {
    pub fn new(cfg: OscSettings) -> Self {
        Self {
            cfg,
            state: TransportState::Stopped,
            recv: None,
            send: None,
            send_to: None,
            receive_paused: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn receive_paused(&self) -> bool {
        self.receive_paused.load(Ordering::Acquire)
    }

    pub fn start(&mut self) -> anyhow::Result<()> {
        if !self.cfg.enabled {
            logi!("OSC", "transport disabled in settings");
            self.state = TransportState::Stopped;
            return Ok(());
        }

        self.state = TransportState::Configuring;

        let recv = UdpSocket::bind(("0.0.0.0", self.cfg.receive_port))
            .with_context(|| format!("bind OSC receive port {}", self.cfg.receive_port))?;
        recv.set_nonblocking(true).context("set OSC socket nonblocking")?;

        let send = UdpSocket::bind("0.0.0.0:0").context("bind OSC send socket")?;
        let send_to = (self.cfg.send_host.as_str(), self.cfg.send_port)
            .to_socket_addrs()
            .with_context(|| format!("resolve OSC send host {}", self.cfg.send_host))?
            .next()
            .ok_or_else(|| anyhow!("no address for OSC send host {}", self.cfg.send_host))?;

        logi!(
            "OSC",
            "listening on :{} sending to {}",
            recv.local_addr().map(|a| a.port()).unwrap_or(self.cfg.receive_port),
            send_to
        );

        self.recv = Some(recv);
        self.send = Some(send);
        self.send_to = Some(send_to);
        self.state = TransportState::Running;
        Ok(())
    }

    pub fn stop(&mut self) {
        if self.state == TransportState::Running {
            logi!("OSC", "transport stopped");
        }
        self.recv = None;
        self.send = None;
        self.send_to = None;
        self.state = TransportState::Stopped;
    }

    /// Full teardown and rebuild against new settings.
    pub fn reload(&mut self, cfg: OscSettings) -> anyhow::Result<()> {
        self.stop();
        self.cfg = cfg;
        self.start()
    }

    /// Drains pending packets and dispatches them. Returns how many messages
    /// were handled this frame.
    pub fn pump(&mut self, store: &mut ParamStore, registry: &Registry) -> usize {
        if self.state != TransportState::Running || self.receive_paused() {
            return 0;
        }
        let sock = match &self.recv {
            Some(s) => s,
            None => return 0,
        };

        let mut buf = [0u8; RECV_BUF];
        let mut handled = 0;
        for _ in 0..PUMP_BUDGET {
            let size = match sock.recv_from(&mut buf) {
                Ok((size, _from)) => size,
                Err(_) => break, // WouldBlock or transient error; try next frame
            };
            match rosc::decoder::decode_udp(&buf[..size]) {
                Ok((_rest, pkt)) => handled += dispatch_packet(pkt, store, registry),
                Err(e) => {
                    logw!("OSC", "undecodable packet ({size} bytes): {e:?}");
                }
            }
        }
        handled
    }

    pub fn send_value(&self, addr: &str, value: f32) {
        self.send_message(addr, vec![OscType::Float(value)]);
    }

    fn send_message(&self, addr: &str, args: Vec<OscType>) {
        let (sock, to) = match (&self.send, self.send_to) {
            (Some(s), Some(t)) => (s, t),
            _ => return,
        };
        let msg = OscPacket::Message(OscMessage {
            addr: addr.to_string(),
            args,
        });
        match rosc::encoder::encode(&msg) {
            Ok(bytes) => {
                if let Err(e) = sock.send_to(&bytes, to) {
                    logw!("OSC", "send to {to} failed: {e}");
                }
            }
            Err(e) => {
                logw!("OSC", "encode {addr} failed: {e:?}");
            }
        }
    }

    /// Sends the current value of every parameter under `prefix`, in
    /// registration order.
    pub fn send_prefix(&self, store: &mut ParamStore, registry: &Registry, prefix: &str) -> usize {
        let dump = registry.dump(store, prefix);
        for (addr, value) in &dump {
            self.send_value(addr, *value);
        }
        dump.len()
    }

    /// Bulk feedback of the whole surface. Inbound dispatch is paused for
    /// the duration so our own dump can't echo back into the store.
    pub fn send_all(&self, store: &mut ParamStore, registry: &Registry) -> usize {
        self.receive_paused.store(true, Ordering::Release);
        let sent = self.send_prefix(store, registry, "/gravity");
        self.receive_paused.store(false, Ordering::Release);
        logi!("OSC", "sendAll: {sent} parameters");
        sent
    }
}

fn dispatch_packet(pkt: OscPacket, store: &mut ParamStore, registry: &Registry) -> usize {
    match pkt {
        OscPacket::Message(msg) => {
            match registry.dispatch(store, &msg.addr, &msg.args) {
                Dispatch::Handled => 1,
                Dispatch::Unknown => {
                    logw!("OSC", "unknown address dropped: {}", msg.addr);
                    0
                }
                Dispatch::Malformed => {
                    logw!("OSC", "malformed payload dropped: {} {:?}", msg.addr, msg.args);
                    0
                }
            }
        }
        OscPacket::Bundle(bundle) => {
            let mut handled = 0;
            for inner in bundle.content {
                handled += dispatch_packet(inner, store, registry);
            }
            handled
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::BlockId;
    use std::time::Duration;

    fn test_cfg(receive_port: u16) -> OscSettings {
        OscSettings {
            enabled: true,
            receive_port,
            send_host: "127.0.0.1".into(),
            send_port: 9,
        }
    }

    fn encode(addr: &str, args: Vec<OscType>) -> Vec<u8> {
        rosc::encoder::encode(&OscPacket::Message(OscMessage {
            addr: addr.to_string(),
            args,
        }))
        .expect("encode")
    }

    #[test]
    fn disabled_transport_stays_stopped() {
        let mut osc = OscTransport::new(OscSettings {
            enabled: false,
            ..test_cfg(0)
        });
        osc.start().expect("start");
        assert_eq!(osc.state(), TransportState::Stopped);
        let mut store = ParamStore::new();
        let registry = Registry::build();
        assert_eq!(osc.pump(&mut store, &registry), 0);
    }

    #[test]
    fn reload_rebuilds_the_sockets() {
        let mut osc = OscTransport::new(test_cfg(0));
        osc.start().expect("start");
        assert_eq!(osc.state(), TransportState::Running);
        osc.reload(test_cfg(0)).expect("reload");
        assert_eq!(osc.state(), TransportState::Running);
        osc.stop();
        assert_eq!(osc.state(), TransportState::Stopped);
    }

    #[test]
    fn pump_dispatches_loopback_messages() {
        let mut osc = OscTransport::new(test_cfg(0));
        osc.start().expect("start");
        let port = osc.recv.as_ref().expect("socket").local_addr().expect("addr").port();

        let sender = UdpSocket::bind("127.0.0.1:0").expect("bind sender");
        sender
            .send_to(
                &encode("/gravity/block1/ch1/xDisplace", vec![OscType::Float(0.7)]),
                ("127.0.0.1", port),
            )
            .expect("send");

        let mut store = ParamStore::new();
        let registry = Registry::build();
        let mut handled = 0;
        for _ in 0..50 {
            handled += osc.pump(&mut store, &registry);
            if handled > 0 {
                break;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(handled, 1);
        assert_eq!(store.get(BlockId::Ch1Adjust, 0), 0.7);
    }

    #[test]
    fn send_all_restores_the_pause_flag() {
        let mut osc = OscTransport::new(test_cfg(0));
        osc.start().expect("start");
        let mut store = ParamStore::new();
        let registry = Registry::build();
        let sent = osc.send_all(&mut store, &registry);
        assert_eq!(sent, registry.dumpable_len());
        assert!(!osc.receive_paused());
    }
}
