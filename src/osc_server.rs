use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use glam::Vec3;
use rosc::{OscMessage, OscPacket, OscType};
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};
use wildmatch::WildMatch;

use crate::tracking::{PositionProvider, TrackedNode};

const POSITION_SUFFIX: &str = "/position";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodePosition {
    pub position: Vec3,
    pub received_at: Instant,
}

/// Latest position per tracked node, shared between the receive task and
/// the estimator.
pub struct PositionTable {
    prefix: String,
    pattern: WildMatch,
    stale_after: Duration,
    positions: Mutex<HashMap<TrackedNode, NodePosition>>,
    found_addresses: Mutex<HashSet<String>>,
}

impl PositionTable {
    pub fn new(prefix: &str, stale_after: Duration) -> Self {
        let prefix = prefix.trim_end_matches('/').to_string();
        let pattern = WildMatch::new(&format!("{prefix}/*{POSITION_SUFFIX}"));

        Self {
            prefix,
            pattern,
            stale_after,
            positions: Mutex::new(HashMap::new()),
            found_addresses: Mutex::new(HashSet::new()),
        }
    }

    pub fn handle_packet(&self, packet: OscPacket, now: Instant) {
        match packet {
            OscPacket::Message(message) => self.handle_message(message, now),
            OscPacket::Bundle(bundle) => {
                for packet in bundle.content {
                    self.handle_packet(packet, now);
                }
            }
        }
    }

    fn handle_message(&self, OscMessage { addr, args }: OscMessage, now: Instant) {
        lock(&self.found_addresses).insert(addr.clone());

        let Some(node) = self.node_for_address(&addr) else {
            return;
        };

        let Some(position) = position_from_args(&args) else {
            debug!(%addr, ?args, "ignoring position message without three numeric arguments");
            return;
        };

        lock(&self.positions).insert(node, NodePosition { position, received_at: now });
    }

    fn node_for_address(&self, addr: &str) -> Option<TrackedNode> {
        if !self.pattern.matches(addr) {
            return None;
        }

        let name = addr
            .strip_prefix(self.prefix.as_str())?
            .strip_prefix('/')?
            .strip_suffix(POSITION_SUFFIX)?;

        match name.parse() {
            Ok(node) => Some(node),
            Err(error) => {
                debug!(%addr, "{}", error);
                None
            }
        }
    }

    /// Position of `node` if one was received within the staleness window
    /// ending at `now`.
    pub fn position_at(&self, node: TrackedNode, now: Instant) -> Option<Vec3> {
        let positions = lock(&self.positions);
        let entry = positions.get(&node)?;

        if now.saturating_duration_since(entry.received_at) > self.stale_after {
            return None;
        }

        Some(entry.position)
    }

    pub fn last_seen(&self, node: TrackedNode) -> Option<NodePosition> {
        lock(&self.positions).get(&node).copied()
    }

    pub fn found_addresses(&self) -> HashSet<String> {
        lock(&self.found_addresses).clone()
    }
}

impl PositionProvider for PositionTable {
    fn try_get_position(&self, node: TrackedNode) -> Option<Vec3> {
        self.position_at(node, Instant::now())
    }
}

fn position_from_args(args: &[OscType]) -> Option<Vec3> {
    let mut values = args.iter().map(|arg| match arg {
        OscType::Float(value) => Some(*value),
        OscType::Double(value) => Some(*value as f32),
        OscType::Int(value) => Some(*value as f32),
        _ => None,
    });

    let x = values.next()??;
    let y = values.next()??;
    let z = values.next()??;
    Some(Vec3::new(x, y, z))
}

/// Receives tracked-node positions over OSC/UDP.
pub struct OscPositionServer {
    table: Arc<PositionTable>,
}

impl OscPositionServer {
    /// Binds `0.0.0.0:port` on a background task. Must be called from
    /// within a tokio runtime.
    pub fn new(port: u16, prefix: &str, stale_after: Duration) -> Self {
        let table = Arc::new(PositionTable::new(prefix, stale_after));

        let table_clone = table.clone();
        tokio::spawn(async move {
            if let Err(error) = OscPositionServer::bind_and_serve(port, table_clone).await {
                warn!("OSC position server stopped: {:#}", error);
            }
        });

        Self { table }
    }

    /// Serves on an already bound socket.
    pub fn from_socket(socket: UdpSocket, prefix: &str, stale_after: Duration) -> Self {
        let table = Arc::new(PositionTable::new(prefix, stale_after));

        let table_clone = table.clone();
        tokio::spawn(async move {
            if let Err(error) = OscPositionServer::osc_task(socket, table_clone).await {
                warn!("OSC position server stopped: {:#}", error);
            }
        });

        Self { table }
    }

    async fn bind_and_serve(port: u16, table: Arc<PositionTable>) -> anyhow::Result<()> {
        let socket = UdpSocket::bind(("0.0.0.0", port)).await?;
        info!(port, "listening for tracked positions");
        OscPositionServer::osc_task(socket, table).await
    }

    async fn osc_task(socket: UdpSocket, table: Arc<PositionTable>) -> anyhow::Result<()> {
        let mut buffer = [0; rosc::decoder::MTU];
        loop {
            let (length, from) = socket.recv_from(&mut buffer).await?;
            match rosc::decoder::decode_udp(&buffer[..length]) {
                Ok((_, packet)) => table.handle_packet(packet, Instant::now()),
                Err(error) => debug!(%from, "dropping undecodable OSC datagram: {:?}", error),
            }
        }
    }

    pub fn table(&self) -> &PositionTable {
        &self.table
    }

    pub fn get_found_addresses(&self) -> HashSet<String> {
        self.table.found_addresses()
    }
}

impl PositionProvider for OscPositionServer {
    fn try_get_position(&self, node: TrackedNode) -> Option<Vec3> {
        self.table.try_get_position(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rosc::OscBundle;
    use rosc::OscTime;

    fn message(addr: &str, args: Vec<OscType>) -> OscPacket {
        OscPacket::Message(OscMessage {
            addr: addr.to_string(),
            args,
        })
    }

    fn floats(x: f32, y: f32, z: f32) -> Vec<OscType> {
        vec![OscType::Float(x), OscType::Float(y), OscType::Float(z)]
    }

    #[test]
    fn test_position_message_updates_node() {
        let table = PositionTable::new("/tracking/trackers", Duration::from_millis(500));
        let now = Instant::now();
        table.handle_packet(message("/tracking/trackers/left_hand/position", floats(0.1, 1.2, -0.3)), now);

        assert_eq!(table.position_at(TrackedNode::LeftHand, now), Some(Vec3::new(0.1, 1.2, -0.3)));
        assert_eq!(table.position_at(TrackedNode::RightHand, now), None);
    }

    #[test]
    fn test_trailing_slash_in_prefix() {
        let table = PositionTable::new("/tracking/trackers/", Duration::from_millis(500));
        let now = Instant::now();
        table.handle_packet(message("/tracking/trackers/right_hand/position", floats(1.0, 2.0, 3.0)), now);

        assert_eq!(table.position_at(TrackedNode::RightHand, now), Some(Vec3::new(1.0, 2.0, 3.0)));
    }

    #[test]
    fn test_mixed_numeric_arguments() {
        let table = PositionTable::new("/t", Duration::from_millis(500));
        let now = Instant::now();
        let args = vec![OscType::Int(1), OscType::Double(2.5), OscType::Float(-3.0)];
        table.handle_packet(message("/t/head/position", args), now);

        assert_eq!(table.position_at(TrackedNode::Head, now), Some(Vec3::new(1.0, 2.5, -3.0)));
    }

    #[test]
    fn test_malformed_messages_are_ignored() {
        let table = PositionTable::new("/tracking/trackers", Duration::from_millis(500));
        let now = Instant::now();
        table.handle_packet(message("/tracking/trackers/left_hand/position", vec![OscType::Float(1.0)]), now);
        table.handle_packet(
            message("/tracking/trackers/left_hand/position", vec![OscType::Float(1.0), OscType::String("y".into()), OscType::Float(2.0)]),
            now,
        );
        table.handle_packet(message("/tracking/trackers/left_foot/position", floats(1.0, 1.0, 1.0)), now);
        table.handle_packet(message("/avatar/parameters/Speed", vec![OscType::Float(1.0)]), now);

        assert_eq!(table.last_seen(TrackedNode::LeftHand), None);

        let found = table.found_addresses();
        assert!(found.contains("/avatar/parameters/Speed"));
        assert!(found.contains("/tracking/trackers/left_foot/position"));
    }

    #[test]
    fn test_bundles_are_unpacked() {
        let table = PositionTable::new("/tracking/trackers", Duration::from_millis(500));
        let now = Instant::now();
        let bundle = OscPacket::Bundle(OscBundle {
            timetag: OscTime { seconds: 0, fractional: 1 },
            content: vec![
                message("/tracking/trackers/left_hand/position", floats(1.0, 0.0, 0.0)),
                message("/tracking/trackers/right_hand/position", floats(0.0, 1.0, 0.0)),
            ],
        });
        table.handle_packet(bundle, now);

        assert!(table.position_at(TrackedNode::LeftHand, now).is_some());
        assert!(table.position_at(TrackedNode::RightHand, now).is_some());
    }

    #[test]
    fn test_stale_positions_are_invalid() {
        let table = PositionTable::new("/tracking/trackers", Duration::from_millis(500));
        let received = Instant::now();
        table.handle_packet(message("/tracking/trackers/left_hand/position", floats(1.0, 2.0, 3.0)), received);

        assert!(table.position_at(TrackedNode::LeftHand, received + Duration::from_millis(400)).is_some());
        assert!(table.position_at(TrackedNode::LeftHand, received + Duration::from_millis(600)).is_none());
        assert!(table.last_seen(TrackedNode::LeftHand).is_some());
    }

    #[tokio::test]
    async fn test_server_receives_datagrams() {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let server = OscPositionServer::from_socket(socket, "/tracking/trackers", Duration::from_secs(5));

        let packet = message("/tracking/trackers/left_hand/position", floats(0.5, 1.5, 2.5));
        let bytes = rosc::encoder::encode(&packet).unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender.send_to(&bytes, addr).await.unwrap();

        let mut position = None;
        for _ in 0..100 {
            position = server.try_get_position(TrackedNode::LeftHand);
            if position.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(position, Some(Vec3::new(0.5, 1.5, 2.5)));
        assert!(server.get_found_addresses().contains("/tracking/trackers/left_hand/position"));
    }
}
