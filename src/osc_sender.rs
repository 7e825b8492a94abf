use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use anyhow::Context;
use rosc::{OscMessage, OscPacket, OscType};

/// Sends the forward movement axis to a VR client as an OSC float.
pub struct OscAxisSender {
    socket: UdpSocket,
    target: SocketAddr,
    address: String,
}

impl OscAxisSender {
    pub fn connect_to(target: &str, address: &str) -> anyhow::Result<Self> {
        let target = target
            .to_socket_addrs()
            .with_context(|| format!("invalid OSC output target '{}'", target))?
            .next()
            .with_context(|| format!("OSC output target '{}' did not resolve", target))?;

        let bind_addr: SocketAddr = if target.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(bind_addr)?;

        Ok(Self {
            socket,
            target,
            address: address.to_string(),
        })
    }

    pub fn send_axis(&self, value: f32) -> anyhow::Result<()> {
        let packet = OscPacket::Message(OscMessage {
            addr: self.address.clone(),
            args: vec![OscType::Float(value)],
        });

        let bytes = rosc::encoder::encode(&packet)?;
        self.socket.send_to(&bytes, self.target)?;
        Ok(())
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_sends_float_message() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        let target = receiver.local_addr().unwrap().to_string();

        let sender = OscAxisSender::connect_to(&target, "/input/Vertical").unwrap();
        sender.send_axis(0.75).unwrap();

        let mut buffer = [0; rosc::decoder::MTU];
        let (length, _) = receiver.recv_from(&mut buffer).unwrap();
        let (_, packet) = rosc::decoder::decode_udp(&buffer[..length]).unwrap();

        match packet {
            OscPacket::Message(OscMessage { addr, args }) => {
                assert_eq!(addr, "/input/Vertical");
                assert_eq!(args, vec![OscType::Float(0.75)]);
            }
            other => panic!("unexpected packet: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_target_is_rejected() {
        assert!(OscAxisSender::connect_to("not an address", "/input/Vertical").is_err());
    }
}
