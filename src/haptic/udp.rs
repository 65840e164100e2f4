// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{
    error::Error,
    net::{Ipv4Addr, SocketAddr, UdpSocket},
};

use tracing::info;

use super::ActuatorCommand;

/// Sends actuator commands as plain text UDP datagrams.
pub struct UdpSender {
    socket: UdpSocket,
    addr: SocketAddr,
}

impl UdpSender {
    /// Creates a sender targeting the given address. The socket never blocks;
    /// a datagram that can't be sent right away is reported as an error.
    pub fn new(addr: SocketAddr) -> Result<UdpSender, Box<dyn Error>> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.set_nonblocking(true)?;
        info!(addr = addr.to_string(), "Haptic sender ready.");
        Ok(UdpSender { socket, addr })
    }
}

impl super::Sender for UdpSender {
    fn send(&self, command: &ActuatorCommand) -> Result<(), Box<dyn Error>> {
        self.socket
            .send_to(command.to_string().as_bytes(), self.addr)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::{error::Error, net::UdpSocket, time::Duration};

    use super::*;
    use crate::haptic::Sender;

    #[test]
    fn test_udp_sender_writes_command_text() -> Result<(), Box<dyn Error>> {
        let receiver = UdpSocket::bind("127.0.0.1:0")?;
        receiver.set_read_timeout(Some(Duration::from_secs(3)))?;

        let sender = UdpSender::new(receiver.local_addr()?)?;
        sender.send(&ActuatorCommand {
            duration: 20,
            amplitude: 180,
        })?;

        let mut buf = [0u8; 64];
        let size = receiver.recv(&mut buf)?;
        assert_eq!(b"VIB:20:180", &buf[..size]);
        Ok(())
    }
}
