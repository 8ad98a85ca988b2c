//! Request/response session over a serial port
//!
//! [`JvsMaster`] is the only user of its port. Each request encodes one
//! frame, writes it, and blocks for exactly one reply bounded by the
//! configured response timeout. Nothing is retried here.

use jvs_hal::{Deadline, SerialPort};
use jvs_protocol::features::FeatureTable;
use jvs_protocol::response::switch_bytes;
use jvs_protocol::{
    decode, Command, Feature, Frame, Report, Response, ResponseError, Status, SwitchState,
    Version, BROADCAST, MASTER_ADDRESS,
};
use tracing::{debug, info, warn};

use crate::config::MasterConfig;
use crate::device::DeviceInfo;
use crate::error::{MasterError, Result};
use crate::hex::HexBytes;

/// Master end of a JVS bus
#[derive(Debug)]
pub struct JvsMaster<P> {
    port: P,
    config: MasterConfig,
}

impl<P: SerialPort> JvsMaster<P> {
    /// Create a session over `port`
    pub fn new(port: P, config: MasterConfig) -> Self {
        Self { port, config }
    }

    /// Session configuration
    pub fn config(&self) -> &MasterConfig {
        &self.config
    }

    /// Borrow the underlying port
    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Consume the session and return the port
    pub fn into_inner(self) -> P {
        self.port
    }

    /// Encode and write one frame
    pub fn send(&mut self, address: u8, payload: &[u8]) -> Result<()> {
        let frame = Frame::new(address, payload)?;
        self.send_frame(&frame)
    }

    /// Write an already built frame
    pub fn send_frame(&mut self, frame: &Frame) -> Result<()> {
        let bytes = frame.encode_to_vec()?;
        if self.config.dump_frames {
            debug!("> {}", HexBytes(&bytes));
        }
        self.port.write_all(&bytes)?;
        self.port.flush()?;
        Ok(())
    }

    /// Receive one frame within the configured response timeout
    pub fn recv(&mut self) -> Result<Frame> {
        let deadline = self.config.serial.response_deadline();
        self.recv_until(deadline)
    }

    /// Receive one frame before `deadline`
    pub fn recv_until(&mut self, deadline: Deadline) -> Result<Frame> {
        match decode(&mut self.port, deadline) {
            Ok(frame) => {
                if self.config.dump_frames {
                    debug!(
                        "< {:02X} [{:X}] {} {:02X}",
                        frame.address,
                        frame.payload.len(),
                        HexBytes(&frame.payload),
                        frame.checksum()
                    );
                }
                Ok(frame)
            }
            Err(e) => {
                warn!("Failed to receive frame: {}", e);
                Err(e.into())
            }
        }
    }

    /// Send `command` to `address` and return the reply frame
    ///
    /// Fails if the reply is not addressed to the master or the board
    /// reports anything but a normal status and report.
    pub fn request(&mut self, address: u8, command: Command) -> Result<Frame> {
        let frame = self.exchange(address, command)?;
        check_response(&Response::parse(&frame)?)?;
        Ok(frame)
    }

    /// Run `command` and hand the checked reply to `parse`
    fn query<T>(
        &mut self,
        address: u8,
        command: Command,
        parse: impl FnOnce(&Response<'_>) -> Result<T>,
    ) -> Result<T> {
        let frame = self.exchange(address, command)?;
        let response = Response::parse(&frame)?;
        check_response(&response)?;
        parse(&response)
    }

    /// Send `command` and receive the reply addressed to the master
    fn exchange(&mut self, address: u8, command: Command) -> Result<Frame> {
        self.send_frame(&command.to_frame(address)?)?;
        let frame = self.recv()?;

        if frame.address != MASTER_ADDRESS {
            return Err(MasterError::UnexpectedAddress {
                expected: MASTER_ADDRESS,
                got: frame.address,
            });
        }
        Ok(frame)
    }

    /// Reset every board on the bus
    ///
    /// Boards do not answer a reset, so nothing is read back.
    pub fn reset(&mut self) -> Result<()> {
        debug!("Resetting bus");
        self.send_frame(&Command::Reset.to_frame(BROADCAST)?)
    }

    /// Assign `address` to the unaddressed board nearest the end of the chain
    pub fn assign_address(&mut self, address: u8) -> Result<()> {
        debug!("Assigning address {}", address);
        self.query(BROADCAST, Command::AssignAddress(address), |_| Ok(()))
    }

    /// Read the board's identification string
    pub fn read_id(&mut self, address: u8) -> Result<String> {
        self.query(address, Command::ReadId, |response| {
            let data = response.data;
            let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
            Ok(String::from_utf8_lossy(&data[..end]).into_owned())
        })
    }

    /// Read the command format revision
    pub fn command_version(&mut self, address: u8) -> Result<Version> {
        self.query(address, Command::CommandVersion, parse_version)
    }

    /// Read the JVS revision
    pub fn jvs_version(&mut self, address: u8) -> Result<Version> {
        self.query(address, Command::JvsVersion, parse_version)
    }

    /// Read the communication protocol revision
    pub fn protocol_version(&mut self, address: u8) -> Result<Version> {
        self.query(address, Command::ProtocolVersion, parse_version)
    }

    /// Read the board's feature table
    pub fn read_features(&mut self, address: u8) -> Result<Vec<Feature>> {
        self.query(address, Command::ReadFeatures, |response| {
            let data = response.data;
            let table = FeatureTable::new(data);
            if !table.is_terminated() {
                warn!(
                    "Feature table has no end marker ({} bytes), using complete records only",
                    data.len()
                );
            }
            Ok(table.features().collect())
        })
    }

    /// Read switch inputs for `players` players of `switches_per_player` switches
    pub fn read_switches(
        &mut self,
        address: u8,
        players: u8,
        switches_per_player: u8,
    ) -> Result<SwitchState> {
        let bytes_per_player = switch_bytes(switches_per_player);
        let command = Command::ReadSwitches {
            players,
            bytes_per_player,
        };
        self.query(address, command, |response| {
            Ok(SwitchState::parse(response.data, players, bytes_per_player)?)
        })
    }

    /// Bring up a single board and collect its description
    ///
    /// Resets the bus, assigns the configured address, then reads the ID,
    /// the three revisions and the feature table.
    pub fn probe(&mut self) -> Result<DeviceInfo> {
        let address = self.config.device_address;

        self.reset()?;
        self.assign_address(address)?;

        let id = self.read_id(address)?;
        info!("Board {} identified as {:?}", address, id);

        let command_version = self.command_version(address)?;
        let jvs_version = self.jvs_version(address)?;
        let protocol_version = self.protocol_version(address)?;
        debug!(
            "Revisions: command {}, JVS {}, protocol {}",
            command_version, jvs_version, protocol_version
        );

        let features = self.read_features(address)?;
        info!("Board {} reports {} features", address, features.len());

        Ok(DeviceInfo {
            address,
            id,
            command_version,
            jvs_version,
            protocol_version,
            features,
        })
    }
}

/// Reject any reply whose status or report is not normal
fn check_response(response: &Response<'_>) -> Result<()> {
    if response.status != Status::Normal {
        warn!("Board returned status {:?}", response.status);
        return Err(MasterError::Status(response.status));
    }

    match response.report {
        Some(Report::Normal) => Ok(()),
        Some(report) => {
            warn!("Board returned report {:?}", report);
            Err(MasterError::Report(report))
        }
        None => Err(ResponseError::MissingReport.into()),
    }
}

fn parse_version(response: &Response<'_>) -> Result<Version> {
    let data = response.data_at_least(1)?;
    Ok(Version::from_bcd(data[0]))
}
