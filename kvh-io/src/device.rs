//! Device configuration over the serial link
//!
//! The IMU accepts ASCII commands such as `=CONFIG,1` or `=OUTPUTFMT,B`, one
//! per line. Each command needs time to take effect, so commands go out with a
//! pause in between. The reply text is not parsed; callers flush the input
//! afterwards so it never reaches the frame synchroniser.

use crate::error::{Error, Result};
use crate::transport::Transport;
use std::thread;
use std::time::Duration;

/// Line terminator the device expects after each command
pub const COMMAND_TERMINATOR: &[u8] = b"\r\n";

/// Write `commands` to the device, pausing `gap` between consecutive ones
pub fn send_commands<T>(transport: &mut T, commands: &[String], gap: Duration) -> Result<()>
where
    T: Transport + ?Sized,
{
    if commands.is_empty() {
        return Ok(());
    }
    log::info!("Configuring device ({} commands)", commands.len());

    for (i, command) in commands.iter().enumerate() {
        if i > 0 && !gap.is_zero() {
            thread::sleep(gap);
        }
        log::debug!("Sending {}/{}: {}", i + 1, commands.len(), command);
        write_all(transport, command.as_bytes())?;
        write_all(transport, COMMAND_TERMINATOR)?;
        transport.flush()?;
    }

    log::info!("Device configuration sent");
    Ok(())
}

fn write_all<T: Transport + ?Sized>(transport: &mut T, mut data: &[u8]) -> Result<()> {
    while !data.is_empty() {
        let n = transport.write(data)?;
        if n == 0 {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                "device accepted no bytes",
            )));
        }
        data = &data[n..];
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MockTransport, StreamTransport};
    use std::io::Cursor;
    use std::time::Instant;

    fn vendor_sequence() -> Vec<String> {
        ["=CONFIG,1", "=OUTPUTFMT,B", "=OUTPUTRATE,200", "=OUTPUTBAUD,115200", "=CONFIG,0"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_commands_written_in_order() {
        let mut transport = MockTransport::new();
        send_commands(&mut transport, &vendor_sequence(), Duration::ZERO).unwrap();
        assert_eq!(
            transport.written(),
            b"=CONFIG,1\r\n=OUTPUTFMT,B\r\n=OUTPUTRATE,200\r\n=OUTPUTBAUD,115200\r\n=CONFIG,0\r\n"
                .to_vec()
        );
    }

    #[test]
    fn test_gap_between_commands() {
        let mut transport = MockTransport::new();
        let commands = vendor_sequence()[..3].to_vec();
        let started = Instant::now();
        send_commands(&mut transport, &commands, Duration::from_millis(5)).unwrap();
        // Two gaps, none after the last command
        assert!(started.elapsed() >= Duration::from_millis(10));
    }

    #[test]
    fn test_no_commands_writes_nothing() {
        let mut transport = MockTransport::new();
        send_commands(&mut transport, &[], Duration::from_millis(200)).unwrap();
        assert!(transport.written().is_empty());
    }

    #[test]
    fn test_write_failure_propagates() {
        let mut transport = StreamTransport::new(Cursor::new(Vec::new()));
        let result = send_commands(&mut transport, &vendor_sequence(), Duration::ZERO);
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
