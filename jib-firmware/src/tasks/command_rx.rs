//! Panel UART receive task
//!
//! Decodes command frames from the control panel. Pings are answered
//! from here; everything else is queued for the motion task.

use defmt::*;
use embassy_rp::uart::BufferedUartRx;
use embedded_io_async::Read;

use jib_protocol::{FrameParser, HeadCommand};

use crate::channels::{COMMAND_CHANNEL, HEARTBEAT_RECEIVED};

const RX_BUF_SIZE: usize = 64;

#[embassy_executor::task]
pub async fn command_rx_task(mut rx: BufferedUartRx) {
    info!("Command RX task started");

    let mut parser = FrameParser::new();
    let mut buf = [0u8; RX_BUF_SIZE];

    loop {
        let n = match rx.read(&mut buf).await {
            Ok(n) => n,
            Err(e) => {
                warn!("UART read error: {:?}", e);
                continue;
            }
        };
        trace!("RX: {} bytes", n);

        let mut pending = &buf[..n];
        while !pending.is_empty() {
            let (used, result) = parser.feed_slice(pending);
            pending = &pending[used..];

            match result {
                Ok(Some(frame)) => match HeadCommand::from_frame(&frame) {
                    Ok(cmd) => dispatch(cmd).await,
                    Err(e) => warn!("Bad command frame {:#x}: {:?}", frame.kind, e),
                },
                Ok(None) => {}
                Err(e) => warn!("Frame error: {:?}", e),
            }
        }
    }
}

async fn dispatch(cmd: HeadCommand) {
    match cmd {
        HeadCommand::Ping => {
            trace!("PING");
            HEARTBEAT_RECEIVED.signal(());
        }
        // A stop must never be dropped, so wait for queue space
        HeadCommand::Stop { .. } => {
            debug!("Command: {:?}", cmd);
            COMMAND_CHANNEL.send(cmd).await;
        }
        _ => {
            debug!("Command: {:?}", cmd);
            if COMMAND_CHANNEL.try_send(cmd).is_err() {
                warn!("Command queue full, dropping {:?}", cmd);
            }
        }
    }
}
