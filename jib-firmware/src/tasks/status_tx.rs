//! Panel UART transmit task
//!
//! Sends status reports and heartbeat responses to the panel.

use defmt::*;
use embassy_rp::uart::BufferedUartTx;
use embassy_time::{Duration, Ticker};
use embedded_io_async::Write;

use jib_protocol::HeadMessage;

use crate::channels::{HEAD_STATUS, HEARTBEAT_RECEIVED};

/// Status TX task - sends frames to the panel
#[embassy_executor::task]
pub async fn status_tx_task(mut tx: BufferedUartTx) {
    info!("Status TX task started");

    let mut ticker = Ticker::every(Duration::from_millis(50));

    loop {
        if HEARTBEAT_RECEIVED.signaled() {
            HEARTBEAT_RECEIVED.reset();
            send(&mut tx, HeadMessage::Pong).await;
        }

        if let Some(report) = HEAD_STATUS.try_take() {
            send(&mut tx, HeadMessage::Status(report)).await;
        }

        ticker.next().await;
    }
}

async fn send(tx: &mut BufferedUartTx, msg: HeadMessage) {
    let frame = match msg.to_frame() {
        Ok(frame) => frame,
        Err(e) => {
            warn!("Failed to build {:?}: {:?}", msg, e);
            return;
        }
    };

    match tx.write_all(&frame.to_bytes()).await {
        Ok(()) => trace!("TX: {:?}", msg),
        Err(e) => warn!("Failed to send frame: {:?}", e),
    }
}
