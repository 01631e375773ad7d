// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Card transport abstraction and TCP transport

use async_trait::async_trait;

#[cfg(feature = "transport_tcp")]
pub use tcp::*;

/// Raw APDU exchange with a connected card.
///
/// Implementations write the complete response (payload followed by the
/// two-byte status word) into `response`, returning the number of bytes
/// written.
#[async_trait]
pub trait Exchange {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Issue a command APDU and await the card response
    async fn exchange(&self, command: &[u8], response: &mut [u8]) -> Result<usize, Self::Error>;
}

#[cfg(feature = "transport_tcp")]
mod tcp {
    use std::{
        net::{Ipv4Addr, SocketAddr, SocketAddrV4},
        time::Duration,
    };

    use async_trait::async_trait;
    use log::{debug, trace};
    use tokio::{
        io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
        net::TcpStream,
        sync::Mutex,
    };

    use super::Exchange;
    use crate::Error;

    /// Default TCP port for card bridges / simulators
    pub const DEFAULT_PORT: u16 = 9999;

    /// TCP transport options
    #[derive(Clone, Debug, PartialEq, clap::Parser)]
    pub struct TcpOptions {
        /// Card bridge address
        #[clap(long, env, default_value_t = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, DEFAULT_PORT)))]
        pub addr: SocketAddr,

        /// Timeout for APDU exchanges (milliseconds)
        #[clap(long, default_value_t = 3000)]
        pub timeout_ms: u64,
    }

    impl Default for TcpOptions {
        fn default() -> Self {
            Self {
                addr: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
                timeout_ms: 3000,
            }
        }
    }

    impl TcpOptions {
        fn timeout(&self) -> Duration {
            Duration::from_millis(self.timeout_ms)
        }
    }

    /// TCP card transport.
    ///
    /// APDUs are framed with a big-endian `u16` length prefix in both directions.
    pub struct TransportTcp {
        s: Mutex<TcpStream>,
        opts: TcpOptions,
    }

    impl TransportTcp {
        /// Connect to a TCP card bridge
        pub async fn new(opts: TcpOptions) -> Result<Self, Error> {
            debug!("Connecting to {}", opts.addr);

            let s = tokio::time::timeout(opts.timeout(), TcpStream::connect(opts.addr)).await??;

            Ok(Self {
                s: Mutex::new(s),
                opts,
            })
        }
    }

    #[async_trait]
    impl Exchange for TransportTcp {
        type Error = Error;

        async fn exchange(&self, command: &[u8], response: &mut [u8]) -> Result<usize, Error> {
            let mut s = self.s.lock().await;

            trace!("TX: {command:02x?}");

            let n = tokio::time::timeout(self.opts.timeout(), async {
                write_frame(&mut *s, command).await?;
                read_frame(&mut *s, response).await
            })
            .await??;

            trace!("RX: {:02x?}", &response[..n]);

            Ok(n)
        }
    }

    /// Write a length-prefixed frame
    pub async fn write_frame<W: AsyncWrite + Unpin>(w: &mut W, data: &[u8]) -> Result<(), Error> {
        let n = u16::try_from(data.len()).map_err(|_| Error::InvalidResponse)?;

        let mut b = Vec::with_capacity(2 + data.len());
        b.extend_from_slice(&n.to_be_bytes());
        b.extend_from_slice(data);

        w.write_all(&b).await?;

        Ok(())
    }

    /// Read a length-prefixed frame into `buff`, returning the frame length
    pub async fn read_frame<R: AsyncRead + Unpin>(r: &mut R, buff: &mut [u8]) -> Result<usize, Error> {
        let mut h = [0u8; 2];
        r.read_exact(&mut h).await?;

        let n = u16::from_be_bytes(h) as usize;
        if n > buff.len() {
            return Err(Error::InvalidResponse);
        }

        r.read_exact(&mut buff[..n]).await?;

        Ok(n)
    }

}
