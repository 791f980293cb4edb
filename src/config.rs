//! Listener configuration
//!
//! The only knob is the port, taken from the first positional argument.

use std::net::{Ipv4Addr, SocketAddr};

use crate::error::AppError;

/// Port used when none is given
pub const DEFAULT_PORT: u16 = 13000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
}

impl ServerConfig {
    /// Build from command-line arguments, program name already skipped
    pub fn from_args<I>(args: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = String>,
    {
        let port = match args.into_iter().next() {
            Some(arg) => arg
                .trim()
                .parse::<u16>()
                .map_err(|_| AppError::InvalidPort(arg))?,
            None => DEFAULT_PORT,
        };
        Ok(Self { port })
    }

    /// Address to bind: every interface on the configured port
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}
