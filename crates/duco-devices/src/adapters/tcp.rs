//! Modbus TCP transport.
//!
//! One slave context per transport, opened lazily and guarded by an async
//! mutex so requests never interleave on the wire. A context that failed
//! with an I/O error or a timeout is dropped and reopened on the next call.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_modbus::client::{tcp, Context};
use tokio_modbus::prelude::{Reader, Slave, Writer};
use tracing::{debug, info, warn};

use duco_core::{
    AccessClass, ModbusConfig, RawValue, RegisterAddress, RegisterTransport, TransportError,
    TransportResult,
};

/// Transport talking to a Modbus TCP gateway.
pub struct ModbusTcpTransport {
    endpoint: String,
    slave: Slave,
    timeout: Duration,
    context: Mutex<Option<Context>>,
    name: String,
}

impl ModbusTcpTransport {
    pub fn new(config: &ModbusConfig, slave_id: u8) -> Self {
        let endpoint = config.endpoint();
        Self {
            name: format!("modbus-tcp://{}/{}", endpoint, slave_id),
            endpoint,
            slave: Slave(slave_id),
            timeout: config.timeout(),
            context: Mutex::new(None),
        }
    }

    fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }

    async fn resolve(&self) -> TransportResult<SocketAddr> {
        tokio::net::lookup_host(self.endpoint.as_str())
            .await
            .map_err(|e| TransportError::Unreachable(format!("{}: {}", self.endpoint, e)))?
            .next()
            .ok_or_else(|| {
                TransportError::Unreachable(format!("{}: no address resolved", self.endpoint))
            })
    }

    /// The open context, connecting first when there is none.
    async fn connected<'a>(
        &self,
        context: &'a mut Option<Context>,
    ) -> TransportResult<&'a mut Context> {
        if context.is_none() {
            *context = Some(self.open().await?);
        }
        context
            .as_mut()
            .ok_or_else(|| TransportError::Unreachable("no connection".to_string()))
    }

    async fn open(&self) -> TransportResult<Context> {
        let addr = self.resolve().await?;
        debug!("Connecting to Modbus gateway {}", addr);
        match tokio::time::timeout(self.timeout, tcp::connect_slave(addr, self.slave)).await {
            Ok(Ok(context)) => {
                info!("Connected to Modbus gateway {} (slave {})", addr, self.slave.0);
                Ok(context)
            }
            Ok(Err(e)) => Err(TransportError::Unreachable(format!("{}: {}", addr, e))),
            Err(_) => Err(TransportError::Unreachable(format!(
                "{}: connect timed out after {}ms",
                addr,
                self.timeout_ms()
            ))),
        }
    }
}

#[async_trait]
impl RegisterTransport for ModbusTcpTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read_registers(
        &self,
        address: RegisterAddress,
        count: u16,
        class: AccessClass,
    ) -> TransportResult<Vec<RawValue>> {
        let mut guard = self.context.lock().await;
        let context = self.connected(&mut guard).await?;

        let request = async {
            match class {
                AccessClass::Input => context.read_input_registers(address, count).await,
                AccessClass::Holding => context.read_holding_registers(address, count).await,
            }
        };
        let result = tokio::time::timeout(self.timeout, request).await;
        match result {
            Ok(Ok(Ok(values))) => {
                debug!("read {} {} register(s) from {}", count, class, address);
                Ok(values)
            }
            Ok(Ok(Err(exception))) => Err(TransportError::Exception(format!("{:?}", exception))),
            Ok(Err(e)) => {
                warn!("Modbus connection to {} lost: {}", self.endpoint, e);
                *guard = None;
                Err(TransportError::Unreachable(e.to_string()))
            }
            Err(_) => {
                *guard = None;
                Err(TransportError::Timeout(self.timeout_ms()))
            }
        }
    }

    async fn write_register(
        &self,
        address: RegisterAddress,
        value: RawValue,
    ) -> TransportResult<()> {
        let mut guard = self.context.lock().await;
        let context = self.connected(&mut guard).await?;

        let result =
            tokio::time::timeout(self.timeout, context.write_single_register(address, value)).await;
        match result {
            Ok(Ok(Ok(()))) => {
                debug!("wrote holding register {}={}", address, value);
                Ok(())
            }
            Ok(Ok(Err(exception))) => Err(TransportError::Exception(format!("{:?}", exception))),
            Ok(Err(e)) => {
                warn!("Modbus connection to {} lost: {}", self.endpoint, e);
                *guard = None;
                Err(TransportError::Unreachable(e.to_string()))
            }
            Err(_) => {
                *guard = None;
                Err(TransportError::Timeout(self.timeout_ms()))
            }
        }
    }
}
